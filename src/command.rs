//! Periodic external command execution.
//!
//! Each configured command entry wraps one external program invocation (an
//! event-dump tool in the reference deployment) with a minimum interval
//! between executions. Execution is synchronous and blocking; the textual
//! output is parsed into per-event records by [`crate::dump`].
//!
//! A failing execution is scheduler-fatal: a broken command entry signals a
//! configuration or environment fault that would recur every tick, so the
//! scheduling pass aborts instead of retrying (see `RelayError::Command`).

use crate::config::CommandSettings;
use crate::dump;
use crate::error::{AppResult, RelayError};
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::debug;

/// One rate-limited external command.
#[derive(Debug)]
pub struct CommandRunner {
    program: String,
    base_args: Vec<String>,
    event_id: Option<i32>,
    bank_name: Option<String>,
    buffer_name: Option<String>,
    trigger_mask: Option<i32>,
    num_events: Option<u32>,
    wait: Duration,
    last_run: Option<Instant>,
}

impl CommandRunner {
    /// Build a runner from its configuration entry.
    pub fn from_settings(settings: &CommandSettings) -> Self {
        Self {
            program: settings.program.clone(),
            base_args: settings.args.clone(),
            event_id: settings.event_id,
            bank_name: settings.bank_name.clone(),
            buffer_name: settings.buffer_name.clone(),
            trigger_mask: settings.trigger_mask,
            num_events: settings.num_events,
            wait: Duration::from_millis(settings.minimum_time_between_commands_millis),
            last_run: None,
        }
    }

    /// Full argument list: configured extra args followed by the filter
    /// flags derived from the entry.
    pub fn command_line(&self) -> Vec<String> {
        let mut args = self.base_args.clone();
        if let Some(event_id) = self.event_id {
            args.push("-e".into());
            args.push(event_id.to_string());
        }
        if let Some(bank) = &self.bank_name {
            args.push("-b".into());
            args.push(bank.clone());
        }
        if let Some(buffer) = &self.buffer_name {
            args.push("-z".into());
            args.push(buffer.clone());
        }
        if let Some(mask) = self.trigger_mask {
            args.push("-m".into());
            args.push(mask.to_string());
        }
        if let Some(count) = self.num_events {
            args.push("-l".into());
            args.push(count.to_string());
        }
        args
    }

    /// Program this runner executes.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Minimum interval between two executions.
    pub fn wait_time(&self) -> Duration {
        self.wait
    }

    /// Change the minimum interval; takes effect on the next readiness check.
    pub fn set_wait_time(&mut self, wait: Duration) {
        self.wait = wait;
    }

    /// True iff the elapsed time since the last execution is at least the
    /// minimum interval. A never-executed runner is always ready.
    pub fn is_ready_for_execution(&self) -> bool {
        self.ready_at(Instant::now())
    }

    pub(crate) fn ready_at(&self, now: Instant) -> bool {
        match self.last_run {
            None => true,
            Some(last) => now.duration_since(last) >= self.wait,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_last_run(&mut self, last: Instant) {
        self.last_run = Some(last);
    }

    /// Execute the command synchronously, returning its stdout.
    ///
    /// The execution timestamp is refreshed before the attempt, regardless of
    /// outcome. Spawn failures and non-zero exits are `RelayError::Command`.
    pub fn execute(&mut self) -> AppResult<String> {
        self.last_run = Some(Instant::now());
        debug!(program = %self.program, "executing periodic command");
        let output = Command::new(&self.program)
            .args(self.command_line())
            .output()
            .map_err(|e| RelayError::Command(format!("{}: {}", self.program, e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RelayError::Command(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Drives all configured command entries for one channel.
#[derive(Debug, Default)]
pub struct CommandScheduler {
    commands: Vec<CommandRunner>,
}

impl CommandScheduler {
    /// Build a scheduler from the channel's command entries, in
    /// configuration order.
    pub fn from_settings(entries: &[CommandSettings]) -> Self {
        Self {
            commands: entries.iter().map(CommandRunner::from_settings).collect(),
        }
    }

    /// Smallest configured interval, used for global tick computation.
    pub fn min_interval(&self) -> Option<Duration> {
        self.commands.iter().map(CommandRunner::wait_time).min()
    }

    /// True when no command entries are configured.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// True when at least one entry would execute on the next pass.
    pub fn any_ready(&self) -> bool {
        self.commands
            .iter()
            .any(CommandRunner::is_ready_for_execution)
    }

    /// One scheduling pass: execute every ready entry in configuration order
    /// and parse its output into records. Any execution failure aborts the
    /// pass and propagates.
    pub fn run_pass(&mut self) -> AppResult<Vec<String>> {
        let mut records = Vec::new();
        for command in &mut self.commands {
            if !command.is_ready_for_execution() {
                continue;
            }
            let output = command.execute()?;
            let package = dump::parse(&output);
            records.extend(package.records()?);
        }
        Ok(records)
    }
}
