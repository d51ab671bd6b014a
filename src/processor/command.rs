//! Command-backed processor.
//!
//! Wraps one rate-limited external command; each firing executes the command
//! synchronously and parses its output into event records. The period is the
//! command's minimum inter-execution interval, so readiness and rate
//! limiting share one clock.
//!
//! Execution failures are scheduler-fatal and propagate out of dispatch
//! (`RelayError::Command`).

use super::Processor;
use crate::command::CommandRunner;
use crate::dump;
use crate::error::AppResult;
use std::time::Duration;
use tracing::debug;

/// Processor producing records by running an external dump command.
#[derive(Debug)]
pub struct CommandProcessor {
    runner: CommandRunner,
    verbose: u8,
}

impl CommandProcessor {
    /// Create a command processor around a configured runner.
    pub fn new(runner: CommandRunner, verbose: u8) -> Self {
        Self { runner, verbose }
    }
}

impl Processor for CommandProcessor {
    fn kind(&self) -> &'static str {
        "command"
    }

    fn is_ready_to_process(&self) -> bool {
        self.runner.is_ready_for_execution()
    }

    fn period(&self) -> Duration {
        self.runner.wait_time()
    }

    fn set_period(&mut self, period: Duration) {
        self.runner.set_wait_time(period);
    }

    fn process(&mut self) -> AppResult<Vec<String>> {
        if self.verbose > 0 {
            debug!(program = %self.runner.program(), "command processor executing");
        }
        let output = self.runner.execute()?;
        dump::parse(&output).records()
    }
}
