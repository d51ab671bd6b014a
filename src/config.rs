//! Configuration loading for the relay.
//!
//! Configuration is a kebab-case JSON document loaded with figment and merged
//! with `DAQ_RELAY_`-prefixed environment variables, so a deployment can
//! override individual keys without editing the file:
//!
//! ```text
//! DAQ_RELAY_GENERAL-SETTINGS_LOG-LEVEL=debug daq-relay --config relay.json
//! ```
//!
//! Recognized sections:
//! - `general-settings`: verbosity and log level.
//! - `transport`: publisher bind address.
//! - `event-buffer`: circular buffer capacity per channel.
//! - `data-channels`: ordered list of channels, each with its batch-gate
//!   parameters, a `processors` array (type name plus type-specific options
//!   such as `detector-mapping-file`), and a `commands` array of periodic
//!   external command entries.
//!
//! Loading only checks that the document parses into these types; semantic
//! checks live in [`Settings::validate`] and are startup-fatal.

use figment::{
    providers::{Env, Format, Json},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Processor type names the registry knows how to construct.
pub const KNOWN_PROCESSOR_TYPES: [&str; 5] =
    ["general", "command", "detector", "odb", "histogram"];

/// Top-level application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Process-wide settings (verbosity, log level).
    #[serde(default)]
    pub general_settings: GeneralSettings,
    /// Publish-side transport settings.
    pub transport: TransportSettings,
    /// Circular event buffer settings.
    #[serde(default)]
    pub event_buffer: EventBufferSettings,
    /// Publication channels, in configuration order.
    pub data_channels: Vec<ChannelSettings>,
}

/// Process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GeneralSettings {
    /// Verbosity level for per-component diagnostics (0 = quiet).
    #[serde(default)]
    pub verbose: u8,
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            verbose: 0,
            log_level: default_log_level(),
        }
    }
}

/// Publisher transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TransportSettings {
    /// TCP bind address for the publisher, e.g. "0.0.0.0:5555".
    pub bind_address: String,
}

/// Circular event buffer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EventBufferSettings {
    /// Number of serialized records retained per channel.
    #[serde(default = "default_buffer_capacity")]
    pub num_events_in_circular_buffer: usize,
}

impl Default for EventBufferSettings {
    fn default() -> Self {
        Self {
            num_events_in_circular_buffer: default_buffer_capacity(),
        }
    }
}

/// One publication channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChannelSettings {
    /// Channel name used as the pub/sub topic.
    pub name: String,
    /// Consecutive ready publications transmitted before throttling.
    pub publishes_per_batch: u32,
    /// Ready publications suppressed once the batch is exhausted.
    pub publishes_ignored_after_batch: u32,
    /// Processors feeding this channel, in dispatch order.
    #[serde(default)]
    pub processors: Vec<ProcessorSettings>,
    /// Periodic external commands feeding this channel.
    #[serde(default)]
    pub commands: Vec<CommandSettings>,
}

/// One processor entry inside a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProcessorSettings {
    /// Registered processor type name.
    pub r#type: String,
    /// Poll period in milliseconds.
    #[serde(default = "default_period_millis")]
    pub period_millis: u64,
    /// Detector mapping file, required by the `detector` type.
    #[serde(default)]
    pub detector_mapping_file: Option<PathBuf>,
    /// Snapshot file backing the `odb` type's file source.
    #[serde(default)]
    pub odb_snapshot_file: Option<PathBuf>,
    /// Command entry backing the `command` and `detector` types.
    #[serde(default)]
    pub command: Option<CommandSettings>,
}

/// One periodic external command entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandSettings {
    /// Program to execute.
    pub program: String,
    /// Extra arguments placed before the generated filter flags.
    #[serde(default)]
    pub args: Vec<String>,
    /// Event id filter (`-e`).
    #[serde(default)]
    pub event_id: Option<i32>,
    /// Bank name filter (`-b`).
    #[serde(default)]
    pub bank_name: Option<String>,
    /// Buffer name filter (`-z`).
    #[serde(default)]
    pub buffer_name: Option<String>,
    /// Trigger mask filter (`-m`).
    #[serde(default)]
    pub trigger_mask: Option<i32>,
    /// Number of events to dump per invocation (`-l`).
    #[serde(default)]
    pub num_events: Option<u32>,
    /// Minimum interval between two executions of this entry.
    #[serde(default = "default_command_interval_millis")]
    pub minimum_time_between_commands_millis: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_buffer_capacity() -> usize {
    100
}

fn default_period_millis() -> u64 {
    1000
}

fn default_command_interval_millis() -> u64 {
    500
}

impl Settings {
    /// Load settings from a JSON file merged with `DAQ_RELAY_` environment
    /// variables.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Json::file(path.as_ref()))
            .merge(Env::prefixed("DAQ_RELAY_").split("_"))
            .extract()
    }

    /// Validate settings after loading. Failures here are startup-fatal.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general_settings.log_level.as_str()) {
            return Err(format!(
                "Invalid log-level '{}'. Must be one of: {}",
                self.general_settings.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.transport.bind_address.is_empty() {
            return Err("transport.bind-address must not be empty".to_string());
        }

        if self.event_buffer.num_events_in_circular_buffer == 0 {
            return Err("event-buffer.num-events-in-circular-buffer must be > 0".to_string());
        }

        if self.data_channels.is_empty() {
            return Err("at least one data channel must be configured".to_string());
        }

        let mut names = std::collections::HashSet::new();
        for channel in &self.data_channels {
            if channel.name.is_empty() {
                return Err("data channel names must not be empty".to_string());
            }
            if !names.insert(&channel.name) {
                return Err(format!("Duplicate data channel name: {}", channel.name));
            }
            for processor in &channel.processors {
                if !KNOWN_PROCESSOR_TYPES.contains(&processor.r#type.as_str()) {
                    return Err(format!(
                        "Unknown processor type '{}' on channel '{}'. Must be one of: {}",
                        processor.r#type,
                        channel.name,
                        KNOWN_PROCESSOR_TYPES.join(", ")
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_json() -> &'static str {
        r#"{
            "general-settings": { "verbose": 1, "log-level": "debug" },
            "transport": { "bind-address": "127.0.0.1:5555" },
            "event-buffer": { "num-events-in-circular-buffer": 50 },
            "data-channels": [
                {
                    "name": "events",
                    "publishes-per-batch": 2,
                    "publishes-ignored-after-batch": 1,
                    "processors": [
                        {
                            "type": "detector",
                            "period-millis": 500,
                            "detector-mapping-file": "config/detectors.json",
                            "command": {
                                "program": "mdump",
                                "bank-name": "CR00",
                                "minimum-time-between-commands-millis": 500
                            }
                        }
                    ],
                    "commands": [
                        {
                            "program": "mdump",
                            "event-id": 1,
                            "num-events": 4,
                            "minimum-time-between-commands-millis": 250
                        }
                    ]
                },
                {
                    "name": "histograms",
                    "publishes-per-batch": 1,
                    "publishes-ignored-after-batch": 0,
                    "processors": [
                        { "type": "histogram", "period-millis": 2000 }
                    ]
                }
            ]
        }"#
    }

    fn write_sample() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_json().as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_kebab_case_config() {
        let file = write_sample();
        let settings = Settings::load_from(file.path()).unwrap();

        assert_eq!(settings.general_settings.verbose, 1);
        assert_eq!(settings.general_settings.log_level, "debug");
        assert_eq!(settings.transport.bind_address, "127.0.0.1:5555");
        assert_eq!(settings.event_buffer.num_events_in_circular_buffer, 50);
        assert_eq!(settings.data_channels.len(), 2);

        let events = &settings.data_channels[0];
        assert_eq!(events.name, "events");
        assert_eq!(events.publishes_per_batch, 2);
        assert_eq!(events.publishes_ignored_after_batch, 1);
        assert_eq!(events.processors[0].r#type, "detector");
        assert_eq!(events.processors[0].period_millis, 500);
        assert_eq!(
            events.commands[0].minimum_time_between_commands_millis,
            250
        );

        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_defaults_applied() {
        let file = write_sample();
        let settings = Settings::load_from(file.path()).unwrap();

        // histogram processor entry left the command interval at its default
        let hist = &settings.data_channels[1].processors[0];
        assert_eq!(hist.period_millis, 2000);
        assert!(hist.command.is_none());
    }

    #[test]
    fn test_unknown_processor_type_rejected() {
        let file = write_sample();
        let mut settings = Settings::load_from(file.path()).unwrap();
        settings.data_channels[0].processors[0].r#type = "waveform".into();
        let err = settings.validate().unwrap_err();
        assert!(err.contains("Unknown processor type"));
    }

    #[test]
    fn test_duplicate_channel_names_rejected() {
        let file = write_sample();
        let mut settings = Settings::load_from(file.path()).unwrap();
        settings.data_channels[1].name = "events".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let file = write_sample();
        let mut settings = Settings::load_from(file.path()).unwrap();
        settings.general_settings.log_level = "loud".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_publishes_per_batch_is_valid_disabled_channel() {
        let file = write_sample();
        let mut settings = Settings::load_from(file.path()).unwrap();
        settings.data_channels[0].publishes_per_batch = 0;
        assert!(settings.validate().is_ok());
    }
}
