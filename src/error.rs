//! Custom error types for the application.
//!
//! This module defines the primary error type, `RelayError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the three failure categories the relay
//! distinguishes:
//!
//! - **startup-fatal**: configuration load/validation failures, a failed
//!   transport bind, or a processor that cannot be constructed. These
//!   propagate out of `main` and terminate the process with exit code 1.
//! - **per-tick recoverable**: a single processor, publish, or histogram-key
//!   failure. These are logged as warnings by the dispatcher and the failing
//!   unit's contribution for that tick is skipped.
//! - **scheduler-fatal**: a periodic external command that fails to execute.
//!   A broken command entry is presumed to be a configuration or environment
//!   fault that will recur every tick, so it aborts the run loop instead of
//!   being retried. `is_scheduler_fatal` identifies this category.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, RelayError>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration file could not be loaded or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration parsed but failed semantic validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Publish-side transport failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A processor failed while producing its output for the current tick.
    #[error("Processor error: {0}")]
    Processor(String),

    /// A periodic external command failed to execute or exited non-zero.
    #[error("Command execution error: {0}")]
    Command(String),

    /// Histogram store failure (poisoned lock or export problem).
    #[error("Histogram error: {0}")]
    Histogram(String),

    /// Detector mapping file could not be loaded.
    #[error("Detector mapping error: {0}")]
    DetectorMap(String),
}

impl RelayError {
    /// True for the error category that must abort the whole dispatch cycle
    /// rather than being skipped for one tick.
    pub fn is_scheduler_fatal(&self) -> bool {
        matches!(self, RelayError::Command(_))
    }
}
