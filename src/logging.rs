//! Tracing infrastructure.
//!
//! Structured logging with `tracing` and `tracing-subscriber`. The level
//! comes from `general-settings.log-level` unless `RUST_LOG` is set, in which
//! case the environment filter wins. Initialization is idempotent so tests
//! and library consumers can call it freely.

use crate::config::Settings;
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Initialize tracing from application settings.
pub fn init_from_settings(settings: &Settings) -> Result<(), String> {
    let level = parse_log_level(&settings.general_settings.log_level)?;
    init(level)
}

/// Initialize tracing with an explicit level.
///
/// Idempotent: if a global subscriber is already installed this returns
/// Ok(()) without error.
pub fn init(level: Level) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let fmt_layer = fmt::layer()
        .compact()
        .with_target(true)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .or_else(|e| {
            if e.to_string()
                .contains("a global default trace dispatcher has already been set")
            {
                Ok(())
            } else {
                Err(format!("Failed to initialize tracing: {}", e))
            }
        })
}

/// Parse a log level string into a tracing Level.
pub fn parse_log_level(level: &str) -> Result<Level, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(format!(
            "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
            level
        )),
    }
}
