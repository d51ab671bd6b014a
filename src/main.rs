//! CLI entry point for daq-relay.
//!
//! Startup sequence: load and validate the configuration, initialize
//! tracing, build the processor registry and channel manager, bind the TCP
//! publisher, install the Ctrl-C handler and hand control to the relay loop.
//! Any failure before the loop starts is fatal and exits with status 1; a
//! signal-driven stop exits with status 0.

use clap::Parser;
use daq_relay::config::Settings;
use daq_relay::error::{AppResult, RelayError};
use daq_relay::histogram;
use daq_relay::logging;
use daq_relay::manager::DataChannelManager;
use daq_relay::processor::{ProcessorRegistry, RegistryContext};
use daq_relay::shutdown::ShutdownToken;
use daq_relay::transport::TcpTransmitter;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser)]
#[command(name = "daq-relay")]
#[command(about = "Relay DAQ events, histograms and status to live consumers", long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "config/relay.json")]
    config: PathBuf,

    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Tracing may not be initialized yet if loading the config failed.
            eprintln!("daq-relay: fatal: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let mut settings = Settings::load_from(&cli.config)?;
    if let Some(level) = cli.log_level {
        settings.general_settings.log_level = level;
    }
    settings.validate().map_err(RelayError::Configuration)?;
    logging::init_from_settings(&settings).map_err(RelayError::Configuration)?;

    info!(config = %cli.config.display(), "daq-relay starting");

    let registry = ProcessorRegistry::with_builtin();
    let ctx = RegistryContext {
        verbose: settings.general_settings.verbose,
        histograms: histogram::shared_store(),
    };
    let mut manager = DataChannelManager::from_settings(&settings, &registry, &ctx)?;
    let mut transmitter = TcpTransmitter::bind(&settings.transport.bind_address)?;

    let shutdown = ShutdownToken::new();
    shutdown.install_ctrl_c_handler();

    manager.run(&mut transmitter, &shutdown).await?;

    info!("daq-relay stopped");
    Ok(())
}
