mod clock;
mod config;
mod error;
mod logger;
mod output;
mod record;
mod retry;
mod serial;
mod shutdown;

use anyhow::{Context, Result};
use clap::Parser;
use clock::{Clock, SystemClock};
use log::{info, warn};
use logger::TelemetryLogger;
use serial::SerialLineSource;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting arduino-position-logger");

    // Parse command-line arguments
    let cli = config::Cli::parse();

    // Load configuration
    let config = config::load_config(&cli)?;
    info!("Configuration loaded successfully");

    let clock = SystemClock;
    let output_path = config
        .output
        .clone()
        .unwrap_or_else(|| output::default_output_path(clock.now()));
    let sink = output::open_output(&output_path).await?;
    info!("Saving to file: {}", output_path.display());

    let source = SerialLineSource::open(config.serial_settings());
    if !source.is_connected() {
        warn!("Entering read loop without a device; reads will fail until it appears");
    }

    let mut logger = TelemetryLogger::new(source, clock, sink, config.retry_policy())
        .with_flush_each_record(config.flush_each_record);

    let outcome = tokio::select! {
        result = logger.run() => result.context("Logger stopped"),
        _ = shutdown::shutdown_requested() => {
            info!("Shutting down, closing {}", output_path.display());
            Ok(())
        }
    };

    logger
        .flush()
        .await
        .context("Failed to flush log file")?;
    info!(
        "{} records written from {}",
        logger.records_written(),
        logger.source().settings().port
    );

    outcome
}
