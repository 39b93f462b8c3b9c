use crate::error::LoggerError;
use crate::retry::RetryPolicy;
use crate::serial::SerialSettings;
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(name = "arduino-position-logger", version, about)]
pub struct Cli {
    /// Path to configuration file
    #[clap(long, default_value = "./config.toml")]
    pub config: PathBuf,

    /// Override serial port path
    #[clap(long)]
    pub port: Option<String>,

    /// Override baud rate
    #[clap(long)]
    pub baud: Option<u32>,

    /// Log file to append records to
    #[clap(long, short)]
    pub output: Option<PathBuf>,

    /// Override serial read timeout in milliseconds (0 waits forever)
    #[clap(long)]
    pub read_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub retry_backoff_ms: u64,
    pub max_attempts: Option<u32>,
    pub flush_each_record: bool,
    pub output: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: 9600,
            read_timeout_ms: 10_000,
            retry_backoff_ms: 1000,
            max_attempts: None,
            flush_each_record: true,
            output: None,
        }
    }
}

fn default_port() -> &'static str {
    if cfg!(windows) {
        "COM6"
    } else {
        "/dev/ttyACM0"
    }
}

impl Config {
    pub fn serial_settings(&self) -> SerialSettings {
        SerialSettings {
            port: self.port.clone(),
            baud_rate: self.baud_rate,
            read_timeout: match self.read_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            backoff: Duration::from_millis(self.retry_backoff_ms),
            max_attempts: self.max_attempts,
        }
    }

    pub fn validate(&self) -> Result<(), LoggerError> {
        if self.port.trim().is_empty() {
            return Err(LoggerError::Config("port must not be empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(LoggerError::Config("baud_rate must be positive".to_string()));
        }
        if self.retry_backoff_ms == 0 {
            return Err(LoggerError::Config(
                "retry_backoff_ms must be positive".to_string(),
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(LoggerError::Config(
                "max_attempts must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if cli.config.exists() {
        let config_content = fs::read_to_string(&cli.config)
            .with_context(|| format!("Failed to read config file: {:?}", cli.config))?;

        toml::from_str(&config_content).context("Failed to parse config file")?
    } else {
        info!("No config file at {:?}, using defaults", cli.config);
        Config::default()
    };

    // Apply CLI overrides
    if let Some(ref port) = cli.port {
        config.port = port.clone();
    }

    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }

    if let Some(ref output) = cli.output {
        config.output = Some(output.clone());
    }

    if let Some(timeout) = cli.read_timeout_ms {
        config.read_timeout_ms = timeout;
    }

    config.validate().context("Invalid configuration")?;

    Ok(config)
}
