use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port {0} is not connected")]
    NotConnected(String),

    #[error("No line received within {0:?}")]
    ReadTimeout(Duration),

    #[error("Serial device closed the connection")]
    Disconnected,

    #[error("Configuration error: {0}")]
    Config(String),
}
