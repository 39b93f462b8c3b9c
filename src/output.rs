use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::BufWriter;

/// Extension suggested for position logs.
pub const LOG_EXTENSION: &str = "arduino.position.log";

/// File name used when the operator did not pick one.
pub fn default_output_path(now: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!(
        "telemetry_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        LOG_EXTENSION
    ))
}

/// Opens the log file for appending, creating it if needed. Held for the
/// whole run.
pub async fn open_output(path: &Path) -> Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    Ok(BufWriter::new(file))
}
