use crate::clock::Clock;
use crate::error::LoggerError;
use crate::record::LogRecord;
use crate::retry::RetryPolicy;
use crate::serial::LineSource;
use log::{error, trace, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::sleep;

/// Forwards every line from `source` to `sink`, stamped by `clock`.
///
/// Runs one read at a time: a line is written (and optionally flushed)
/// before the next read starts, so records land in the order the lines
/// arrived and each line produces exactly one record.
pub struct TelemetryLogger<S, C, W> {
    source: S,
    clock: C,
    sink: W,
    policy: RetryPolicy,
    flush_each_record: bool,
    records_written: u64,
}

impl<S, C, W> TelemetryLogger<S, C, W>
where
    S: LineSource,
    C: Clock,
    W: AsyncWrite + Unpin,
{
    pub fn new(source: S, clock: C, sink: W, policy: RetryPolicy) -> Self {
        Self {
            source,
            clock,
            sink,
            policy,
            flush_each_record: true,
            records_written: 0,
        }
    }

    pub fn with_flush_each_record(mut self, flush_each_record: bool) -> Self {
        self.flush_each_record = flush_each_record;
        self
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    #[cfg(test)]
    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub async fn flush(&mut self) -> Result<(), LoggerError> {
        self.sink.flush().await?;
        Ok(())
    }

    /// Reads one line and appends its record.
    pub async fn step(&mut self) -> Result<(), LoggerError> {
        let payload = self.source.read_line().await?;
        let record = LogRecord::new(self.clock.now(), payload);

        self.sink.write_all(&record.to_bytes()).await?;
        if self.flush_each_record {
            self.sink.flush().await?;
        }

        self.records_written += 1;
        trace!(
            "Wrote record {} at {}",
            self.records_written,
            record.formatted_timestamp()
        );
        Ok(())
    }

    /// Keeps stepping until the retry policy gives up. With the default
    /// policy this never returns.
    pub async fn run(&mut self) -> Result<(), LoggerError> {
        let mut consecutive_failures: u32 = 0;

        loop {
            match self.step().await {
                Ok(()) => {
                    consecutive_failures = 0;
                }
                Err(e) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);

                    if self.policy.should_give_up(consecutive_failures) {
                        error!(
                            "Can't read from Arduino after {} attempts, giving up: {}",
                            consecutive_failures, e
                        );
                        return Err(e);
                    }

                    warn!(
                        "Can't read from Arduino, retrying in {:?}: {}",
                        self.policy.backoff, e
                    );
                    sleep(self.policy.backoff).await;
                }
            }
        }
    }
}
