use crate::error::LoggerError;
use log::{debug, info, warn};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::timeout;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Where the logger gets its lines from.
pub trait LineSource {
    /// Returns the next raw line, terminator included.
    fn read_line(&mut self) -> impl Future<Output = Result<Vec<u8>, LoggerError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    /// `None` blocks until a full line arrives.
    pub read_timeout: Option<Duration>,
}

/// Serial connection to the FlySim Arduino.
///
/// The port is opened once up front. If that fails, or the device goes away
/// later, the handle is dropped and every following read tries to reopen it,
/// so reads fail one by one until the device is back.
///
/// A read timeout leaves the port open and keeps the bytes received so far
/// as the start of the next line. Nothing caps that buffer: a device that
/// never sends `\n` makes it grow without limit.
pub struct SerialLineSource {
    settings: SerialSettings,
    reader: Option<BufReader<SerialStream>>,
    pending: Vec<u8>,
}

impl SerialLineSource {
    pub fn open(settings: SerialSettings) -> Self {
        let mut source = Self {
            settings,
            reader: None,
            pending: Vec::new(),
        };

        if let Err(e) = source.connect() {
            warn!(
                "Could not connect to Arduino on port {}: {}",
                source.settings.port, e
            );
        }

        source
    }

    #[cfg(all(test, unix))]
    fn with_stream(settings: SerialSettings, stream: SerialStream) -> Self {
        Self {
            settings,
            reader: Some(BufReader::new(stream)),
            pending: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.reader.is_some()
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    fn connect(&mut self) -> Result<(), LoggerError> {
        let port = tokio_serial::new(&self.settings.port, self.settings.baud_rate)
            .open_native_async()?;

        info!(
            "Connected to serial port {} at {} baud",
            self.settings.port, self.settings.baud_rate
        );

        self.reader = Some(BufReader::new(port));
        self.pending.clear();
        Ok(())
    }

    fn disconnect(&mut self) {
        self.reader = None;
        self.pending.clear();
    }
}

impl LineSource for SerialLineSource {
    async fn read_line(&mut self) -> Result<Vec<u8>, LoggerError> {
        if self.reader.is_none() {
            debug!("Reopening serial port {}", self.settings.port);
            self.connect()?;
        }

        let Some(reader) = self.reader.as_mut() else {
            return Err(LoggerError::NotConnected(self.settings.port.clone()));
        };

        match read_until_newline(reader, &mut self.pending, self.settings.read_timeout).await {
            Ok(Some(line)) => Ok(line),
            Ok(None) => {
                self.disconnect();
                Err(LoggerError::Disconnected)
            }
            // The connection is still usable after a timeout
            Err(e @ LoggerError::ReadTimeout(_)) => Err(e),
            Err(e) => {
                self.disconnect();
                Err(e)
            }
        }
    }
}

/// Reads up to and including the next `\n`.
///
/// Bytes received before a timeout stay in `pending` and become the start of
/// the next line. Returns `Ok(None)` once the stream is closed and nothing is
/// left over.
pub async fn read_until_newline<R>(
    reader: &mut R,
    pending: &mut Vec<u8>,
    read_timeout: Option<Duration>,
) -> Result<Option<Vec<u8>>, LoggerError>
where
    R: AsyncBufRead + Unpin,
{
    let read = match read_timeout {
        Some(limit) => match timeout(limit, reader.read_until(b'\n', pending)).await {
            Ok(result) => result?,
            Err(_) => return Err(LoggerError::ReadTimeout(limit)),
        },
        None => reader.read_until(b'\n', pending).await?,
    };

    if read == 0 && pending.is_empty() {
        return Ok(None);
    }

    Ok(Some(std::mem::take(pending)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn lines_keep_their_terminators() {
        let mut reader: &[u8] = b"OK 12 34\r\nPING\n";
        let mut pending = Vec::new();

        let first = read_until_newline(&mut reader, &mut pending, None).await.unwrap();
        let second = read_until_newline(&mut reader, &mut pending, None).await.unwrap();
        let end = read_until_newline(&mut reader, &mut pending, None).await.unwrap();

        assert_eq!(first, Some(b"OK 12 34\r\n".to_vec()));
        assert_eq!(second, Some(b"PING\n".to_vec()));
        assert_eq!(end, None);
    }

    #[tokio::test]
    async fn trailing_bytes_without_newline_are_returned_at_close() {
        let mut reader: &[u8] = b"A\nhalf";
        let mut pending = Vec::new();

        read_until_newline(&mut reader, &mut pending, None).await.unwrap();
        let tail = read_until_newline(&mut reader, &mut pending, None).await.unwrap();

        assert_eq!(tail, Some(b"half".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_keeps_partial_line() {
        let (client, mut device) = tokio::io::duplex(64);
        let mut reader = BufReader::new(client);
        let mut pending = Vec::new();
        let limit = Some(Duration::from_millis(500));

        device.write_all(b"POS 1").await.unwrap();
        let err = read_until_newline(&mut reader, &mut pending, limit)
            .await
            .unwrap_err();
        assert!(matches!(err, LoggerError::ReadTimeout(_)));
        assert_eq!(pending, b"POS 1".to_vec());

        device.write_all(b"2 3\n").await.unwrap();
        let line = read_until_newline(&mut reader, &mut pending, limit)
            .await
            .unwrap();
        assert_eq!(line, Some(b"POS 12 3\n".to_vec()));
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn missing_device_does_not_abort() {
        let mut source = SerialLineSource::open(SerialSettings {
            port: "/dev/arduino-position-logger-missing".to_string(),
            baud_rate: 9600,
            read_timeout: Some(Duration::from_millis(10)),
        });

        assert!(!source.is_connected());
        for _ in 0..3 {
            assert!(source.read_line().await.is_err());
        }
        assert!(!source.is_connected());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_keeps_the_port_open() {
        let (mut device, port) = SerialStream::pair().unwrap();
        let mut source = SerialLineSource::with_stream(
            SerialSettings {
                port: "/dev/arduino-position-logger-missing".to_string(),
                baud_rate: 9600,
                read_timeout: Some(Duration::from_millis(200)),
            },
            port,
        );

        device.write_all(b"A\n").await.unwrap();
        assert_eq!(source.read_line().await.unwrap(), b"A\n".to_vec());

        let err = source.read_line().await.unwrap_err();
        assert!(matches!(err, LoggerError::ReadTimeout(_)));
        assert!(source.is_connected());

        device.write_all(b"B\n").await.unwrap();
        assert_eq!(source.read_line().await.unwrap(), b"B\n".to_vec());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn closed_device_drops_the_port_and_reopens_on_next_read() {
        let (mut device, port) = SerialStream::pair().unwrap();
        let mut source = SerialLineSource::with_stream(
            SerialSettings {
                port: "/dev/arduino-position-logger-missing".to_string(),
                baud_rate: 9600,
                read_timeout: Some(Duration::from_secs(2)),
            },
            port,
        );

        device.write_all(b"A\n").await.unwrap();
        assert_eq!(source.read_line().await.unwrap(), b"A\n".to_vec());

        drop(device);
        let err = source.read_line().await.unwrap_err();
        assert!(matches!(
            err,
            LoggerError::Disconnected | LoggerError::Io(_)
        ));
        assert!(!source.is_connected());

        // Next read goes back to the configured port
        let err = source.read_line().await.unwrap_err();
        assert!(matches!(err, LoggerError::Serial(_)));
        assert!(!source.is_connected());
    }
}
