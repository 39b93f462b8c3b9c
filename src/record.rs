use chrono::{DateTime, Local};

/// Local wall-clock time with microsecond precision, e.g. `2024-01-01 10:00:00.000000`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// A single line captured from the Arduino, stamped on arrival.
///
/// The payload is kept exactly as received, including whatever line
/// terminator the device sent. Commas and embedded newlines are not escaped,
/// so a payload containing either cannot be told apart from the record
/// structure when the file is read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub payload: Vec<u8>,
}

impl LogRecord {
    pub fn new(timestamp: DateTime<Local>, payload: Vec<u8>) -> Self {
        Self { timestamp, payload }
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Serialized form appended to the log file: `<timestamp>,<payload>\n`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let timestamp = self.formatted_timestamp();
        let mut bytes = Vec::with_capacity(timestamp.len() + self.payload.len() + 2);
        bytes.extend_from_slice(timestamp.as_bytes());
        bytes.push(b',');
        bytes.extend_from_slice(&self.payload);
        bytes.push(b'\n');
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};

    fn at(micros: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
            + chrono::Duration::microseconds(micros as i64)
    }

    #[test]
    fn timestamp_has_six_fractional_digits() {
        let record = LogRecord::new(at(0), b"x".to_vec());
        assert_eq!(record.formatted_timestamp(), "2024-01-01 10:00:00.000000");

        let record = LogRecord::new(at(42), b"x".to_vec());
        assert_eq!(record.formatted_timestamp(), "2024-01-01 10:00:00.000042");
    }

    #[test]
    fn formatted_timestamp_parses_back() {
        let record = LogRecord::new(at(123_456), Vec::new());
        let text = record.formatted_timestamp();

        assert_eq!(text.len(), 26);
        let parsed = NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT).unwrap();
        assert_eq!(parsed, at(123_456).naive_local());
    }

    #[test]
    fn payload_is_kept_verbatim_with_its_terminator() {
        let record = LogRecord::new(at(0), b"OK 12 34\r\n".to_vec());
        assert_eq!(
            record.to_bytes(),
            b"2024-01-01 10:00:00.000000,OK 12 34\r\n\n".to_vec()
        );
    }

    #[test]
    fn commas_and_non_utf8_bytes_are_not_escaped() {
        let record = LogRecord::new(at(0), vec![b'a', b',', 0xff, b'b']);
        let bytes = record.to_bytes();

        assert!(bytes.ends_with(&[b',', b'a', b',', 0xff, b'b', b'\n']));
    }
}
