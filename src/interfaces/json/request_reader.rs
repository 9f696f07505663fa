use crate::domain::action::ActionRequest;
use crate::error::{Result, SettlementError};
use std::io::{BufRead, BufReader, Read};

/// Reads action requests from a JSON-lines source.
///
/// Each non-blank line holds one request object. A line that fails to parse
/// yields an error for that line only; the following lines are still read.
pub struct RequestReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
        }
    }

    /// Returns an iterator that lazily reads and deserializes requests.
    pub fn requests(self) -> impl Iterator<Item = Result<ActionRequest>> {
        self.reader
            .lines()
            .filter(|line| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
            .map(|line| {
                let line = line?;
                serde_json::from_str(&line).map_err(SettlementError::from)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = concat!(
            r#"{"bookingId":"6f1c1c1e-8d0a-4e43-9a53-0d9a2f1d7a11","actor":"admin","action":"approve"}"#,
            "\n\n",
            r#"{"bookingId":"6f1c1c1e-8d0a-4e43-9a53-0d9a2f1d7a11","actor":"admin","action":"partial_waive","waivePercentage":50,"waiveReason":"goodwill"}"#,
            "\n"
        );
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<ActionRequest>> = reader.requests().collect();

        assert_eq!(results.len(), 2);
        let second = results[1].as_ref().unwrap();
        assert_eq!(second.action, "partial_waive");
        assert_eq!(second.waive_percentage, Some(dec!(50)));
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = concat!(
            "{not json}\n",
            r#"{"bookingId":"6f1c1c1e-8d0a-4e43-9a53-0d9a2f1d7a11","actor":"admin","action":"reject"}"#
        );
        let reader = RequestReader::new(data.as_bytes());
        let results: Vec<Result<ActionRequest>> = reader.requests().collect();

        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }
}
