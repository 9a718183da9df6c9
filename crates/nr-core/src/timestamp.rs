//! Conversion between log timestamp text and `chrono` values.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Layout of the first field of every log line, e.g. `2025-01-03T02:00:00.1234`.
///
/// The fractional part is optional when parsing.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A timestamp that could not be converted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimestampError {
    /// The field was empty.
    #[error("timestamp is empty")]
    Empty,
    /// The field did not match [`LOG_TIMESTAMP_FORMAT`].
    #[error("unsupported timestamp format: {value:?}")]
    Unsupported { value: String },
}

/// Parses a log timestamp.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, TimestampError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TimestampError::Empty);
    }
    NaiveDateTime::parse_from_str(trimmed, LOG_TIMESTAMP_FORMAT).map_err(|_| {
        TimestampError::Unsupported {
            value: trimmed.to_string(),
        }
    })
}

/// Formats a timestamp as wall-clock `HH:MM`.
pub fn format_clock(timestamp: NaiveDateTime) -> String {
    timestamp.format("%H:%M").to_string()
}
