//! Tokenizing raw log lines into [`LogRecord`]s.
//!
//! NINA writes one record per line:
//!
//! ```text
//! 2025-01-02T22:14:03.4711|INFO|SequenceItem.cs|Run|208|Starting Category: ...
//! ```
//!
//! The log also contains a `DATE|LEVEL|...` header and `----` divider lines,
//! which carry no record and are skipped.

use chrono::NaiveDateTime;

use crate::timestamp::{TimestampError, parse_timestamp};

/// Field separator between the six segments of a record.
const SEPARATOR: char = '|';

/// Number of segments in a complete record.
const FIELD_COUNT: usize = 6;

/// Prefix of the divider lines NINA writes between log sections.
const DIVIDER_PREFIX: &str = "---";

/// Prefix of the column header line.
const HEADER_PREFIX: &str = "DATE|";

/// Level value that marks a record as an error.
pub const ERROR_LEVEL: &str = "ERROR";

/// One tokenized log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: NaiveDateTime,
    pub level: String,
    pub source: String,
    pub component: String,
    /// Source line number in the emitting file, kept as text.
    pub line: String,
    pub message: String,
}

impl LogRecord {
    /// Whether the record was logged at error level.
    pub fn is_error(&self) -> bool {
        self.level.trim() == ERROR_LEVEL
    }
}

/// Splits one raw line into a [`LogRecord`].
///
/// Returns `Ok(None)` for dividers, the header, and anything that does not
/// start with a four digit year. Missing trailing fields become empty strings.
/// A `|` inside the message is kept as part of the message.
pub fn tokenize(line: &str) -> Result<Option<LogRecord>, TimestampError> {
    if !is_record_line(line) {
        return Ok(None);
    }

    let mut segments = line.splitn(FIELD_COUNT, SEPARATOR);
    let timestamp = parse_timestamp(segments.next().unwrap_or_default())?;
    let mut next = || segments.next().unwrap_or_default().to_string();

    Ok(Some(LogRecord {
        timestamp,
        level: next(),
        source: next(),
        component: next(),
        line: next(),
        message: next(),
    }))
}

fn is_record_line(line: &str) -> bool {
    if line.starts_with(DIVIDER_PREFIX) || line.starts_with(HEADER_PREFIX) {
        return false;
    }
    line.len() >= 4 && line.as_bytes()[..4].iter().all(u8::is_ascii_digit)
}
