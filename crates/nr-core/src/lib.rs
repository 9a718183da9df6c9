//! Core domain logic for NINA night reports.
//!
//! This crate contains the fundamental types and logic for:
//! - Tokenizing: splitting pipe-delimited log lines into records
//! - Classification: recognizing the records that matter for a night
//! - Aggregation: folding records into per-night state across log files
//! - Summaries: report-ready statistics and timelines for one night

pub mod aggregate;
pub mod classify;
mod duration;
pub mod event;
pub mod naming;
pub mod night;
pub mod record;
pub mod summary;
mod timestamp;

pub use aggregate::{Diagnostics, InFlight, IngestError, NightAggregator};
pub use classify::{Effect, Field, FieldError, classify};
pub use duration::{human_duration, human_duration_f64};
pub use event::{Event, EventKind, Lifecycle, SequenceStep};
pub use naming::{NamingScheme, UNKNOWN_TARGET, UnknownNamingScheme};
pub use night::{Exposure, Night, NightRegistry, Target, night_date};
pub use record::{LogRecord, tokenize};
pub use summary::{FilterTotal, NightSummary, TargetSummary, TimelineEntry, build_summary};
pub use timestamp::{LOG_TIMESTAMP_FORMAT, TimestampError, format_clock, parse_timestamp};
