//! Folding classified records into nights.
//!
//! Records must be applied in log order: exposure fields, unsafe spans and
//! sequence containers are opened by one record and closed by a later one,
//! possibly in the next log file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::mem;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

use crate::classify::{Container, Effect, Field, FieldError, SavedImage, classify};
use crate::event::{Event, EventKind, Lifecycle, SequenceStep};
use crate::naming::{NamingScheme, UNKNOWN_TARGET};
use crate::night::{ExposureDraft, Night, NightRegistry};
use crate::record::{LogRecord, tokenize};

/// Errors reading log input.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// State carried from one record to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InFlight {
    /// Fields of the exposure currently being captured.
    pub exposure: ExposureDraft,
    /// Start of the open unsafe span, if the monitor is currently unsafe.
    pub unsafe_since: Option<NaiveDateTime>,
    pub start_area_since: Option<NaiveDateTime>,
    pub end_area_since: Option<NaiveDateTime>,
}

/// Data-quality counters for one run.
///
/// Parsing never fails on bad data; these counters record what was defaulted
/// or dropped instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub lines_read: u64,
    pub records: u64,
    /// Dividers, headers, stack traces and other non-record lines.
    pub skipped_lines: u64,
    pub malformed_timestamps: u64,
    pub field_failures: BTreeMap<Field, u64>,
    /// Saved images whose path did not yield a target name.
    pub unknown_targets: u64,
    /// Safe transitions with no open unsafe span.
    pub unmatched_safe: u64,
    /// Partially captured exposures dropped by an unsafe transition.
    pub discarded_exposures: u64,
}

impl Diagnostics {
    fn field_failed(&mut self, err: &FieldError) {
        tracing::debug!(field = %err.field, text = %err.message, "best-effort field extraction failed");
        *self.field_failures.entry(err.field).or_insert(0) += 1;
    }

    /// Sum of all per-field failures.
    pub fn total_field_failures(&self) -> u64 {
        self.field_failures.values().sum()
    }
}

/// Builds nights from a stream of records.
#[derive(Debug, Clone, Default)]
pub struct NightAggregator {
    scheme: NamingScheme,
    registry: NightRegistry,
    state: InFlight,
    diagnostics: Diagnostics,
}

impl NightAggregator {
    pub fn new(scheme: NamingScheme) -> Self {
        Self {
            scheme,
            ..Self::default()
        }
    }

    pub const fn registry(&self) -> &NightRegistry {
        &self.registry
    }

    pub const fn state(&self) -> &InFlight {
        &self.state
    }

    pub const fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Consumes the aggregator, returning the nights and run diagnostics.
    ///
    /// Anything still in flight (an open unsafe span, an unsaved exposure) is
    /// dropped.
    pub fn finish(self) -> (NightRegistry, Diagnostics) {
        if let Some(since) = self.state.unsafe_since {
            tracing::debug!(%since, "unsafe span still open at end of input");
        }
        (self.registry, self.diagnostics)
    }

    /// Reads one log file and applies its lines.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn ingest_file(&mut self, path: &Path) -> Result<(), IngestError> {
        let io_error = |source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_error)?;
        tracing::info!(path = %path.display(), "parsing log file");
        self.ingest_reader(BufReader::new(file)).map_err(io_error)
    }

    /// Applies lines from `reader` until end of input.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn ingest_reader<R: BufRead>(&mut self, mut reader: R) -> io::Result<()> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(());
            }
            let line = String::from_utf8_lossy(&buf);
            self.ingest_line(line.trim_end_matches(['\n', '\r']));
        }
    }

    /// Applies every line of `text`.
    pub fn ingest_str(&mut self, text: &str) {
        for line in text.lines() {
            self.ingest_line(line);
        }
    }

    /// Tokenizes and applies a single raw line.
    pub fn ingest_line(&mut self, line: &str) {
        self.diagnostics.lines_read += 1;
        match tokenize(line) {
            Ok(Some(record)) => {
                self.diagnostics.records += 1;
                self.step(&record);
            }
            Ok(None) => self.diagnostics.skipped_lines += 1,
            Err(err) => {
                tracing::warn!(error = %err, "skipping line with malformed timestamp");
                self.diagnostics.malformed_timestamps += 1;
            }
        }
    }

    /// Applies one record to the night it belongs to.
    pub fn step(&mut self, record: &LogRecord) {
        let effect = classify(record, self.scheme);
        let night = self.registry.resolve(record.timestamp);
        if record.is_error() {
            night.error_count += 1;
        }
        if let Some(effect) = effect {
            apply(
                night,
                &mut self.state,
                &mut self.diagnostics,
                effect,
                record.timestamp,
            );
        }
    }
}

fn apply(
    night: &mut Night,
    state: &mut InFlight,
    diagnostics: &mut Diagnostics,
    effect: Effect,
    at: NaiveDateTime,
) {
    match effect {
        Effect::ContainerStarting(Container::StartArea) => state.start_area_since = Some(at),
        Effect::ContainerStarting(Container::EndArea) => state.end_area_since = Some(at),
        Effect::ContainerStarting(Container::TargetArea) => {
            night.end_sequence = Some(at);
            push_marker(night, SequenceStep::StartedTargetScheduler, at);
        }
        Effect::ContainerFinishing(Container::StartArea) => {
            night.start_sequence = Some(at);
            night.events.push(Event::new(
                EventKind::SequenceSpan(SequenceStep::StartSequence),
                state.start_area_since.take(),
                Some(at),
            ));
        }
        Effect::ContainerFinishing(Container::EndArea) => {
            night.end_sequence = Some(at);
            night.events.push(Event::new(
                EventKind::SequenceSpan(SequenceStep::EndSequence),
                state.end_area_since.take(),
                Some(at),
            ));
        }
        Effect::ContainerFinishing(Container::TargetArea) => {
            night.end_sequence = Some(at);
            push_marker(night, SequenceStep::FinishedTargetScheduler, at);
        }
        Effect::SequenceCancelled => push_marker(night, SequenceStep::Cancelled, at),
        Effect::Unsafe => {
            if let Some(since) = state.unsafe_since {
                tracing::debug!(%since, "unsafe transition while already unsafe, restarting span");
            }
            state.unsafe_since = Some(at);
            if !state.exposure.is_empty() {
                diagnostics.discarded_exposures += 1;
            }
            state.exposure = ExposureDraft::default();
        }
        Effect::Safe => {
            if let Some(since) = state.unsafe_since.take() {
                night
                    .events
                    .push(Event::new(EventKind::UnsafeSpan, Some(since), Some(at)));
            } else {
                tracing::debug!(%at, "safe transition without open unsafe span");
                diagnostics.unmatched_safe += 1;
            }
        }
        Effect::Capture(seconds) => match seconds {
            Ok(seconds) => {
                state.exposure.exposure_seconds = seconds;
                night.record_capture(at);
            }
            Err(err) => diagnostics.field_failed(&err),
        },
        Effect::Detect { hfr, stars } => {
            match hfr {
                Ok(hfr) => state.exposure.half_flux_radius = hfr,
                Err(err) => diagnostics.field_failed(&err),
            }
            match stars {
                Ok(stars) => state.exposure.star_count = stars,
                Err(err) => diagnostics.field_failed(&err),
            }
        }
        Effect::PlateSolve(drift) => match drift {
            Ok(drift) => state.exposure.drift = drift,
            Err(err) => diagnostics.field_failed(&err),
        },
        Effect::Saved(SavedImage { filter, target }) => {
            let filter = filter.unwrap_or_else(|err| {
                diagnostics.field_failed(&err);
                String::new()
            });
            let target = target.unwrap_or_else(|err| {
                diagnostics.field_failed(&err);
                diagnostics.unknown_targets += 1;
                UNKNOWN_TARGET.to_string()
            });
            let exposure = mem::take(&mut state.exposure).finish(at, target, filter);
            night.add_exposure(exposure);
        }
        Effect::Shutdown => {
            night.end_timestamp = Some(at);
            night.events.push(Event::instant(
                EventKind::LifecycleMarker(Lifecycle::Stopped),
                at,
            ));
        }
        Effect::Startup => night.events.push(Event::instant(
            EventKind::LifecycleMarker(Lifecycle::Started),
            at,
        )),
    }
}

fn push_marker(night: &mut Night, step: SequenceStep, at: NaiveDateTime) {
    night
        .events
        .push(Event::instant(EventKind::SequenceSpan(step), at));
}
