//! Nights, targets and exposures, and the registry that buckets records into nights.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::event::Event;

/// Records logged before this hour belong to the previous evening's night.
const NIGHT_BOUNDARY_HOUR: u32 = 12;

/// One saved light frame and its quality metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exposure {
    /// When the frame was saved to disk.
    pub timestamp: NaiveDateTime,
    pub target: String,
    pub filter: String,
    pub exposure_seconds: f64,
    /// Half-flux radius in arcseconds; lower is sharper.
    pub half_flux_radius: f64,
    pub star_count: u32,
    /// Guiding drift in arcseconds per second.
    pub drift: f64,
}

/// Exposure fields collected from the records preceding a save.
///
/// Capture, detection and plate-solve records carry no correlation key, so
/// whatever is in the draft when a save arrives is attributed to that frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExposureDraft {
    pub exposure_seconds: f64,
    pub half_flux_radius: f64,
    pub star_count: u32,
    pub drift: f64,
}

impl ExposureDraft {
    /// Whether nothing has been collected since the last reset.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn finish(self, timestamp: NaiveDateTime, target: String, filter: String) -> Exposure {
        Exposure {
            timestamp,
            target,
            filter,
            exposure_seconds: self.exposure_seconds,
            half_flux_radius: self.half_flux_radius,
            star_count: self.star_count,
            drift: self.drift,
        }
    }
}

/// An imaged object and its exposures in save order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    pub name: String,
    pub exposures: Vec<Exposure>,
}

impl Target {
    pub const fn new(name: String) -> Self {
        Self {
            name,
            exposures: Vec::new(),
        }
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.exposures.first().map(|e| e.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.exposures.last().map(|e| e.timestamp)
    }
}

/// One observing session, keyed by the date of its evening.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Night {
    pub date: NaiveDate,
    pub start_sequence: Option<NaiveDateTime>,
    pub end_sequence: Option<NaiveDateTime>,
    /// First capture of the night.
    pub start_timestamp: Option<NaiveDateTime>,
    /// Last capture or application shutdown, whichever was logged last.
    pub end_timestamp: Option<NaiveDateTime>,
    pub total_exposure_seconds: f64,
    pub exposure_count: u32,
    pub error_count: u32,
    pub events: Vec<Event>,
    /// Targets in the order their first exposure was saved.
    pub targets: Vec<Target>,
}

impl Night {
    pub const fn new(date: NaiveDate) -> Self {
        Self {
            date,
            start_sequence: None,
            end_sequence: None,
            start_timestamp: None,
            end_timestamp: None,
            total_exposure_seconds: 0.0,
            exposure_count: 0,
            error_count: 0,
            events: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Whether any capture was recorded.
    pub const fn has_activity(&self) -> bool {
        self.start_timestamp.is_some()
    }

    /// Extends the capture window to include `timestamp`.
    pub fn record_capture(&mut self, timestamp: NaiveDateTime) {
        if self.start_timestamp.is_none() {
            self.start_timestamp = Some(timestamp);
        }
        self.end_timestamp = Some(timestamp);
    }

    /// Adds a finished exposure to its target, creating the target if needed.
    pub fn add_exposure(&mut self, exposure: Exposure) {
        self.exposure_count += 1;
        self.total_exposure_seconds += exposure.exposure_seconds;

        let index = if let Some(index) = self.targets.iter().position(|t| t.name == exposure.target) {
            index
        } else {
            self.targets.push(Target::new(exposure.target.clone()));
            self.targets.len() - 1
        };
        self.targets[index].exposures.push(exposure);
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Seconds from the start area finishing to the last sequence activity.
    pub fn sequence_duration_seconds(&self) -> Option<i64> {
        Some((self.end_sequence? - self.start_sequence?).num_seconds())
    }

    /// Seconds between the first and last capture.
    pub fn imaging_duration_seconds(&self) -> Option<i64> {
        Some((self.end_timestamp? - self.start_timestamp?).num_seconds())
    }

    /// Total minutes covered by unsafe events.
    pub fn unsafe_minutes(&self) -> f64 {
        self.events
            .iter()
            .filter(|e| e.kind.is_unsafe())
            .filter_map(Event::minutes)
            .sum()
    }

    /// Imaging minutes not covered by unsafe events, never negative.
    #[allow(clippy::cast_precision_loss)]
    pub fn safe_minutes(&self) -> Option<f64> {
        let imaging = self.imaging_duration_seconds()? as f64 / 60.0;
        Some((imaging - self.unsafe_minutes()).max(0.0))
    }
}

/// Returns the date of the night a timestamp belongs to.
///
/// Nights span midnight: anything before noon counts towards the previous
/// evening.
pub fn night_date(timestamp: NaiveDateTime) -> NaiveDate {
    let date = timestamp.date();
    if timestamp.hour() < NIGHT_BOUNDARY_HOUR {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    }
}

/// Nights in the order they were first seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NightRegistry {
    nights: Vec<Night>,
}

impl NightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the night `timestamp` belongs to, creating it on first use.
    pub fn resolve(&mut self, timestamp: NaiveDateTime) -> &mut Night {
        let date = night_date(timestamp);
        let index = if let Some(index) = self.nights.iter().position(|n| n.date == date) {
            index
        } else {
            tracing::debug!(%date, "discovered night");
            self.nights.push(Night::new(date));
            self.nights.len() - 1
        };
        &mut self.nights[index]
    }

    pub fn get(&self, date: NaiveDate) -> Option<&Night> {
        self.nights.iter().find(|n| n.date == date)
    }

    /// The `n`th night counting back from the most recently discovered one.
    pub fn nth_from_last(&self, n: usize) -> Option<&Night> {
        self.nights.iter().rev().nth(n)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Night> {
        self.nights.iter()
    }

    pub fn len(&self) -> usize {
        self.nights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nights.is_empty()
    }
}

impl<'a> IntoIterator for &'a NightRegistry {
    type Item = &'a Night;
    type IntoIter = std::slice::Iter<'a, Night>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
