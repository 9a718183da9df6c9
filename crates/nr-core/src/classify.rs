//! Rule table mapping tokenized records to effects on the night being built.
//!
//! Rules are keyed on the record's component (the C# member that logged it)
//! and a prefix or substring of the message. At most one rule fires per
//! record. Numeric sub-parsers are best effort: each returns its own
//! [`FieldError`] so the aggregator can keep the previous value and count the
//! failure instead of dropping the line.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::naming::NamingScheme;
use crate::record::LogRecord;

const RUN: &str = "Run";
const START: &str = "Start";
const MONITOR: &str = "UpdateMonitorValues";
const CAPTURE: &str = "Capture";
const DETECT: &str = "Detect";
const PLATE_SOLVE: &str = "PlatesolvingImageFollower_PropertyChanged";
const SAVE_TO_DISK: &str = "SaveToDisk";
const CLOSING: &str = "Closing";
const PLATFORM_CHECK: &str = "CheckASCOMPlatformVersion";

const STARTING: &str = "Starting";
const FINISHING: &str = "Finishing";
const CANCELLED: &str = "Sequence run was cancelled";
const UNSAFE: &str = "SafetyMonitorInfo state changed to Unsafe";
const SAFE: &str = "SafetyMonitorInfo state changed to Safe";
const SHUTTING_DOWN: &str = "Application shutting down";

/// Save records for this directory are plate-solver scratch images.
const PLATE_SOLVER_CACHE: &str = r"AppData\Local\NINA\PlateSolver";

/// Extracted field of an exposure record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ExposureSeconds,
    HalfFluxRadius,
    StarCount,
    Drift,
    Filter,
    Target,
}

impl Field {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ExposureSeconds => "exposure_seconds",
            Self::HalfFluxRadius => "half_flux_radius",
            Self::StarCount => "star_count",
            Self::Drift => "drift",
            Self::Filter => "filter",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field that could not be extracted from a message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("could not extract {field} from {message:?}")]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    fn new(field: Field, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

/// Sequencer containers whose start and finish are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    StartArea,
    TargetArea,
    EndArea,
}

impl Container {
    const ALL: [Self; 3] = [Self::StartArea, Self::TargetArea, Self::EndArea];

    /// Fully qualified type name as it appears in `Run` messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::StartArea => "NINA.Sequencer.Container.StartAreaContainer",
            Self::TargetArea => "NINA.Sequencer.Container.TargetAreaContainer",
            Self::EndArea => "NINA.Sequencer.Container.EndAreaContainer",
        }
    }

    fn named_in(message: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|container| message.contains(container.type_name()))
    }
}

/// Path details of a saved light frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub filter: Result<String, FieldError>,
    pub target: Result<String, FieldError>,
}

/// What a record does to the night it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ContainerStarting(Container),
    ContainerFinishing(Container),
    SequenceCancelled,
    /// Safety monitor turned unsafe.
    Unsafe,
    /// Safety monitor turned safe again.
    Safe,
    Capture(Result<f64, FieldError>),
    Detect {
        hfr: Result<f64, FieldError>,
        stars: Result<u32, FieldError>,
    },
    PlateSolve(Result<f64, FieldError>),
    Saved(SavedImage),
    Shutdown,
    Startup,
}

/// Applies the rule table to one record.
pub fn classify(record: &LogRecord, scheme: NamingScheme) -> Option<Effect> {
    let message = record.message.as_str();
    match record.component.as_str() {
        RUN => {
            let container = Container::named_in(message)?;
            if message.starts_with(STARTING) {
                Some(Effect::ContainerStarting(container))
            } else if message.starts_with(FINISHING) {
                Some(Effect::ContainerFinishing(container))
            } else {
                None
            }
        }
        START if message.starts_with(CANCELLED) => Some(Effect::SequenceCancelled),
        MONITOR if message.starts_with(UNSAFE) => Some(Effect::Unsafe),
        MONITOR if message.starts_with(SAFE) => Some(Effect::Safe),
        CAPTURE => Some(Effect::Capture(parse_exposure_seconds(message))),
        DETECT => Some(Effect::Detect {
            hfr: parse_half_flux_radius(message),
            stars: parse_star_count(message),
        }),
        PLATE_SOLVE => Some(Effect::PlateSolve(parse_drift(message))),
        SAVE_TO_DISK => {
            if message.contains(PLATE_SOLVER_CACHE) {
                tracing::debug!(path = message, "ignoring plate solver cache image");
                return None;
            }
            Some(Effect::Saved(parse_saved_image(message, scheme)))
        }
        CLOSING if message.starts_with(SHUTTING_DOWN) => Some(Effect::Shutdown),
        PLATFORM_CHECK => Some(Effect::Startup),
        _ => None,
    }
}

/// Text between the first and second `:` of a `label:value` segment, or the
/// whole segment when it has no label.
fn labelled_value(segment: &str) -> &str {
    segment.split(':').nth(1).unwrap_or(segment)
}

fn first_segment(message: &str, separator: char) -> &str {
    message.split(separator).next().unwrap_or_default()
}

/// `Exposure:300s;Gain:100;...` → `300.0`.
pub fn parse_exposure_seconds(message: &str) -> Result<f64, FieldError> {
    let value = labelled_value(first_segment(message, ';')).replace('s', "");
    value
        .trim()
        .parse()
        .map_err(|_| FieldError::new(Field::ExposureSeconds, message))
}

/// `HFR:2.34, HFR MAD:0.1, Detected stars 412` → `2.34`.
pub fn parse_half_flux_radius(message: &str) -> Result<f64, FieldError> {
    labelled_value(first_segment(message, ','))
        .trim()
        .parse()
        .map_err(|_| FieldError::new(Field::HalfFluxRadius, message))
}

/// Star count from the third comma-separated segment.
///
/// Takes the fourth whitespace-separated token, or the last one when the
/// segment is shorter.
pub fn parse_star_count(message: &str) -> Result<u32, FieldError> {
    let segment = message
        .split(',')
        .nth(2)
        .ok_or_else(|| FieldError::new(Field::StarCount, message))?;
    let mut tokens = segment.split_whitespace();
    let token = tokens
        .clone()
        .nth(3)
        .or_else(|| tokens.next_back())
        .ok_or_else(|| FieldError::new(Field::StarCount, message))?;
    token
        .parse()
        .map_err(|_| FieldError::new(Field::StarCount, message))
}

/// `Drift:0.33/5 s, ...` → `0.33` arcsec per second.
pub fn parse_drift(message: &str) -> Result<f64, FieldError> {
    first_segment(labelled_value(first_segment(message, ',')), '/')
        .trim()
        .parse()
        .map_err(|_| FieldError::new(Field::Drift, message))
}

/// Filter and target of a saved image.
///
/// The filter is the directory holding the file; the target depends on the
/// naming scheme.
pub fn parse_saved_image(message: &str, scheme: NamingScheme) -> SavedImage {
    let segments: Vec<&str> = message.split(['\\', '/']).collect();
    let filter = segments
        .len()
        .checked_sub(2)
        .map(|index| segments[index].to_string())
        .ok_or_else(|| FieldError::new(Field::Filter, message));
    let target = scheme
        .target_name(&segments)
        .ok_or_else(|| FieldError::new(Field::Target, message));
    SavedImage { filter, target }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::timestamp::parse_timestamp;

    fn record(component: &str, message: &str) -> LogRecord {
        LogRecord {
            timestamp: parse_timestamp("2025-01-02T22:00:00.000").unwrap(),
            level: "INFO".to_string(),
            source: "Test.cs".to_string(),
            component: component.to_string(),
            line: "1".to_string(),
            message: message.to_string(),
        }
    }

    fn classify_amos(component: &str, message: &str) -> Option<Effect> {
        classify(&record(component, message), NamingScheme::Amos)
    }

    #[test]
    fn run_messages_map_to_containers() {
        assert_eq!(
            classify_amos(
                "Run",
                "Starting Category: Container, Item: StartAreaContainer, Container: NINA.Sequencer.Container.StartAreaContainer"
            ),
            Some(Effect::ContainerStarting(Container::StartArea))
        );
        assert_eq!(
            classify_amos(
                "Run",
                "Finishing Category: Container, Container: NINA.Sequencer.Container.EndAreaContainer"
            ),
            Some(Effect::ContainerFinishing(Container::EndArea))
        );
        assert_eq!(
            classify_amos("Run", "Finishing Container: NINA.Sequencer.Container.TargetAreaContainer"),
            Some(Effect::ContainerFinishing(Container::TargetArea))
        );
    }

    #[test]
    fn run_without_tracked_container_is_ignored() {
        assert_eq!(
            classify_amos("Run", "Starting Category: Camera, Item: TakeExposure"),
            None
        );
        assert_eq!(
            classify_amos("Run", "Canceled NINA.Sequencer.Container.EndAreaContainer"),
            None
        );
    }

    #[test]
    fn safety_monitor_transitions() {
        assert_eq!(
            classify_amos("UpdateMonitorValues", "SafetyMonitorInfo state changed to Unsafe"),
            Some(Effect::Unsafe)
        );
        assert_eq!(
            classify_amos("UpdateMonitorValues", "SafetyMonitorInfo state changed to Safe"),
            Some(Effect::Safe)
        );
        assert_eq!(classify_amos("UpdateMonitorValues", "Polling"), None);
    }

    #[test]
    fn lifecycle_records() {
        assert_eq!(
            classify_amos("Closing", "Application shutting down"),
            Some(Effect::Shutdown)
        );
        assert_eq!(
            classify_amos("CheckASCOMPlatformVersion", "ASCOM Platform 6.6 SP2 installed"),
            Some(Effect::Startup)
        );
        assert_eq!(
            classify_amos("Start", "Sequence run was cancelled - user stop"),
            Some(Effect::SequenceCancelled)
        );
    }

    #[test]
    fn capture_duration() {
        assert_eq!(parse_exposure_seconds("Exposure:300s;Gain:100"), Ok(300.0));
        assert_eq!(parse_exposure_seconds("10s;..."), Ok(10.0));
        assert_eq!(parse_exposure_seconds("Exposure: 2.5s; Binning 1x1"), Ok(2.5));
    }

    #[test]
    fn capture_failure_is_reported() {
        let err = parse_exposure_seconds("Starting exposure").unwrap_err();
        assert_eq!(err.field, Field::ExposureSeconds);
    }

    #[test]
    fn detection_metrics() {
        let message = "HFR:2.1, x, a b c 37";
        assert_eq!(parse_half_flux_radius(message), Ok(2.1));
        assert_eq!(parse_star_count(message), Ok(37));
    }

    #[test]
    fn star_count_falls_back_to_last_token() {
        assert_eq!(
            parse_star_count("Average HFR: 2.53, HFR MAD: 0.12, Detected Stars 245"),
            Ok(245)
        );
    }

    #[test]
    fn detection_without_star_segment_fails_only_stars() {
        let effect = classify_amos("Detect", "HFR:3.5").unwrap();
        let Effect::Detect { hfr, stars } = effect else {
            panic!("expected detect effect");
        };
        assert_eq!(hfr, Ok(3.5));
        assert_eq!(stars.unwrap_err().field, Field::StarCount);
    }

    #[test]
    fn plate_solve_drift() {
        assert_eq!(parse_drift("Drift:0.33/5 s, RA: 1, Dec: 2"), Ok(0.33));
        assert_eq!(parse_drift("0.33/5,..."), Ok(0.33));
        assert_eq!(parse_drift("Drift:n/a, x").unwrap_err().field, Field::Drift);
    }

    #[test]
    fn plate_solver_cache_is_skipped() {
        assert_eq!(
            classify_amos(
                "SaveToDisk",
                r"Saving image at C:\Users\me\AppData\Local\NINA\PlateSolver\tmp.fits"
            ),
            None
        );
    }

    #[test]
    fn saved_image_fields() {
        let SavedImage { filter, target } = parse_saved_image(
            r"D:\AMOS\2025-01-02\LUM\2025-01-02_22-10-01_LIGHT_300s_-10C_G100_O30_M 31_0001.fits",
            NamingScheme::Amos,
        );
        assert_eq!(filter.as_deref(), Ok("LUM"));
        assert_eq!(target.as_deref(), Ok("M31"));
    }

    #[test]
    fn saved_image_without_directories() {
        let SavedImage { filter, target } = parse_saved_image("image.fits", NamingScheme::SkyImages);
        assert_eq!(filter.unwrap_err().field, Field::Filter);
        assert_eq!(target.unwrap_err().field, Field::Target);
    }
}
