//! Timeline events reconstructed from a night's log.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

/// Sequencer milestones that appear on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceStep {
    /// The start area container finished (cool-down, unpark, ...).
    StartSequence,
    /// The end area container finished (warm-up, park, ...).
    EndSequence,
    StartedTargetScheduler,
    FinishedTargetScheduler,
    Cancelled,
}

impl SequenceStep {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StartSequence => "Start sequence",
            Self::EndSequence => "End sequence",
            Self::StartedTargetScheduler => "Started Target Scheduler",
            Self::FinishedTargetScheduler => "Finished Target Scheduler",
            Self::Cancelled => "Sequence cancelled",
        }
    }
}

/// Application start and stop markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Started,
    Stopped,
}

impl Lifecycle {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "NINA started",
            Self::Stopped => "NINA stopped",
        }
    }
}

/// What a timeline entry represents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    SequenceSpan(SequenceStep),
    /// The safety monitor reported unsafe conditions.
    UnsafeSpan,
    LifecycleMarker(Lifecycle),
    /// First to last saved exposure of a target.
    TargetSpan(String),
}

impl EventKind {
    /// Label shown in reports.
    pub fn label(&self) -> &str {
        match self {
            Self::SequenceSpan(step) => step.as_str(),
            Self::UnsafeSpan => "unsafe",
            Self::LifecycleMarker(marker) => marker.as_str(),
            Self::TargetSpan(name) => name,
        }
    }

    pub const fn is_unsafe(&self) -> bool {
        matches!(self, Self::UnsafeSpan)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

/// A span or instant on the night's timeline.
///
/// Either end may be missing, e.g. an end-sequence span whose start was logged
/// in a file that was not read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl Event {
    pub const fn new(
        kind: EventKind,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Self {
        Self { kind, start, end }
    }

    /// An event whose start and end coincide.
    pub const fn instant(kind: EventKind, at: NaiveDateTime) -> Self {
        Self::new(kind, Some(at), Some(at))
    }

    /// Length in whole seconds, if both ends are known and ordered.
    pub fn duration_seconds(&self) -> Option<i64> {
        let (start, end) = (self.start?, self.end?);
        let seconds = (end - start).num_seconds();
        (seconds >= 0).then_some(seconds)
    }

    /// Length in minutes, if both ends are known and ordered.
    #[allow(clippy::cast_precision_loss)]
    pub fn minutes(&self) -> Option<f64> {
        self.duration_seconds().map(|s| s as f64 / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::timestamp::parse_timestamp;

    fn ts(value: &str) -> NaiveDateTime {
        parse_timestamp(value).unwrap()
    }

    #[test]
    fn labels_match_report_vocabulary() {
        let cases = [
            (EventKind::SequenceSpan(SequenceStep::StartSequence), "Start sequence"),
            (EventKind::SequenceSpan(SequenceStep::EndSequence), "End sequence"),
            (
                EventKind::SequenceSpan(SequenceStep::StartedTargetScheduler),
                "Started Target Scheduler",
            ),
            (
                EventKind::SequenceSpan(SequenceStep::FinishedTargetScheduler),
                "Finished Target Scheduler",
            ),
            (EventKind::SequenceSpan(SequenceStep::Cancelled), "Sequence cancelled"),
            (EventKind::UnsafeSpan, "unsafe"),
            (EventKind::LifecycleMarker(Lifecycle::Started), "NINA started"),
            (EventKind::LifecycleMarker(Lifecycle::Stopped), "NINA stopped"),
            (EventKind::TargetSpan("M42".to_string()), "M42"),
        ];
        for (kind, label) in cases {
            assert_eq!(kind.to_string(), label);
        }
    }

    #[test]
    fn minutes_between_ends() {
        let event = Event::new(
            EventKind::UnsafeSpan,
            Some(ts("2025-01-02T23:00:00.000")),
            Some(ts("2025-01-03T00:30:00.000")),
        );
        assert_eq!(event.duration_seconds(), Some(5400));
        assert_eq!(event.minutes(), Some(90.0));
    }

    #[test]
    fn missing_or_reversed_ends_have_no_duration() {
        let at = ts("2025-01-02T23:00:00.000");
        assert_eq!(Event::new(EventKind::UnsafeSpan, None, Some(at)).minutes(), None);
        assert_eq!(Event::new(EventKind::UnsafeSpan, Some(at), None).minutes(), None);

        let earlier = ts("2025-01-02T22:00:00.000");
        assert_eq!(
            Event::new(EventKind::UnsafeSpan, Some(at), Some(earlier)).duration_seconds(),
            None
        );
    }

    #[test]
    fn instant_has_zero_duration() {
        let event = Event::instant(
            EventKind::LifecycleMarker(Lifecycle::Started),
            ts("2025-01-02T18:00:00.000"),
        );
        assert_eq!(event.duration_seconds(), Some(0));
    }
}
