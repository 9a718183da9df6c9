//! Report-ready view of a finished night.
//!
//! Building a summary does not modify the night: target spans are added, the
//! timeline is sorted and consecutive unsafe spans are merged on a copy.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::duration::human_duration;
use crate::event::{Event, EventKind};
use crate::night::{Night, Target};
use crate::timestamp::format_clock;

/// Exposure totals for one filter of a target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterTotal {
    pub filter: String,
    pub exposures: usize,
    pub seconds: f64,
}

/// Per-target statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetSummary {
    pub name: String,
    pub exposures: usize,
    pub total_seconds: f64,
    pub average_hfr: f64,
    pub average_drift: f64,
    /// Filters in the order they were first used.
    pub filters: Vec<FilterTotal>,
}

/// A timeline entry with its display fields.
///
/// The clock and duration strings are empty when the underlying timestamp is
/// missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub kind: EventKind,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub start_clock: String,
    pub end_clock: String,
    pub duration: String,
}

impl TimelineEntry {
    fn render(event: Event) -> Self {
        let duration = event
            .duration_seconds()
            .and_then(|seconds| u64::try_from(seconds).ok())
            .map(human_duration)
            .unwrap_or_default();
        Self {
            start_clock: event.start.map(format_clock).unwrap_or_default(),
            end_clock: event.end.map(format_clock).unwrap_or_default(),
            duration,
            kind: event.kind,
            start: event.start,
            end: event.end,
        }
    }

    /// Whether start and end display the same minute.
    pub fn is_instant(&self) -> bool {
        self.start_clock == self.end_clock
    }
}

/// Everything a report needs about one night.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NightSummary {
    pub date: NaiveDate,
    pub has_activity: bool,
    pub exposure_count: u32,
    pub total_exposure_seconds: f64,
    pub error_count: u32,
    pub sequence_seconds: Option<i64>,
    pub imaging_seconds: Option<i64>,
    pub unsafe_minutes: f64,
    pub safe_minutes: Option<f64>,
    pub timeline: Vec<TimelineEntry>,
    pub targets: Vec<TargetSummary>,
}

/// Builds the summary of `night`.
pub fn build_summary(night: &Night) -> NightSummary {
    let mut events = night.events.clone();
    events.extend(night.targets.iter().map(target_span));
    sort_events(&mut events);
    let timeline = merge_unsafe(events)
        .into_iter()
        .map(TimelineEntry::render)
        .collect();

    NightSummary {
        date: night.date,
        has_activity: night.has_activity(),
        exposure_count: night.exposure_count,
        total_exposure_seconds: night.total_exposure_seconds,
        error_count: night.error_count,
        sequence_seconds: night.sequence_duration_seconds(),
        imaging_seconds: night.imaging_duration_seconds(),
        unsafe_minutes: night.unsafe_minutes(),
        safe_minutes: night.safe_minutes(),
        timeline,
        targets: night.targets.iter().map(summarize_target).collect(),
    }
}

fn target_span(target: &Target) -> Event {
    Event::new(
        EventKind::TargetSpan(target.name.clone()),
        target.first_timestamp(),
        target.last_timestamp(),
    )
}

/// Sorts by start time; events without a start go last, keeping their order.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by_key(|event| (event.start.is_none(), event.start));
}

/// Collapses runs of consecutive unsafe events into the first of the run,
/// extended to the end of the last. Gaps between them are absorbed.
pub fn merge_unsafe(events: Vec<Event>) -> Vec<Event> {
    let mut merged: Vec<Event> = Vec::with_capacity(events.len());
    for event in events {
        if let Some(previous) = merged.last_mut() {
            if previous.kind.is_unsafe() && event.kind.is_unsafe() {
                previous.end = event.end;
                continue;
            }
        }
        merged.push(event);
    }
    merged
}

fn summarize_target(target: &Target) -> TargetSummary {
    let count = target.exposures.len();
    let mut filters: Vec<FilterTotal> = Vec::new();
    for exposure in &target.exposures {
        if let Some(total) = filters.iter_mut().find(|f| f.filter == exposure.filter) {
            total.exposures += 1;
            total.seconds += exposure.exposure_seconds;
        } else {
            filters.push(FilterTotal {
                filter: exposure.filter.clone(),
                exposures: 1,
                seconds: exposure.exposure_seconds,
            });
        }
    }

    TargetSummary {
        name: target.name.clone(),
        exposures: count,
        total_seconds: target.exposures.iter().map(|e| e.exposure_seconds).sum(),
        average_hfr: mean(target.exposures.iter().map(|e| e.half_flux_radius), count),
        average_drift: mean(target.exposures.iter().map(|e| e.drift), count),
        filters,
    }
}

/// Zero for an empty target.
#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        values.sum::<f64>() / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::event::Lifecycle;
    use crate::night::ExposureDraft;
    use crate::timestamp::parse_timestamp;

    fn ts(value: &str) -> NaiveDateTime {
        parse_timestamp(value).unwrap()
    }

    fn span(kind: EventKind, start: &str, end: &str) -> Event {
        Event::new(kind, Some(ts(start)), Some(ts(end)))
    }

    fn night() -> Night {
        Night::new(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap())
    }

    fn add(night: &mut Night, target: &str, filter: &str, at: &str, hfr: f64) {
        let draft = ExposureDraft {
            exposure_seconds: 300.0,
            half_flux_radius: hfr,
            star_count: 100,
            drift: 0.5,
        };
        night.add_exposure(draft.finish(ts(at), target.to_string(), filter.to_string()));
    }

    #[test]
    fn adjacent_unsafe_events_merge() {
        let events = vec![
            span(EventKind::UnsafeSpan, "2025-01-02T22:00:00", "2025-01-02T22:10:00"),
            span(EventKind::UnsafeSpan, "2025-01-02T22:10:00", "2025-01-02T22:20:00"),
            span(EventKind::UnsafeSpan, "2025-01-02T22:20:00", "2025-01-02T22:30:00"),
        ];
        let merged = merge_unsafe(events);
        assert_eq!(
            merged,
            [span(EventKind::UnsafeSpan, "2025-01-02T22:00:00", "2025-01-02T22:30:00")]
        );
    }

    #[test]
    fn merge_ignores_gaps_between_unsafe_events() {
        let merged = merge_unsafe(vec![
            span(EventKind::UnsafeSpan, "2025-01-02T22:00:00", "2025-01-02T22:10:00"),
            span(EventKind::UnsafeSpan, "2025-01-03T01:00:00", "2025-01-03T01:30:00"),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].end, Some(ts("2025-01-03T01:30:00")));
    }

    #[test]
    fn interposed_event_prevents_merge() {
        let events = vec![
            span(EventKind::UnsafeSpan, "2025-01-02T22:00:00", "2025-01-02T22:10:00"),
            Event::instant(EventKind::LifecycleMarker(Lifecycle::Started), ts("2025-01-02T22:15:00")),
            span(EventKind::UnsafeSpan, "2025-01-02T22:20:00", "2025-01-02T22:30:00"),
        ];
        assert_eq!(merge_unsafe(events.clone()), events);
    }

    #[test]
    fn events_without_start_sort_last() {
        let mut events = vec![
            Event::new(EventKind::TargetSpan("late".into()), None, Some(ts("2025-01-02T20:00:00"))),
            span(EventKind::UnsafeSpan, "2025-01-03T01:00:00", "2025-01-03T02:00:00"),
            Event::instant(EventKind::LifecycleMarker(Lifecycle::Started), ts("2025-01-02T18:00:00")),
        ];
        sort_events(&mut events);
        let labels: Vec<_> = events.iter().map(|e| e.kind.to_string()).collect();
        assert_eq!(labels, ["NINA started", "unsafe", "late"]);
    }

    #[test]
    fn summary_adds_target_spans_and_renders_clock_times() {
        let mut night = night();
        add(&mut night, "M31", "L", "2025-01-02T21:00:00", 2.0);
        add(&mut night, "M31", "L", "2025-01-02T23:30:00", 3.0);
        night.events.push(Event::instant(
            EventKind::LifecycleMarker(Lifecycle::Started),
            ts("2025-01-02T20:00:00"),
        ));

        let summary = build_summary(&night);
        assert_eq!(summary.timeline.len(), 2);
        let target = &summary.timeline[1];
        assert_eq!(target.kind, EventKind::TargetSpan("M31".to_string()));
        assert_eq!(target.start_clock, "21:00");
        assert_eq!(target.end_clock, "23:30");
        assert_eq!(target.duration, "2h 30m");
        assert!(!target.is_instant());
        assert!(summary.timeline[0].is_instant());

        // The night itself is left untouched.
        assert_eq!(night.events.len(), 1);
    }

    #[test]
    fn missing_timestamps_render_empty() {
        let mut night = night();
        night.events.push(Event::new(
            EventKind::SequenceSpan(crate::event::SequenceStep::EndSequence),
            None,
            Some(ts("2025-01-03T05:00:00")),
        ));
        let summary = build_summary(&night);
        let entry = &summary.timeline[0];
        assert_eq!(entry.start_clock, "");
        assert_eq!(entry.end_clock, "05:00");
        assert_eq!(entry.duration, "");
        assert_eq!(summary.imaging_seconds, None);
        assert_eq!(summary.safe_minutes, None);
        assert!(!summary.has_activity);
    }

    #[test]
    fn target_statistics_group_by_filter() {
        let mut night = night();
        add(&mut night, "M42", "Ha", "2025-01-02T21:00:00", 2.0);
        add(&mut night, "M42", "OIII", "2025-01-02T21:10:00", 3.0);
        add(&mut night, "M42", "Ha", "2025-01-02T21:20:00", 4.0);

        let summary = build_summary(&night);
        let target = &summary.targets[0];
        assert_eq!(target.exposures, 3);
        assert!((target.total_seconds - 900.0).abs() < f64::EPSILON);
        assert!((target.average_hfr - 3.0).abs() < f64::EPSILON);
        assert!((target.average_drift - 0.5).abs() < f64::EPSILON);
        let filters: Vec<_> = target
            .filters
            .iter()
            .map(|f| (f.filter.as_str(), f.exposures))
            .collect();
        assert_eq!(filters, [("Ha", 2), ("OIII", 1)]);
    }

    #[test]
    fn unsafe_minutes_are_summed_before_merging() {
        let mut night = night();
        night.record_capture(ts("2025-01-02T21:00:00"));
        night.record_capture(ts("2025-01-03T03:00:00"));
        night.events.push(span(EventKind::UnsafeSpan, "2025-01-02T22:00:00", "2025-01-02T22:30:00"));
        night.events.push(span(EventKind::UnsafeSpan, "2025-01-02T23:00:00", "2025-01-02T23:30:00"));

        let summary = build_summary(&night);
        assert!((summary.unsafe_minutes - 60.0).abs() < f64::EPSILON);
        assert_eq!(summary.safe_minutes, Some(300.0));
        assert_eq!(summary.timeline.len(), 1);
        assert_eq!(summary.timeline[0].duration, "1h 30m");
    }
}
