//! Report command for summarizing one night.
//!
//! Output formats are plain text (the layout NINA users paste into chats and
//! notifications) and JSON.

use std::io::Write;

use anyhow::{Context, Result};
use nr_core::{Diagnostics, NightSummary, TargetSummary, build_summary, human_duration_f64};
use serde::Serialize;

use super::notify;
use super::util::{aggregate_logs, discover_log_files};
use crate::Config;

/// Where the report goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
    Pushover,
}

/// Options for a report run.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    /// Nights to count back from the most recent one.
    pub night: usize,
    /// Suppress output for a night without activity.
    pub silent: bool,
    pub output: Output,
}

// ========== Text Output ==========

/// Renders the summary of a night, or `None` when silenced.
pub fn render_text(summary: &NightSummary, silent: bool) -> Option<String> {
    if summary.has_activity {
        Some(format_report(summary))
    } else if silent {
        None
    } else {
        Some(format!("No activities for {}", summary.date))
    }
}

/// Formats the human-readable report for a night with activity.
pub fn format_report(summary: &NightSummary) -> String {
    let mut lines = format_header(summary);
    lines.push(String::new());
    lines.extend(format_timeline(summary));
    for target in &summary.targets {
        lines.push(String::new());
        lines.extend(format_target(target));
    }
    lines.join("\n")
}

fn format_header(summary: &NightSummary) -> Vec<String> {
    let mut lines = vec![
        format!("Summary for {}", summary.date),
        format!("Total images: \t{}", summary.exposure_count),
        format!(
            "Exposure time: \t{}",
            human_duration_f64(summary.total_exposure_seconds)
        ),
        format!(
            "Safe duration: \t{}",
            minutes_to_human(summary.safe_minutes.unwrap_or(0.0))
        ),
    ];
    if summary.unsafe_minutes > 0.0 {
        lines.push(format!(
            "Unsafe dur.: \t{}",
            minutes_to_human(summary.unsafe_minutes)
        ));
    }
    if summary.error_count > 0 {
        lines.push(format!("Errors: \t\t{}", summary.error_count));
    }
    lines
}

/// Minutes are derived from whole seconds; rounding undoes the division.
fn minutes_to_human(minutes: f64) -> String {
    human_duration_f64((minutes * 60.0).round())
}

fn format_timeline(summary: &NightSummary) -> Vec<String> {
    summary
        .timeline
        .iter()
        .map(|entry| {
            if entry.is_instant() {
                format!(" {} {}", entry.start_clock, entry.kind)
            } else if entry.duration.is_empty() {
                format!(" {}-{} {}", entry.start_clock, entry.end_clock, entry.kind)
            } else {
                format!(
                    " {}-{} {} ({})",
                    entry.start_clock, entry.end_clock, entry.kind, entry.duration
                )
            }
        })
        .collect()
}

fn format_target(target: &TargetSummary) -> Vec<String> {
    let mut lines = vec![format!("Object Summary for {}:", target.name)];
    for filter in &target.filters {
        lines.push(format!(
            "  Filter {}: {} exposures, {} ",
            filter.filter,
            filter.exposures,
            human_duration_f64(filter.seconds)
        ));
    }
    if target.filters.len() > 1 {
        lines.push(format!(
            "Total {} exposures,  Exposure Time: {}",
            target.exposures,
            human_duration_f64(target.total_seconds)
        ));
    }
    lines.push(format!("Average HFR: {:.2} asec", target.average_hfr));
    lines.push(format!("Average Drift: {:.2} asec/s", target.average_drift));
    lines
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub night: &'a NightSummary,
    pub diagnostics: &'a Diagnostics,
}

/// Formats a night summary and the run diagnostics as JSON.
pub fn format_report_json(summary: &NightSummary, diagnostics: &Diagnostics) -> Result<String> {
    let report = JsonReport {
        night: summary,
        diagnostics,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run<W: Write>(writer: &mut W, options: ReportOptions, config: &Config) -> Result<()> {
    let files = discover_log_files(&config.log_path)?;
    tracing::debug!(files = files.len(), path = %config.log_path.display(), "discovered logs");
    let (registry, diagnostics) = aggregate_logs(&files, config.pattern)?;

    if registry.is_empty() {
        writeln!(writer, "No data found")?;
        return Ok(());
    }

    let night = registry.nth_from_last(options.night).with_context(|| {
        format!(
            "night {} not found: the logs cover {} night(s)",
            options.night,
            registry.len()
        )
    })?;
    tracing::info!(date = %night.date, "summarizing night");
    let summary = build_summary(night);

    match options.output {
        Output::Json => {
            if summary.has_activity || !options.silent {
                writeln!(writer, "{}", format_report_json(&summary, &diagnostics)?)?;
            }
        }
        Output::Text => {
            if let Some(text) = render_text(&summary, options.silent) {
                writeln!(writer, "{text}")?;
            }
        }
        Output::Pushover => {
            if let Some(text) = render_text(&summary, options.silent) {
                let title = format!("NINA Report for {}", summary.date);
                notify::send(config, &title, &text)?;
            }
        }
    }

    Ok(())
}
