//! Shared utilities for CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::{Pattern, glob};
use nr_core::{Diagnostics, NamingScheme, NightAggregator, NightRegistry};

/// NINA names its session logs `<yyyymmdd>-<hhmmss>-<version>.<pid>.log`.
const LOG_FILE_PREFIX: &str = "20";

/// Finds the session logs in `dir`, sorted by file name.
///
/// Sorting by name orders the logs chronologically, which the aggregator
/// relies on to carry state from one file into the next.
pub fn discover_log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        tracing::warn!(path = %dir.display(), "log directory does not exist");
        return Ok(Vec::new());
    }

    let dir_str = dir
        .to_str()
        .with_context(|| format!("log directory is not valid UTF-8: {}", dir.display()))?;
    let pattern = Path::new(&Pattern::escape(dir_str)).join("*.log");
    let pattern_str = pattern.to_string_lossy();

    let mut files = Vec::new();
    for entry in glob(&pattern_str).context("invalid glob pattern")? {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(error = %e, "error accessing log file");
                continue;
            }
        };
        let is_session_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
        if is_session_log {
            files.push(path);
        } else {
            tracing::debug!(path = %path.display(), "skipping non-session log");
        }
    }
    files.sort();
    Ok(files)
}

/// Parses `files` in order into nights.
pub fn aggregate_logs(
    files: &[PathBuf],
    scheme: NamingScheme,
) -> Result<(NightRegistry, Diagnostics)> {
    let mut aggregator = NightAggregator::new(scheme);
    for file in files {
        aggregator
            .ingest_file(file)
            .context("failed to parse log files")?;
    }
    let (registry, diagnostics) = aggregator.finish();
    tracing::debug!(
        nights = registry.len(),
        records = diagnostics.records,
        skipped = diagnostics.skipped_lines,
        malformed_timestamps = diagnostics.malformed_timestamps,
        field_failures = diagnostics.total_field_failures(),
        "parsed logs"
    );
    Ok((registry, diagnostics))
}
