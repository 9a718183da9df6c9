//! Compact human-readable durations such as `1h 30m`.

/// Unit suffixes and their length in seconds, largest first.
const UNITS: [(&str, u64); 5] = [
    ("w", 60 * 60 * 24 * 7),
    ("d", 60 * 60 * 24),
    ("h", 60 * 60),
    ("m", 60),
    ("s", 1),
];

/// Formats whole seconds greedily as weeks, days, hours, minutes and seconds.
///
/// Units with a zero amount are omitted. Zero renders as `inf`, which is how
/// the report marks a duration that was never measured.
pub fn human_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "inf".to_string();
    }
    let mut remaining = seconds;
    let mut parts = Vec::new();
    for (unit, size) in UNITS {
        let amount = remaining / size;
        remaining %= size;
        if amount > 0 {
            parts.push(format!("{amount}{unit}"));
        }
    }
    parts.join(" ")
}

/// Like [`human_duration`] for fractional or signed seconds.
///
/// Fractions are truncated and negative values clamp to zero. A positive
/// value under one second has no whole unit to show and renders empty.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn human_duration_f64(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return human_duration(0);
    }
    if seconds < 1.0 {
        return String::new();
    }
    human_duration(seconds.trunc() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_inf() {
        assert_eq!(human_duration(0), "inf");
    }

    #[test]
    fn omits_zero_units() {
        assert_eq!(human_duration(3600), "1h");
        assert_eq!(human_duration(3601), "1h 1s");
        assert_eq!(human_duration(90), "1m 30s");
    }

    #[test]
    fn decomposes_every_unit() {
        let seconds = 604_800 + 2 * 86_400 + 3 * 3600 + 4 * 60 + 5;
        assert_eq!(human_duration(seconds), "1w 2d 3h 4m 5s");
    }

    #[test]
    fn fractional_seconds_truncate() {
        assert_eq!(human_duration_f64(59.9), "59s");
        assert_eq!(human_duration_f64(1800.0), "30m");
        assert_eq!(human_duration_f64(0.4), "");
    }

    #[test]
    fn negative_and_nan_clamp_to_inf() {
        assert_eq!(human_duration_f64(-5.0), "inf");
        assert_eq!(human_duration_f64(f64::NAN), "inf");
    }
}
