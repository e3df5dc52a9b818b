// SPDX-License-Identifier: MIT

//! Shared helpers for human-readable metric and time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Placeholder shown when a pace value is unavailable.
pub const PACE_PLACEHOLDER: &str = "--:--";

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a pace in seconds-per-kilometer as "M:SS".
///
/// `None` (no distance yet, or out of the sane range) renders the
/// placeholder.
pub fn format_pace(secs_per_km: Option<f64>) -> String {
    match secs_per_km {
        Some(pace) if pace.is_finite() && pace >= 0.0 => {
            let total = pace.round() as u64;
            format!("{}:{:02}", total / 60, total % 60)
        }
        _ => PACE_PLACEHOLDER.to_string(),
    }
}

/// Format a distance in meters as kilometers with two decimals.
pub fn format_distance(meters: f64) -> String {
    format!("{:.2} km", meters / 1000.0)
}

/// Format a duration in seconds as "H:MM:SS", or "M:SS" under an hour.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_pace_minutes_seconds() {
        assert_eq!(format_pace(Some(330.0)), "5:30");
        assert_eq!(format_pace(Some(59.4)), "0:59");
        assert_eq!(format_pace(Some(3599.0)), "59:59");
    }

    #[test]
    fn test_format_pace_placeholder() {
        assert_eq!(format_pace(None), PACE_PLACEHOLDER);
        assert_eq!(format_pace(Some(f64::NAN)), PACE_PLACEHOLDER);
        assert_eq!(format_pace(Some(-1.0)), PACE_PLACEHOLDER);
    }

    #[test]
    fn test_format_distance_two_decimals() {
        assert_eq!(format_distance(0.0), "0.00 km");
        assert_eq!(format_distance(1234.0), "1.23 km");
        assert_eq!(format_distance(150.0), "0.15 km");
    }

    #[test]
    fn test_format_duration_rollovers() {
        assert_eq!(format_duration(20.0), "0:20");
        assert_eq!(format_duration(75.0), "1:15");
        assert_eq!(format_duration(3600.0), "1:00:00");
        assert_eq!(format_duration(3725.0), "1:02:05");
        assert_eq!(format_duration(-5.0), "0:00");
    }

    #[test]
    fn test_format_utc_rfc3339_z_suffix() {
        let date = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2026-01-15T10:00:00Z");
    }
}
