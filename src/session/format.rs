use chrono::DateTime;

pub const DATE_NOT_AVAILABLE: &str = "Not available";

/// Formats a position in seconds as `M:SS`, or `H:MM:SS` from one hour on.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Formats a Unix timestamp as `M/D/YYYY`.
pub fn format_date(timestamp: i64) -> Option<String> {
    DateTime::from_timestamp(timestamp, 0).map(|date| date.format("%-m/%-d/%Y").to_string())
}

pub fn published_display(published_at: Option<i64>) -> String {
    published_at
        .and_then(format_date)
        .unwrap_or_else(|| DATE_NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_hours() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(3661.0), "1:01:01");
        assert_eq!(format_time(3605.0), "1:00:05");
        assert_eq!(format_time(599.9), "9:59");
        assert_eq!(format_time(36000.0), "10:00:00");
    }

    #[test]
    fn unknown_times_render_as_zero() {
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
        assert_eq!(format_time(-4.0), "0:00");
    }

    #[test]
    fn formats_publication_dates() {
        assert_eq!(format_date(1_700_000_000).as_deref(), Some("11/14/2023"));
        assert_eq!(published_display(None), DATE_NOT_AVAILABLE);
        assert_eq!(published_display(Some(0)), "1/1/1970");
    }
}
