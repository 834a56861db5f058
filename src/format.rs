//! Console formatting for durations and counts, and parsing of the `--date` argument.

use chrono::{Days, NaiveDate};

/// Renders seconds as `1h 05m` or `45m`; sub-minute remainders are dropped and the sign is ignored.
pub fn format_time(seconds: i64) -> String {
    let seconds = seconds.unsigned_abs();
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

/// Accepts `today`, `yesterday` or a strict `YYYY-MM-DD` date.
pub fn parse_sync_date(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    match input.trim() {
        "today" => Some(today),
        "yesterday" => today.checked_sub_days(Days::new(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").ok(),
    }
}
