use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Parse a calendar day given on the command line.
///
/// Accepts `YYYY-MM-DD`, `DD.MM.YYYY` and the short `DD.MM.YY`.
pub fn parse_day(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    let format = match input.rsplit_once('.') {
        Some((_, year)) if year.len() == 2 => "%d.%m.%y",
        Some(_) => "%d.%m.%Y",
        None => "%Y-%m-%d",
    };
    NaiveDate::parse_from_str(input, format).ok()
}

/// Parse an RFC 3339 timestamp as returned by the OCI APIs
pub fn parse_timestamp(ts: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .context("Failed to parse timestamp")
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a timestamp the way OCI query parameters expect it
pub fn to_query_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format a timestamp for display
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Calculate duration between two timestamps in human-readable format
pub fn duration_human(start: &DateTime<Utc>, end: &DateTime<Utc>) -> String {
    let duration = end.signed_duration_since(*start);
    let seconds = duration.num_seconds();

    if seconds < 60 {
        format!("{} seconds", seconds)
    } else if seconds < 3600 {
        format!("{} minutes", seconds / 60)
    } else if seconds < 86400 {
        format!("{:.1} hours", seconds as f64 / 3600.0)
    } else {
        format!("{:.1} days", seconds as f64 / 86400.0)
    }
}
