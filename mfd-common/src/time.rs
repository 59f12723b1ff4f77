//! Timestamp utilities
//!
//! Sensor exports mix ISO 8601 timestamps, bare dates and day-first
//! dates. Everything is normalised to UTC; naive values are taken as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse one timestamp in any supported format
///
/// Returns `None` for empty or unrecognised input.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim().trim_matches('"').trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date.and_time(NaiveTime::MIN).and_utc());
        }
    }

    None
}

/// Parse a cell that may hold several comma-separated timestamps
///
/// Each element is parsed independently; unparseable elements are dropped.
pub fn parse_timestamp_list(cell: &str) -> Vec<DateTime<Utc>> {
    cell.split(',').filter_map(parse_timestamp).collect()
}

/// Calendar day key used by heatmap cells (`YYYY-MM-DD`)
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Display format used by date-range summaries (`DD/MM/YYYY`)
pub fn display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_now_returns_valid_timestamp() {
        // Should be a reasonable timestamp (after year 2000)
        assert!(now().timestamp() > 946_684_800);
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let dt = parse_timestamp("2024-03-01T12:00:00+02:00").unwrap();
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.day(), 1);
    }

    #[test]
    fn test_parse_naive_datetime_as_utc() {
        let dt = parse_timestamp("2024-03-01 23:30:00").unwrap();
        assert_eq!(dt.hour(), 23);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn test_parse_day_first_date() {
        let dt = parse_timestamp("05/04/2025").unwrap();
        assert_eq!(dt.month(), 4);
        assert_eq!(dt.day(), 5);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("2024-13-40").is_none());
    }

    #[test]
    fn test_parse_timestamp_list() {
        let dates = parse_timestamp_list("2024-01-01T00:00:00Z, 2024-01-03, junk");
        assert_eq!(dates.len(), 2);
        assert_eq!(dates[1].day(), 3);
    }

    #[test]
    fn test_day_key_and_display() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(day_key(date), "2025-03-07");
        assert_eq!(display_date(date), "07/03/2025");
    }
}
