use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Storage format for every timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp the way it is stored in SQLite.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored or user-supplied timestamp.
/// Accepts `YYYY-MM-DD HH:MM:SS`, the ISO `T` separator, fractional seconds,
/// and a bare `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// The day before `today`.
pub fn yesterday_of(today: NaiveDate) -> NaiveDate {
    today - Duration::days(1)
}

/// The server-local calendar date right now.
pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// First and last representable instant of a calendar day, both inclusive.
pub fn day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(NaiveTime::MIN);
    let end = start + Duration::days(1) - Duration::nanoseconds(1);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("2025-03-01 21:15:00"),
            Some(ts("2025-03-01 21:15:00"))
        );
        assert_eq!(
            parse_timestamp("2025-03-01T21:15:00"),
            Some(ts("2025-03-01 21:15:00"))
        );
        assert_eq!(
            parse_timestamp("2025-03-01 21:15"),
            Some(ts("2025-03-01 21:15:00"))
        );
        assert_eq!(
            parse_timestamp("2025-03-01"),
            Some(ts("2025-03-01 00:00:00"))
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_format_round_trips_through_parse() {
        let t = ts("2024-12-31 23:59:59");
        assert_eq!(format_timestamp(t), "2024-12-31 23:59:59");
        assert_eq!(parse_timestamp(&format_timestamp(t)), Some(t));
    }

    #[test]
    fn test_yesterday_crosses_month_and_year() {
        assert_eq!(
            yesterday_of(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
        assert_eq!(
            yesterday_of(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_day_bounds() {
        let (start, end) = day_bounds(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(format_timestamp(start), "2025-01-15 00:00:00");
        assert_eq!(format_timestamp(end), "2025-01-15 23:59:59");
        assert_eq!(end.date(), start.date());
    }
}
