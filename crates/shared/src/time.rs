//! Time-of-day helpers for the incident timeline.

use chrono::{DateTime, FixedOffset, Utc};

/// Number of hourly markers on the timeline axis.
pub const HOURS_PER_DAY: u32 = 24;

/// Seconds in one minute, used to build fixed offsets.
const SECS_PER_MINUTE: i32 = 60;

/// Largest accepted UTC offset in minutes (exclusive of a full day).
pub const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60 - 1;

/// Returns the 24 hourly labels "00:00" through "23:00".
pub fn hourly_markers() -> Vec<String> {
    (0..HOURS_PER_DAY).map(|h| format!("{:02}:00", h)).collect()
}

/// Builds a fixed offset from a minute count.
///
/// Returns `None` when the offset is outside ±23:59.
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    if minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return None;
    }
    FixedOffset::east_opt(minutes * SECS_PER_MINUTE)
}

/// Formats a timestamp as a 24-hour `HH:MM` string in the given offset.
pub fn format_time_of_day(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_hourly_markers_cover_day() {
        let markers = hourly_markers();
        assert_eq!(markers.len(), 24);
        assert_eq!(markers[0], "00:00");
        assert_eq!(markers[9], "09:00");
        assert_eq!(markers[23], "23:00");
    }

    #[test]
    fn test_format_time_of_day_utc() {
        let at = Utc.with_ymd_and_hms(2025, 7, 7, 14, 35, 59).unwrap();
        let utc = offset_from_minutes(0).unwrap();
        assert_eq!(format_time_of_day(at, utc), "14:35");
    }

    #[test]
    fn test_format_time_of_day_is_24_hour() {
        let at = Utc.with_ymd_and_hms(2025, 7, 7, 23, 5, 0).unwrap();
        let utc = offset_from_minutes(0).unwrap();
        assert_eq!(format_time_of_day(at, utc), "23:05");
    }

    #[test]
    fn test_format_time_of_day_with_offset_wraps_midnight() {
        let at = Utc.with_ymd_and_hms(2025, 7, 7, 23, 30, 0).unwrap();
        let plus_two = offset_from_minutes(120).unwrap();
        assert_eq!(format_time_of_day(at, plus_two), "01:30");

        let minus_half = offset_from_minutes(-30).unwrap();
        let early = Utc.with_ymd_and_hms(2025, 7, 7, 0, 10, 0).unwrap();
        assert_eq!(format_time_of_day(early, minus_half), "23:40");
    }

    #[test]
    fn test_offset_from_minutes_bounds() {
        assert!(offset_from_minutes(MAX_UTC_OFFSET_MINUTES).is_some());
        assert!(offset_from_minutes(-MAX_UTC_OFFSET_MINUTES).is_some());
        assert!(offset_from_minutes(24 * 60).is_none());
        assert!(offset_from_minutes(-24 * 60).is_none());
    }
}
