//! Observation timestamps.
//!
//! Timestamps are stored as fixed-width local-time strings, which makes
//! lexicographic order of the database keys equal to chronological order.

use chrono::{Local, NaiveDateTime};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Format used in plain export file names, which must not contain `:`.
pub const FILE_NAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H_%M_%S";

const SECONDS_PER_DAY: i64 = 86_400;

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses an observation key.
///
/// Returns `None` for anything that is not a well-formed timestamp. Callers
/// treat `None` as "never verified" rather than as an error.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok()
}

/// Whole days elapsed from `then` to `now`, rounded toward negative infinity.
pub fn elapsed_days(then: NaiveDateTime, now: NaiveDateTime) -> i64 {
    (now - then).num_seconds().div_euclid(SECONDS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_format_is_fixed_width() {
        assert_eq!(
            format_timestamp(at(2021, 3, 1, 9, 5, 7)),
            "2021-03-01_09:05:07"
        );
    }

    #[test]
    fn test_parse_round_trips_format() {
        let t = at(2024, 12, 31, 23, 59, 59);
        assert_eq!(parse_timestamp(&format_timestamp(t)), Some(t));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2021-13-01_00:00:00"), None);
        assert_eq!(parse_timestamp("2021-03-01 00:00:00"), None);
    }

    #[test]
    fn test_lexicographic_order_is_chronological() {
        let mut keys = vec![
            format_timestamp(at(2021, 10, 1, 0, 0, 0)),
            format_timestamp(at(2021, 9, 30, 23, 59, 59)),
            format_timestamp(at(2020, 12, 31, 12, 0, 0)),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "2020-12-31_12:00:00",
                "2021-09-30_23:59:59",
                "2021-10-01_00:00:00",
            ]
        );
    }

    #[test]
    fn test_elapsed_days_floors() {
        let then = at(2021, 3, 1, 12, 0, 0);

        assert_eq!(elapsed_days(then, then), 0);
        assert_eq!(elapsed_days(then, then + Duration::hours(23)), 0);
        assert_eq!(elapsed_days(then, then + Duration::hours(24)), 1);
        assert_eq!(elapsed_days(then, then + Duration::days(30) + Duration::hours(1)), 30);
        assert_eq!(elapsed_days(then, then - Duration::hours(1)), -1);
    }
}
