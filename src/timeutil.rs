//! Calendar-edge helpers.
//!
//! The core speaks only minute-of-week integers; these helpers convert to
//! and from concrete datetimes at the boundary, and parse human duration
//! strings ("2 hours 30 minutes") into minutes. Nothing here is
//! timezone-aware — the abstract week is anchored by whatever naive
//! `week_start` the caller supplies.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;

use crate::models::{MINUTES_PER_DAY, MINUTES_PER_WEEK};

const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Minute-of-week of a datetime (Monday 00:00 of its week = 0).
pub fn minute_of_week(dt: &NaiveDateTime) -> i64 {
    let day = dt.weekday().num_days_from_monday() as i64;
    day * MINUTES_PER_DAY + dt.hour() as i64 * 60 + dt.minute() as i64
}

/// Midnight of the Monday beginning the week containing `dt`.
pub fn week_start_of(dt: &NaiveDateTime) -> NaiveDateTime {
    let days_back = dt.weekday().num_days_from_monday() as i64;
    (dt.date() - Duration::days(days_back)).and_time(NaiveTime::MIN)
}

/// Concrete datetime for a minute-of-week, anchored at a week start.
pub fn datetime_at(week_start: NaiveDateTime, minute: i64) -> NaiveDateTime {
    week_start + Duration::minutes(minute)
}

/// Renders a minute-of-week as `Mon 09:30` for logs and descriptions.
pub fn format_minute(minute: i64) -> String {
    let m = minute.rem_euclid(MINUTES_PER_WEEK);
    let day = DAY_NAMES[(m / MINUTES_PER_DAY) as usize];
    let of_day = m % MINUTES_PER_DAY;
    format!("{day} {:02}:{:02}", of_day / 60, of_day % 60)
}

/// Parses a human duration like `"1 hour"`, `"90 minutes"`,
/// `"2 hours 30 minutes"`, or `"1h 15m"` into minutes.
///
/// Returns `None` when no duration can be read from the string.
pub fn parse_duration(text: &str) -> Option<i64> {
    let re = Regex::new(r"^\s*(?:(\d+)\s*h(?:ours?)?)?\s*(?:(\d+)\s*m(?:in(?:ute)?s?)?)?\s*$")
        .ok()?;
    let lower = text.to_lowercase();
    let caps = re.captures(&lower)?;

    let hours = caps.get(1).and_then(|m| m.as_str().parse::<i64>().ok());
    let minutes = caps.get(2).and_then(|m| m.as_str().parse::<i64>().ok());
    if hours.is_none() && minutes.is_none() {
        return None;
    }
    Some(hours.unwrap_or(0) * 60 + minutes.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, 0)
            .unwrap()
    }

    #[test]
    fn test_minute_of_week() {
        // 2024-11-11 is a Monday.
        assert_eq!(minute_of_week(&dt(2024, 11, 11, 0, 0)), 0);
        assert_eq!(minute_of_week(&dt(2024, 11, 11, 9, 0)), 540);
        // Tuesday 9:00
        assert_eq!(minute_of_week(&dt(2024, 11, 12, 9, 0)), 1440 + 540);
        // Sunday 23:59
        assert_eq!(minute_of_week(&dt(2024, 11, 17, 23, 59)), 10079);
    }

    #[test]
    fn test_week_start_of() {
        let monday = dt(2024, 11, 11, 0, 0);
        assert_eq!(week_start_of(&dt(2024, 11, 11, 9, 30)), monday);
        assert_eq!(week_start_of(&dt(2024, 11, 14, 23, 0)), monday);
        assert_eq!(week_start_of(&dt(2024, 11, 17, 1, 0)), monday);
    }

    #[test]
    fn test_round_trip() {
        let week_start = dt(2024, 11, 11, 0, 0);
        let original = dt(2024, 11, 13, 14, 45);
        let minute = minute_of_week(&original);
        assert_eq!(datetime_at(week_start, minute), original);
    }

    #[test]
    fn test_format_minute() {
        assert_eq!(format_minute(540), "Mon 09:00");
        assert_eq!(format_minute(1440 + 810), "Tue 13:30");
        assert_eq!(format_minute(0), "Mon 00:00");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1 hour"), Some(60));
        assert_eq!(parse_duration("2 hours 30 minutes"), Some(150));
        assert_eq!(parse_duration("90 minutes"), Some(90));
        assert_eq!(parse_duration("45 min"), Some(45));
        assert_eq!(parse_duration("1h 15m"), Some(75));
        assert_eq!(parse_duration("2 Hours"), Some(120));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("ninety minutes"), None);
    }
}
