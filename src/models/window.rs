//! Time window model.
//!
//! All times in this crate are minutes from the start of an abstract week
//! (Monday 00:00 = minute 0, Sunday 23:59 = minute 10079). The week is
//! recurring and has no calendar identity; conversion to concrete dates
//! happens at the edges (see [`crate::timeutil`]).

use serde::{Deserialize, Serialize};

/// Minutes in one day.
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Minutes in one week.
pub const MINUTES_PER_WEEK: i64 = 7 * MINUTES_PER_DAY;

/// A time interval [start, end) in minutes-of-week.
///
/// Half-open interval: includes start, excludes end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    /// Interval start (minute-of-week, inclusive).
    pub start: i64,
    /// Interval end (minute-of-week, exclusive).
    pub end: i64,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Duration of this window (minutes).
    #[inline]
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// Whether a minute falls within this window.
    #[inline]
    pub fn contains(&self, minute: i64) -> bool {
        minute >= self.start && minute < self.end
    }

    /// Whether two windows overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Day-of-week (Monday = 0) of the start minute.
    pub fn start_day(&self) -> i64 {
        self.start / MINUTES_PER_DAY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_window() {
        let w = TimeWindow::new(540, 600);
        assert_eq!(w.duration(), 60);
        assert!(w.contains(540));
        assert!(w.contains(599));
        assert!(!w.contains(600)); // exclusive end
        assert!(!w.contains(500));
    }

    #[test]
    fn test_time_window_overlap() {
        let a = TimeWindow::new(0, 100);
        let b = TimeWindow::new(50, 150);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        let c = TimeWindow::new(100, 200); // touching but not overlapping
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_start_day() {
        assert_eq!(TimeWindow::new(540, 600).start_day(), 0); // Monday 9:00
        assert_eq!(TimeWindow::new(1440 + 540, 1440 + 600).start_day(), 1); // Tuesday
    }
}
