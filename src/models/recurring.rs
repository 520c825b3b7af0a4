//! Recurring task templates.
//!
//! A recurring task is a template that expands into concrete fixed-window
//! [`Task`]s within the abstract week. The allocator never sees recurrence;
//! it only sees the expanded tasks.

use serde::{Deserialize, Serialize};

use super::Task;
use crate::models::window::MINUTES_PER_DAY;

const DAY_TAGS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// How often a template repeats within the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recurrence {
    /// One occurrence per day, all 7 days. `start` is a minute-of-day.
    Daily,
    /// One occurrence per week. `start` is a minute-of-week.
    Weekly,
}

/// A template for a task that repeats on a fixed pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringTask {
    /// Base identifier; occurrences derive their IDs from it.
    pub id: String,
    /// Priority applied to every occurrence.
    pub priority: i32,
    /// Repeat pattern.
    pub recurrence: Recurrence,
    /// First-occurrence start: minute-of-day for [`Recurrence::Daily`],
    /// minute-of-week for [`Recurrence::Weekly`].
    pub start: i64,
    /// Occurrence length (minutes).
    pub duration: i64,
}

impl RecurringTask {
    /// Creates a daily template starting at a minute-of-day.
    pub fn daily(id: impl Into<String>, start_of_day: i64, duration: i64) -> Self {
        Self {
            id: id.into(),
            priority: 0,
            recurrence: Recurrence::Daily,
            start: start_of_day,
            duration,
        }
    }

    /// Creates a weekly template starting at a minute-of-week.
    pub fn weekly(id: impl Into<String>, start: i64, duration: i64) -> Self {
        Self {
            id: id.into(),
            priority: 0,
            recurrence: Recurrence::Weekly,
            start,
            duration,
        }
    }

    /// Sets the priority for all occurrences.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Expands the template into concrete fixed tasks for one week.
    ///
    /// Daily templates produce one task per day, tagged `id@mon`..`id@sun`;
    /// weekly templates produce a single task carrying the base ID.
    pub fn expand(&self) -> Vec<Task> {
        match self.recurrence {
            Recurrence::Daily => DAY_TAGS
                .iter()
                .enumerate()
                .map(|(day, tag)| {
                    let start = day as i64 * MINUTES_PER_DAY + self.start;
                    Task::new(format!("{}@{}", self.id, tag))
                        .with_priority(self.priority)
                        .with_fixed(start, start + self.duration)
                })
                .collect(),
            Recurrence::Weekly => vec![Task::new(self.id.clone())
                .with_priority(self.priority)
                .with_fixed(self.start, self.start + self.duration)],
        }
    }
}
