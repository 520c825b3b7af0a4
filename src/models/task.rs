//! Task model.
//!
//! A task is the unit of allocation: a named piece of work with a priority,
//! dependencies on other tasks, a duration (or an effort estimate when no
//! exact duration is known), and optional time constraints — a deadline or
//! a caller-mandated fixed window.
//!
//! # Time Representation
//! All times are minutes from the start of the abstract week (Monday 00:00
//! = minute 0). The consumer converts real timestamps at the edges.

use serde::{Deserialize, Serialize};

use super::TimeWindow;

/// A task to be allocated onto the weekly grid.
///
/// `priority` is mutable: dependency propagation may raise it so that a
/// dependency never ranks below its dependents. `assigned` and
/// `rescheduled` are written by the allocator; everything else is input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Allocation priority (higher = more important). May be boosted.
    pub priority: i32,
    /// IDs of tasks that must be placed and finished before this one starts.
    pub dependencies: Vec<String>,
    /// Exact duration (minutes). `None` = fall back to `estimate`.
    pub duration: Option<i64>,
    /// Estimated time to complete (minutes), used when `duration` is absent.
    pub estimate: Option<i64>,
    /// Latest allowed completion (minute-of-week). `None` = no deadline.
    pub deadline: Option<i64>,
    /// Caller-mandated window. Presence marks the task as fixed.
    pub fixed: Option<TimeWindow>,
    /// Window assigned by the allocator. `None` = not (yet) placed.
    pub assigned: Option<TimeWindow>,
    /// True once the allocator has moved the task away from its fixed or
    /// first-attempted placement.
    pub rescheduled: bool,
}

impl Task {
    /// Creates a new task with the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            priority: 0,
            dependencies: Vec::new(),
            duration: None,
            estimate: None,
            deadline: None,
            fixed: None,
            assigned: None,
            rescheduled: false,
        }
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Adds a dependency. Duplicates are ignored.
    pub fn with_dependency(mut self, dep_id: impl Into<String>) -> Self {
        let dep_id = dep_id.into();
        if !self.dependencies.contains(&dep_id) {
            self.dependencies.push(dep_id);
        }
        self
    }

    /// Sets the exact duration (minutes).
    pub fn with_duration(mut self, minutes: i64) -> Self {
        self.duration = Some(minutes);
        self
    }

    /// Sets the effort estimate (minutes).
    pub fn with_estimate(mut self, minutes: i64) -> Self {
        self.estimate = Some(minutes);
        self
    }

    /// Sets the deadline (latest completion, minute-of-week).
    pub fn with_deadline(mut self, minute: i64) -> Self {
        self.deadline = Some(minute);
        self
    }

    /// Fixes the task at an explicit window.
    pub fn with_fixed(mut self, start: i64, end: i64) -> Self {
        self.fixed = Some(TimeWindow::new(start, end));
        self
    }

    /// Whether the task carries a caller-mandated window.
    pub fn is_fixed(&self) -> bool {
        self.fixed.is_some()
    }

    /// Whether the task has been placed.
    pub fn is_placed(&self) -> bool {
        self.assigned.is_some()
    }

    /// Whether the task has a deadline.
    pub fn has_deadline(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time the task occupies when placed: exact duration if known, the
    /// estimate otherwise, or the fixed window's length as a last resort.
    ///
    /// `None` means the task is unschedulable (it carries no time at all).
    pub fn effective_duration(&self) -> Option<i64> {
        self.duration
            .or(self.estimate)
            .or_else(|| self.fixed.map(|w| w.duration()))
    }
}
