//! Allocation outcome model.
//!
//! A [`WeekSchedule`] is the complete result of one allocation run: every
//! input task annotated with its assigned window (or left unassigned), plus
//! a report entry for each task that could not be placed. The caller always
//! sees the full placed-vs-unplaced picture; nothing is dropped silently.

use serde::{Deserialize, Serialize};

use super::Task;

/// Result of one allocation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeekSchedule {
    /// All input tasks, annotated in place by the allocator.
    pub tasks: Vec<Task>,
    /// One entry per task the allocator could not place.
    pub unplaced: Vec<Unplaced>,
}

/// Why a task was left off the grid. Per-task data, never a run error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnplacedReason {
    /// Neither a duration nor an estimate: there is nothing to place.
    NoDuration,
    /// The task's fixed window or deadline falls outside working hours.
    OutsideWorkingHours,
    /// No free window exists within the task's constraints, even after
    /// conflict eviction and backtracking.
    NoFreeWindow,
    /// The task was evicted to make room and could neither be re-placed
    /// nor restored. Its old slots stay free.
    EvictionDeadlock,
}

/// Report entry for a task that could not be placed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unplaced {
    /// ID of the affected task.
    pub task_id: String,
    /// Why placement failed.
    pub reason: UnplacedReason,
    /// Human-readable description.
    pub message: String,
}

impl Unplaced {
    /// Creates a report entry.
    pub fn new(
        task_id: impl Into<String>,
        reason: UnplacedReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            reason,
            message: message.into(),
        }
    }
}

impl WeekSchedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a task by ID.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Iterates over placed tasks.
    pub fn placed(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.is_placed())
    }

    /// Number of placed tasks.
    pub fn placed_count(&self) -> usize {
        self.placed().count()
    }

    /// Whether every task ended up on the grid.
    pub fn is_fully_placed(&self) -> bool {
        self.unplaced.is_empty() && self.tasks.iter().all(|t| t.is_placed())
    }

    /// Latest assigned end minute across placed tasks.
    pub fn makespan_minute(&self) -> i64 {
        self.placed()
            .filter_map(|t| t.assigned.map(|w| w.end))
            .max()
            .unwrap_or(0)
    }

    /// Placed tasks ordered by assigned start minute.
    pub fn in_week_order(&self) -> Vec<&Task> {
        let mut placed: Vec<&Task> = self.placed().collect();
        placed.sort_by_key(|t| t.assigned.map(|w| w.start));
        placed
    }

    /// Report entry for a task, if it was left unplaced.
    pub fn unplaced_for(&self, task_id: &str) -> Option<&Unplaced> {
        self.unplaced.iter().find(|u| u.task_id == task_id)
    }
}
