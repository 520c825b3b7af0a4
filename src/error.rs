//! Crate error taxonomy.
//!
//! Only structural problems are `Err`: a cyclic dependency graph, a grid
//! configuration that yields no usable slots, or a malformed task
//! collection. Per-task placement failures are data — see
//! [`UnplacedReason`](crate::models::UnplacedReason) — and never abort a
//! run.

use crate::validation::ValidationError;

/// Structural failure of an allocation run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScheduleError {
    /// The dependency graph contains a cycle; priorities cannot propagate.
    #[error("dependency cycle involving task '{task_id}'")]
    DependencyCycle {
        /// A task on the cycle.
        task_id: String,
    },

    /// The grid configuration produces an empty or inconsistent grid.
    #[error("invalid grid configuration: {reason}")]
    InvalidGrid {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The task collection failed structural validation.
    #[error("invalid task collection ({} problem(s))", .0.len())]
    InvalidTasks(Vec<ValidationError>),
}
