//! Priority propagation and task ordering.
//!
//! Two cooperating pieces feed the allocator:
//!
//! - [`propagate_priorities`] walks every task's dependency set and raises
//!   each dependency's priority to at least its dependent's, transitively —
//!   a prerequisite of important work is itself important.
//! - [`ProcessingQueue`] yields tasks highest-priority-first, breaking ties
//!   by ascending dependency count, and lets the allocator defer a task
//!   whose dependencies haven't been placed yet to the back of the line.
//!
//! The tie-break is a heuristic only; actual dependency readiness is
//! enforced by the allocator's completed-set, not by this ordering.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::error::ScheduleError;
use crate::models::Task;

/// Raises every dependency's priority to at least its dependent's,
/// transitively through the dependency graph.
///
/// Runs an explicit worklist with a visited-set per origin task, so it
/// terminates on any graph; a cycle is reported as
/// [`ScheduleError::DependencyCycle`] rather than looped on. Mutates
/// priorities in place. Idempotent.
///
/// Dependency IDs that don't resolve to a task are ignored here;
/// [`crate::validation::validate_tasks`] reports them.
pub fn propagate_priorities(tasks: &mut [Task]) -> Result<(), ScheduleError> {
    // Resolve dependency IDs to indices once, up front.
    let deps: Vec<Vec<usize>> = {
        let index: HashMap<&str, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();
        tasks
            .iter()
            .map(|t| {
                t.dependencies
                    .iter()
                    .filter_map(|d| index.get(d.as_str()).copied())
                    .collect()
            })
            .collect()
    };

    for origin in 0..tasks.len() {
        let floor = tasks[origin].priority;
        let mut visited: HashSet<usize> = HashSet::new();
        let mut work: Vec<usize> = deps[origin].clone();

        while let Some(i) = work.pop() {
            if i == origin {
                return Err(ScheduleError::DependencyCycle {
                    task_id: tasks[origin].id.clone(),
                });
            }
            if !visited.insert(i) {
                continue;
            }
            if tasks[i].priority < floor {
                debug!(
                    task = %tasks[i].id,
                    from = tasks[i].priority,
                    to = floor,
                    "priority boosted by dependent"
                );
                tasks[i].priority = floor;
            }
            work.extend(deps[i].iter().copied());
        }
    }

    Ok(())
}

/// Pop-highest-first processing queue over task handles.
///
/// Built once per run from the post-propagation priorities. `pop` yields
/// the best remaining task; `defer` sends a not-yet-ready task to the
/// opposite end for a later retry.
#[derive(Debug)]
pub struct ProcessingQueue {
    queue: VecDeque<usize>,
}

impl ProcessingQueue {
    /// Builds a queue over the given task handles, ordered by descending
    /// priority, then ascending dependency count. Ties keep input order.
    pub fn build(tasks: &[Task], handles: impl IntoIterator<Item = usize>) -> Self {
        let mut order: Vec<usize> = handles.into_iter().collect();
        order.sort_by(|&a, &b| {
            tasks[b]
                .priority
                .cmp(&tasks[a].priority)
                .then(tasks[a].dependencies.len().cmp(&tasks[b].dependencies.len()))
        });
        Self {
            queue: order.into(),
        }
    }

    /// Takes the highest-priority remaining task.
    pub fn pop(&mut self) -> Option<usize> {
        self.queue.pop_front()
    }

    /// Sends a task to the back of the line for a later retry.
    pub fn defer(&mut self, handle: usize) {
        self.queue.push_back(handle);
    }

    /// Remaining tasks.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is exhausted.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drains the remaining handles in queue order.
    pub fn drain(&mut self) -> Vec<usize> {
        self.queue.drain(..).collect()
    }
}
