//! Run-scoped allocation state.
//!
//! A [`RunContext`] owns everything one allocation run mutates: the slot
//! grid, the task arena, the completed-set gating dependency readiness,
//! the placement order, and the per-task failure reports. Tasks are
//! addressed by handle (index into the arena) so that undo operations and
//! memo keys are plain value tuples.
//!
//! Exactly one run owns a context; nothing here is shared.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, trace};

use crate::grid::WeeklyGrid;
use crate::models::{Task, TimeWindow, Unplaced, UnplacedReason, WeekSchedule};

/// Verdict for one candidate placement window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WindowCheck {
    /// Every needed slot is free.
    Free,
    /// Occupied only by other tasks (distinct handles, in encounter
    /// order); eviction could clear the window.
    Conflicts(Vec<usize>),
    /// Contains rest slots, leaves the working block, or leaves the grid.
    /// Never placeable — rest cannot be evicted.
    Blocked,
}

/// Probe result for a candidate window.
pub(crate) struct WindowProbe {
    pub verdict: WindowCheck,
    /// Trailing rest slots the placement would claim, truncated where the
    /// task abuts the end of its working block.
    pub break_len: usize,
}

/// Mutable state of a single allocation run.
pub(crate) struct RunContext {
    pub grid: WeeklyGrid,
    pub tasks: Vec<Task>,
    /// Handles of placed tasks, gating dependency readiness.
    pub completed: HashSet<usize>,
    /// Placement order (the run's result list).
    pub placed: Vec<usize>,
    failures: HashMap<usize, Unplaced>,
    index: HashMap<String, usize>,
    /// handle → handles of tasks that depend on it.
    dependents: Vec<Vec<usize>>,
}

impl RunContext {
    pub fn new(grid: WeeklyGrid, tasks: Vec<Task>) -> Self {
        let index: HashMap<String, usize> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        let mut dependents = vec![Vec::new(); tasks.len()];
        for (i, task) in tasks.iter().enumerate() {
            for dep in &task.dependencies {
                if let Some(&d) = index.get(dep) {
                    dependents[d].push(i);
                }
            }
        }

        Self {
            grid,
            tasks,
            completed: HashSet::new(),
            placed: Vec::new(),
            failures: HashMap::new(),
            index,
            dependents,
        }
    }

    pub fn task(&self, handle: usize) -> &Task {
        &self.tasks[handle]
    }

    /// Minutes the task occupies when placed. `None` = unschedulable.
    pub fn duration_of(&self, handle: usize) -> Option<i64> {
        self.tasks[handle]
            .effective_duration()
            .filter(|&d| d > 0)
    }

    /// Whether every dependency of a task is in the completed-set.
    pub fn deps_ready(&self, handle: usize) -> bool {
        self.tasks[handle].dependencies.iter().all(|dep| {
            self.index
                .get(dep)
                .map_or(true, |d| self.completed.contains(d))
        })
    }

    /// Earliest candidate start index: the slot after the latest end among
    /// the task's placed dependencies, or 0 when unconstrained.
    pub fn dependency_floor(&self, handle: usize) -> usize {
        self.tasks[handle]
            .dependencies
            .iter()
            .filter_map(|dep| self.index.get(dep))
            .filter_map(|&d| self.tasks[d].assigned)
            .filter_map(|w| self.grid.index_of_minute(w.end - 1))
            .map(|i| i + 1)
            .max()
            .unwrap_or(0)
    }

    /// Latest candidate start index, from the deadline (minus duration and
    /// break) and from placed dependents (the task must end before any of
    /// them starts). `None` = no feasible start exists.
    pub fn latest_start_index(&self, handle: usize, duration: i64) -> Option<usize> {
        let break_duration = self.grid.config().break_duration;
        let slots = self.grid.len();
        if (duration as usize) > slots {
            return None;
        }

        let mut ceiling_minute: Option<i64> = None;
        if let Some(deadline) = self.tasks[handle].deadline {
            ceiling_minute = Some(deadline - duration - break_duration);
        }
        if let Some(dep_start) = self.dependent_ceiling_minute(handle) {
            let c = dep_start - duration;
            ceiling_minute = Some(ceiling_minute.map_or(c, |m| m.min(c)));
        }

        match ceiling_minute {
            Some(minute) => {
                let idx = self.grid.latest_index_at_or_before(minute)?;
                Some(idx.min(slots - duration as usize))
            }
            None => {
                let latest = slots as i64 - duration - break_duration;
                usize::try_from(latest).ok()
            }
        }
    }

    /// Earliest start minute among placed dependents, if any.
    fn dependent_ceiling_minute(&self, handle: usize) -> Option<i64> {
        self.dependents[handle]
            .iter()
            .filter_map(|&d| self.tasks[d].assigned)
            .map(|w| w.start)
            .min()
    }

    /// Checks the extended window (task span + trailing rest) starting at
    /// a slot index.
    ///
    /// The task span must be free of rest (periodic tags and post-task
    /// rest alike) and stay inside one working block; occupation by other
    /// tasks becomes the conflict set. The trailing rest span may coincide
    /// with periodic break tags but not with another task's rest, and is
    /// truncated at the block boundary.
    pub fn probe_window(&self, start: usize, duration: i64) -> WindowProbe {
        let len = duration as usize;
        let blocked = WindowProbe {
            verdict: WindowCheck::Blocked,
            break_len: 0,
        };

        if len == 0 || start + len > self.grid.len() || !self.grid.is_contiguous(start, len) {
            return blocked;
        }

        let mut conflicts: Vec<usize> = Vec::new();
        for i in start..start + len {
            let slot = self.grid.slot(i);
            if slot.is_break {
                return blocked;
            }
            if slot.occupied {
                match slot.occupant {
                    Some(h) => {
                        if !conflicts.contains(&h) {
                            conflicts.push(h);
                        }
                    }
                    None => return blocked,
                }
            }
        }

        let break_goal = self.grid.config().break_duration as usize;
        let mut break_len = 0;
        while break_len < break_goal {
            let i = start + len + break_len;
            if i >= self.grid.len() || !self.grid.is_contiguous(start, len + break_len + 1) {
                break; // task abuts the block or grid boundary: rest truncated
            }
            let slot = self.grid.slot(i);
            if slot.occupied {
                match slot.occupant {
                    Some(h) => {
                        if !conflicts.contains(&h) {
                            conflicts.push(h);
                        }
                    }
                    None => return blocked,
                }
            }
            break_len += 1;
        }

        let verdict = if conflicts.is_empty() {
            WindowCheck::Free
        } else {
            WindowCheck::Conflicts(conflicts)
        };
        WindowProbe { verdict, break_len }
    }

    /// Occupies the window for a task and records the placement.
    ///
    /// The window must have probed `Free`.
    pub fn place(&mut self, handle: usize, start: usize, duration: i64, break_len: usize) {
        let len = duration as usize;
        for i in start..start + len {
            let slot = self.grid.slot_mut(i);
            slot.occupied = true;
            slot.occupant = Some(handle);
        }
        for i in start + len..start + len + break_len {
            let slot = self.grid.slot_mut(i);
            slot.occupied = true;
            slot.occupant = None;
        }

        let start_minute = self.grid.slot(start).start_minute;
        self.tasks[handle].assigned = Some(TimeWindow::new(start_minute, start_minute + duration));
        self.completed.insert(handle);
        self.placed.push(handle);
        self.failures.remove(&handle);
        debug!(
            task = %self.tasks[handle].id,
            start = start_minute,
            end = start_minute + duration,
            "task placed"
        );
    }

    /// Frees a task's slots and its trailing rest, and removes it from the
    /// result list and the completed-set. Used by eviction and by
    /// backtracking undo.
    pub fn unplace(&mut self, handle: usize) {
        let Some(window) = self.tasks[handle].assigned else {
            return;
        };
        let Some(start) = self.grid.index_of_minute(window.start) else {
            return;
        };
        let len = window.duration() as usize;

        for i in start..start + len {
            let slot = self.grid.slot_mut(i);
            slot.occupied = false;
            slot.occupant = None;
        }
        // Rest claimed by this placement: the occupied/no-occupant slots
        // immediately following it, inside the same block.
        let break_goal = self.grid.config().break_duration as usize;
        let mut freed = 0;
        while freed < break_goal {
            let i = start + len + freed;
            if i >= self.grid.len() || !self.grid.is_contiguous(start, len + freed + 1) {
                break;
            }
            let slot = self.grid.slot_mut(i);
            if !slot.occupied || slot.occupant.is_some() {
                break;
            }
            slot.occupied = false;
            freed += 1;
        }

        self.tasks[handle].assigned = None;
        self.completed.remove(&handle);
        self.placed.retain(|&h| h != handle);
        trace!(task = %self.tasks[handle].id, "task unplaced");
    }

    /// Evicts the given tasks and every placed task that (transitively)
    /// depends on them, so re-placement can keep dependency order intact.
    ///
    /// Returns the evicted handles dependency-first — the order in which
    /// they must be re-placed. Each is marked rescheduled.
    pub fn evict(&mut self, handles: &[usize]) -> Vec<usize> {
        // Collect the closure under placed dependents.
        let mut set: HashSet<usize> = HashSet::new();
        let mut queue: VecDeque<usize> = handles.iter().copied().collect();
        while let Some(h) = queue.pop_front() {
            if !self.tasks[h].is_placed() || !set.insert(h) {
                continue;
            }
            for &d in &self.dependents[h] {
                if self.completed.contains(&d) {
                    queue.push_back(d);
                }
            }
        }

        // Dependency-first order within the evicted set.
        let mut order: Vec<usize> = Vec::with_capacity(set.len());
        let mut remaining: Vec<usize> = {
            let mut v: Vec<usize> = set.iter().copied().collect();
            v.sort_unstable();
            v
        };
        while !remaining.is_empty() {
            let pos = remaining
                .iter()
                .position(|&h| {
                    self.tasks[h].dependencies.iter().all(|dep| {
                        self.index
                            .get(dep)
                            .map_or(true, |d| !set.contains(d) || order.contains(d))
                    })
                })
                .unwrap_or(0); // acyclic after validation; 0 is unreachable
            order.push(remaining.remove(pos));
        }

        for &h in &order {
            self.unplace(h);
            self.tasks[h].rescheduled = true;
            debug!(task = %self.tasks[h].id, "task evicted");
        }
        order
    }

    /// Records why a task is off the grid. Overwritten by later attempts,
    /// cleared again if the task is eventually placed.
    pub fn report_unplaced(&mut self, handle: usize, reason: UnplacedReason, message: String) {
        debug!(task = %self.tasks[handle].id, ?reason, "task unplaced: {message}");
        self.failures
            .insert(handle, Unplaced::new(self.tasks[handle].id.clone(), reason, message));
    }

    pub fn reported_reason(&self, handle: usize) -> Option<&UnplacedReason> {
        self.failures.get(&handle).map(|u| &u.reason)
    }

    /// Whether a later phase may still try to place this task. Tasks whose
    /// constraints fall outside the grid entirely are settled.
    pub fn retryable(&self, handle: usize) -> bool {
        !self.tasks[handle].is_placed()
            && self.duration_of(handle).is_some()
            && !matches!(
                self.reported_reason(handle),
                Some(UnplacedReason::OutsideWorkingHours)
            )
    }

    /// Assembles the run outcome: every task annotated, one report entry
    /// per unplaced task.
    pub fn finish(mut self) -> WeekSchedule {
        let mut unplaced = Vec::new();
        for handle in 0..self.tasks.len() {
            if self.tasks[handle].is_placed() {
                continue;
            }
            let entry = self.failures.remove(&handle).unwrap_or_else(|| {
                Unplaced::new(
                    self.tasks[handle].id.clone(),
                    UnplacedReason::NoFreeWindow,
                    format!(
                        "no free window for task '{}' within its constraints",
                        self.tasks[handle].id
                    ),
                )
            });
            unplaced.push(entry);
        }

        WeekSchedule {
            tasks: self.tasks,
            unplaced,
        }
    }
}
