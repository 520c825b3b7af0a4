//! The slot allocation engine.
//!
//! One [`Allocator::allocate`] call runs the full pipeline over a task
//! collection:
//!
//! 1. validation (duplicate IDs, unknown references, dependency cycles)
//! 2. grid construction from the [`GridConfig`]
//! 3. priority propagation along dependency edges
//! 4. fixed-task insertion with conflict eviction
//! 5. greedy placement of flexible tasks in priority order, deferring
//!    tasks whose dependencies aren't placed yet
//! 6. optional lateness-minimizing refinement (opt-in)
//! 7. backtracking search over whatever is still off the grid
//!
//! The run is synchronous and single-threaded; the grid and completed-set
//! live in a [`context::RunContext`] owned by exactly one run. Hosts that
//! process several schedules serialize runs per schedule or build one
//! `Allocator` per run.
//!
//! Per-task failures never abort a run — the returned
//! [`WeekSchedule`] reports every unplaced task alongside the placements.

mod backtrack;
mod context;
mod fixed;
mod greedy;
mod lateness;

use tracing::{debug, warn};

use crate::error::ScheduleError;
use crate::grid::{GridConfig, WeeklyGrid};
use crate::models::{Task, UnplacedReason, WeekSchedule};
use crate::priority::{propagate_priorities, ProcessingQueue};
use crate::validation::{validate_tasks, ValidationErrorKind};

use context::RunContext;

/// Strategy switches for one allocation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocatorOptions {
    /// Run the lateness-minimizing refinement pass between greedy
    /// placement and backtracking. Off by default.
    pub lateness_refinement: bool,
}

/// The scheduling engine: allocates tasks onto a weekly slot grid.
///
/// # Example
///
/// ```
/// use weekplan::allocator::Allocator;
/// use weekplan::grid::GridConfig;
/// use weekplan::models::Task;
///
/// let tasks = vec![
///     Task::new("prep").with_priority(5).with_duration(60),
///     Task::new("meet").with_priority(5).with_fixed(600, 660),
/// ];
/// let allocator = Allocator::new(GridConfig::new(540, 1020));
/// let schedule = allocator.allocate(tasks).unwrap();
/// assert_eq!(schedule.placed_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Allocator {
    config: GridConfig,
    options: AllocatorOptions,
}

impl Allocator {
    /// Creates an allocator for the given grid configuration.
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            options: AllocatorOptions::default(),
        }
    }

    /// Enables or disables the lateness refinement pass.
    pub fn with_lateness_refinement(mut self, enabled: bool) -> Self {
        self.options.lateness_refinement = enabled;
        self
    }

    /// Allocates a task collection onto one week.
    ///
    /// Returns the tasks annotated with assigned windows plus a report for
    /// every task left off the grid. Only structural problems — a cyclic
    /// graph, an invalid grid, a malformed collection — are errors.
    pub fn allocate(&self, mut tasks: Vec<Task>) -> Result<WeekSchedule, ScheduleError> {
        if let Err(errors) = validate_tasks(&tasks) {
            if errors
                .iter()
                .any(|e| e.kind != ValidationErrorKind::CyclicDependency)
            {
                return Err(ScheduleError::InvalidTasks(errors));
            }
            // Only cycles: fall through, propagation names the cycle task.
        }

        let grid = WeeklyGrid::build(self.config)?;

        // One allocation pass per collection: clear any stale annotations.
        for task in &mut tasks {
            task.assigned = None;
            task.rescheduled = false;
        }

        propagate_priorities(&mut tasks)?;
        let mut ctx = RunContext::new(grid, tasks);

        // Tasks carrying no time at all are skipped, not errors.
        for handle in 0..ctx.tasks.len() {
            if ctx.duration_of(handle).is_none() {
                ctx.report_unplaced(
                    handle,
                    UnplacedReason::NoDuration,
                    format!(
                        "task '{}' has neither a duration nor an estimate",
                        ctx.task(handle).id
                    ),
                );
            }
        }

        debug!("phase: fixed insertion");
        fixed::insert_fixed(&mut ctx);

        debug!("phase: greedy placement");
        run_queue(&mut ctx);

        if self.options.lateness_refinement {
            debug!("phase: lateness refinement");
            lateness::refine(&mut ctx);
        }

        let pending: Vec<usize> = (0..ctx.tasks.len()).filter(|&h| ctx.retryable(h)).collect();
        if !pending.is_empty() {
            debug!(count = pending.len(), "phase: backtracking");
            backtrack::search(&mut ctx, pending);
        }

        Ok(ctx.finish())
    }
}

/// Greedy queue phase: pop the highest-priority flexible task, defer it if
/// its dependencies aren't placed yet, place it otherwise. A full cycle of
/// deferrals with no placement ends the phase — the stragglers go to the
/// backtracking pool instead of spinning here.
fn run_queue(ctx: &mut RunContext) {
    let flexible: Vec<usize> = (0..ctx.tasks.len())
        .filter(|&h| {
            !ctx.task(h).is_fixed()
                && !ctx.task(h).is_placed()
                && ctx.duration_of(h).is_some()
        })
        .collect();

    let mut queue = ProcessingQueue::build(&ctx.tasks, flexible);
    let mut deferred_streak = 0usize;

    while let Some(handle) = queue.pop() {
        if ctx.task(handle).is_placed() {
            continue;
        }
        if !ctx.deps_ready(handle) {
            queue.defer(handle);
            deferred_streak += 1;
            if deferred_streak >= queue.len() {
                warn!(
                    stalled = queue.len(),
                    "greedy phase made no progress over a full pass"
                );
                break;
            }
            continue;
        }
        deferred_streak = 0;
        greedy::place_flexible(ctx, handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeWindow;

    fn no_breaks() -> GridConfig {
        GridConfig::new(540, 1020)
    }

    #[test]
    fn test_fixed_scenario_from_overview() {
        // 9:00–17:00, no breaks; 60 minutes fixed at minute 540.
        let tasks = vec![Task::new("anchor").with_fixed(540, 600)];
        let schedule = Allocator::new(no_breaks()).allocate(tasks).unwrap();
        assert_eq!(
            schedule.task("anchor").unwrap().assigned,
            Some(TimeWindow::new(540, 600))
        );
    }

    #[test]
    fn test_dependency_order_and_priority_boost() {
        let tasks = vec![
            Task::new("a").with_priority(5).with_duration(60),
            Task::new("b")
                .with_priority(3)
                .with_duration(60)
                .with_dependency("a"),
        ];
        let schedule = Allocator::new(no_breaks()).allocate(tasks).unwrap();

        let a = schedule.task("a").unwrap();
        let b = schedule.task("b").unwrap();
        assert!(a.assigned.unwrap().end <= b.assigned.unwrap().start);
        // b's prerequisite keeps at least b's priority.
        assert!(a.priority >= 3);
    }

    #[test]
    fn test_deferred_dependency_still_places() {
        // Propagation levels all four priorities, so the dependency-count
        // tie-break pops "report" before "merge" (1 dep vs 2). Its
        // prerequisite isn't placed yet, so it is deferred to the back of
        // the queue and retried after merge lands.
        let tasks = vec![
            Task::new("report")
                .with_priority(8)
                .with_duration(60)
                .with_dependency("merge"),
            Task::new("merge")
                .with_priority(2)
                .with_duration(60)
                .with_dependency("pull-a")
                .with_dependency("pull-b"),
            Task::new("pull-a").with_priority(2).with_duration(30),
            Task::new("pull-b").with_priority(2).with_duration(30),
        ];
        let schedule = Allocator::new(no_breaks()).allocate(tasks).unwrap();

        assert_eq!(schedule.placed_count(), 4);
        let merge = schedule.task("merge").unwrap().assigned.unwrap();
        let report = schedule.task("report").unwrap().assigned.unwrap();
        assert!(merge.end <= report.start);
        for dep in ["pull-a", "pull-b"] {
            assert!(schedule.task(dep).unwrap().assigned.unwrap().end <= merge.start);
        }
    }

    #[test]
    fn test_capacity_overflow_reports_one_of_three() {
        // Feasible windows capped at Monday 9:00–13:00 by shared deadlines:
        // 240 free minutes, three 120-minute tasks → exactly two fit.
        let tasks = vec![
            Task::new("x").with_priority(5).with_duration(120).with_deadline(780),
            Task::new("y").with_priority(5).with_duration(120).with_deadline(780),
            Task::new("z").with_priority(5).with_duration(120).with_deadline(780),
        ];
        let schedule = Allocator::new(no_breaks()).allocate(tasks).unwrap();

        assert_eq!(schedule.placed_count(), 2);
        assert_eq!(schedule.unplaced.len(), 1);
        assert_eq!(schedule.unplaced[0].reason, UnplacedReason::NoFreeWindow);
    }

    #[test]
    fn test_deadline_before_working_hours_reported() {
        let tasks = vec![Task::new("doomed").with_duration(60).with_deadline(300)];
        let schedule = Allocator::new(no_breaks()).allocate(tasks).unwrap();

        assert_eq!(schedule.placed_count(), 0);
        let entry = schedule.unplaced_for("doomed").unwrap();
        assert_eq!(entry.reason, UnplacedReason::OutsideWorkingHours);
    }

    #[test]
    fn test_task_without_duration_skipped_not_fatal() {
        let tasks = vec![
            Task::new("empty"),
            Task::new("real").with_duration(60),
        ];
        let schedule = Allocator::new(no_breaks()).allocate(tasks).unwrap();

        assert_eq!(schedule.placed_count(), 1);
        assert_eq!(
            schedule.unplaced_for("empty").unwrap().reason,
            UnplacedReason::NoDuration
        );
    }

    #[test]
    fn test_cycle_aborts_run() {
        let tasks = vec![
            Task::new("a").with_duration(60).with_dependency("b"),
            Task::new("b").with_duration(60).with_dependency("a"),
        ];
        let err = Allocator::new(no_breaks()).allocate(tasks).unwrap_err();
        assert!(matches!(err, ScheduleError::DependencyCycle { .. }));
    }

    #[test]
    fn test_duplicate_ids_abort_run() {
        let tasks = vec![
            Task::new("a").with_duration(60),
            Task::new("a").with_duration(30),
        ];
        let err = Allocator::new(no_breaks()).allocate(tasks).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidTasks(_)));
    }

    #[test]
    fn test_invalid_grid_aborts_run() {
        let err = Allocator::new(GridConfig::new(1020, 540))
            .allocate(vec![Task::new("a").with_duration(60)])
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidGrid { .. }));
    }

    #[test]
    fn test_every_placement_followed_by_rest() {
        let config = GridConfig::new(540, 1020).with_breaks(480, 15);
        let tasks = vec![
            Task::new("a").with_priority(3).with_duration(60),
            Task::new("b").with_priority(2).with_duration(45),
            Task::new("c").with_priority(1).with_fixed(700, 760),
        ];
        let schedule = Allocator::new(config).allocate(tasks).unwrap();
        assert_eq!(schedule.placed_count(), 3);

        // After each placed task, 15 minutes are claimed as rest that no
        // other task window may intrude on.
        let ends: Vec<i64> = schedule
            .placed()
            .map(|t| t.assigned.unwrap().end)
            .collect();
        for end in ends {
            for other in schedule.placed() {
                let w = other.assigned.unwrap();
                assert!(
                    w.start >= end + 15 || w.end <= end,
                    "task window {:?} intrudes on the rest after minute {end}",
                    w
                );
            }
        }
    }

    #[test]
    fn test_lateness_refinement_opt_in() {
        let tasks = vec![
            Task::new("due-late").with_duration(60).with_deadline(4000),
            Task::new("due-soon").with_duration(60).with_deadline(660),
        ];
        let schedule = Allocator::new(no_breaks())
            .with_lateness_refinement(true)
            .allocate(tasks)
            .unwrap();
        assert_eq!(schedule.placed_count(), 2);
        // Deadlines hold regardless of the strategy mix.
        for task in schedule.placed() {
            if let Some(deadline) = task.deadline {
                assert!(task.assigned.unwrap().end <= deadline);
            }
        }
    }

    #[test]
    fn test_randomized_allocation_keeps_invariants() {
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(42);
        for round in 0..20 {
            let count = rng.random_range(3..12);
            let mut tasks = Vec::new();
            for i in 0..count {
                let mut task = Task::new(format!("t{round}-{i}"))
                    .with_priority(rng.random_range(1..10))
                    .with_duration(rng.random_range(1..8) * 15);
                if i > 0 && rng.random_bool(0.4) {
                    let dep = rng.random_range(0..i);
                    task = task.with_dependency(format!("t{round}-{dep}"));
                }
                if rng.random_bool(0.3) {
                    task = task.with_deadline(rng.random_range(600..7000));
                }
                if rng.random_bool(0.2) {
                    let length = task.duration.unwrap_or(60);
                    let day = rng.random_range(0..5i64);
                    let start = day * 1440 + rng.random_range(540..900);
                    task = task.with_fixed(start, start + length);
                }
                tasks.push(task);
            }

            let config = GridConfig::new(540, 1020).with_breaks(240, 15);
            let schedule = Allocator::new(config).allocate(tasks).unwrap();

            // Every task is either placed or reported, never dropped.
            for task in &schedule.tasks {
                assert!(
                    task.is_placed() || schedule.unplaced_for(&task.id).is_some(),
                    "task {} vanished from the outcome",
                    task.id
                );
            }

            for task in schedule.placed() {
                let w = task.assigned.unwrap();
                // Placement matches the task's effective duration.
                assert!(w.start < w.end);
                assert_eq!(w.duration(), task.effective_duration().unwrap());

                // No two placed tasks overlap.
                for other in schedule.placed() {
                    if other.id != task.id {
                        assert!(
                            !w.overlaps(&other.assigned.unwrap()),
                            "{} overlaps {}",
                            task.id,
                            other.id
                        );
                    }
                }

                // Deadlines hold for every window the engine chose itself.
                if let (Some(deadline), false) = (task.deadline, task.is_fixed()) {
                    assert!(w.end <= deadline, "{} missed its deadline", task.id);
                }

                // Dependencies are placed and finish first — except for
                // caller-fixed windows, which the engine honors as given.
                if !task.is_fixed() {
                    for dep in &task.dependencies {
                        let dep_task = schedule.task(dep).unwrap();
                        assert!(dep_task.is_placed(), "{} placed before dep {dep}", task.id);
                        assert!(dep_task.assigned.unwrap().end <= w.start);
                    }
                }
            }
        }
    }

    #[test]
    fn test_backtracking_rescues_eviction_deadlock() {
        // 9:00–12:00 days. "meeting" is evicted by "workshop" and cannot
        // be re-placed while workshop covers its whole deadline window —
        // an eviction deadlock. "keynote" then evicts workshop to Tuesday,
        // freeing Monday morning, and the backtracking phase must pick the
        // deadlocked task back up.
        let config = GridConfig::new(540, 720);
        let tasks = vec![
            Task::new("meeting")
                .with_priority(1)
                .with_fixed(560, 620)
                .with_deadline(620),
            Task::new("workshop").with_priority(3).with_fixed(540, 660),
            Task::new("keynote").with_priority(9).with_fixed(620, 680),
        ];
        let schedule = Allocator::new(config).allocate(tasks).unwrap();

        assert_eq!(schedule.placed_count(), 3);
        let meeting = schedule.task("meeting").unwrap();
        assert!(meeting.rescheduled);
        let w = meeting.assigned.unwrap();
        assert_eq!((w.start, w.end), (540, 600));
        // The twice-displaced workshop landed on Tuesday.
        let workshop = schedule.task("workshop").unwrap();
        assert!(workshop.rescheduled);
        assert_eq!(workshop.assigned.unwrap().start, 1440 + 540);
    }
}
