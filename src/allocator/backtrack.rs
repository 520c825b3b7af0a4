//! Backtracking search over leftover tasks.
//!
//! Last resort for tasks the earlier phases could not place. Depth-first:
//! pick an unscheduled task, try every feasible start index (dependency
//! floor and deadline ceiling as in greedy placement, free windows only —
//! the search never evicts), recurse; undo the most recent placement on
//! dead ends and try the next candidate, then the next task order. Failed
//! states are memoized by the value tuple of (task handle, assigned start)
//! across the whole search pool — placed and pending alike — so no grid
//! state is explored twice.
//!
//! Success places every pending task; failure rolls all of them back and
//! leaves them reported.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::context::{RunContext, WindowCheck};

type StateKey = Vec<(usize, Option<i64>)>;

/// Runs the search over the pending handles. Returns whether every one of
/// them ended up placed.
pub(crate) fn search(ctx: &mut RunContext, mut pending: Vec<usize>) -> bool {
    pending.retain(|&h| !ctx.task(h).is_placed());
    if pending.is_empty() {
        return true;
    }

    // Search heuristic: descending (priority, deadline, duration);
    // missing deadlines sort as unbounded.
    pending.sort_by(|&a, &b| sort_key(ctx, b).cmp(&sort_key(ctx, a)));
    let pool = pending.clone();

    let mut memo: HashSet<StateKey> = HashSet::new();
    let placed_all = solve(ctx, &pool, &mut pending, &mut memo);
    if placed_all {
        debug!("backtracking placed every pending task");
    } else {
        warn!(
            pending = pending.len(),
            explored = memo.len(),
            "backtracking search exhausted"
        );
    }
    placed_all
}

fn sort_key(ctx: &RunContext, handle: usize) -> (i32, i64, i64) {
    let task = ctx.task(handle);
    (
        task.priority,
        task.deadline.unwrap_or(i64::MAX),
        ctx.duration_of(handle).unwrap_or(0),
    )
}

fn state_key(ctx: &RunContext, pool: &[usize]) -> StateKey {
    pool.iter()
        .map(|&h| (h, ctx.task(h).assigned.map(|w| w.start)))
        .collect()
}

fn solve(
    ctx: &mut RunContext,
    pool: &[usize],
    remaining: &mut Vec<usize>,
    memo: &mut HashSet<StateKey>,
) -> bool {
    if remaining.is_empty() {
        return true;
    }

    let state = state_key(ctx, pool);
    if memo.contains(&state) {
        return false;
    }

    for pos in 0..remaining.len() {
        let handle = remaining[pos];
        if !ctx.deps_ready(handle) {
            continue;
        }
        let Some(duration) = ctx.duration_of(handle) else {
            continue;
        };

        let floor = ctx.dependency_floor(handle);
        let Some(latest) = ctx.latest_start_index(handle, duration) else {
            continue;
        };

        for start in floor..=latest {
            let probe = ctx.probe_window(start, duration);
            if probe.verdict != WindowCheck::Free {
                continue;
            }

            ctx.place(handle, start, duration, probe.break_len);
            remaining.remove(pos);
            if solve(ctx, pool, remaining, memo) {
                return true;
            }
            remaining.insert(pos, handle);
            ctx.unplace(handle);
        }
    }

    memo.insert(state);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridConfig, WeeklyGrid};
    use crate::models::Task;

    fn context(work_end: i64, tasks: Vec<Task>) -> RunContext {
        let grid = WeeklyGrid::build(GridConfig::new(540, work_end)).unwrap();
        RunContext::new(grid, tasks)
    }

    #[test]
    fn test_places_pending_tasks() {
        let mut ctx = context(
            1020,
            vec![
                Task::new("a").with_duration(60),
                Task::new("b").with_duration(30),
            ],
        );
        assert!(search(&mut ctx, vec![0, 1]));
        assert!(ctx.tasks[0].is_placed());
        assert!(ctx.tasks[1].is_placed());
    }

    #[test]
    fn test_orders_dependency_chains() {
        // b needs a placed first; the search must find the a-then-b branch.
        let mut ctx = context(
            1020,
            vec![
                Task::new("a").with_duration(60),
                Task::new("b").with_duration(30).with_dependency("a"),
            ],
        );
        assert!(search(&mut ctx, vec![1, 0]));
        let a = ctx.tasks[0].assigned.unwrap();
        let b = ctx.tasks[1].assigned.unwrap();
        assert!(b.start >= a.end);
    }

    #[test]
    fn test_tight_deadlines_need_reordering() {
        // Working day 9:00–11:00. The heuristic order tries "big" (higher
        // priority) first, which pushes "urgent" past its deadline; the
        // search must back out and discover urgent-then-big.
        let mut ctx = context(
            660,
            vec![
                Task::new("big")
                    .with_priority(9)
                    .with_duration(60)
                    .with_deadline(660),
                Task::new("urgent")
                    .with_priority(1)
                    .with_duration(60)
                    .with_deadline(600),
            ],
        );
        assert!(search(&mut ctx, vec![0, 1]));
        let big = ctx.tasks[0].assigned.unwrap();
        let urgent = ctx.tasks[1].assigned.unwrap();
        assert_eq!((urgent.start, urgent.end), (540, 600));
        assert_eq!((big.start, big.end), (600, 660));
    }

    #[test]
    fn test_exhaustion_rolls_back_everything() {
        // 120 free minutes before the shared deadline, three 60-minute tasks.
        let mut ctx = context(
            660,
            vec![
                Task::new("a").with_duration(60).with_deadline(660),
                Task::new("b").with_duration(60).with_deadline(660),
                Task::new("c").with_duration(60).with_deadline(660),
            ],
        );
        assert!(!search(&mut ctx, vec![0, 1, 2]));
        // All-or-nothing: the failed search leaves no partial placements.
        assert!(ctx.tasks.iter().all(|t| !t.is_placed()));
        assert!(ctx.placed.is_empty());
    }

    #[test]
    fn test_memo_caches_failed_states() {
        let mut ctx = context(
            660,
            vec![
                Task::new("a").with_duration(60).with_deadline(660),
                Task::new("b").with_duration(60).with_deadline(660),
                Task::new("c").with_duration(60).with_deadline(660),
            ],
        );
        let pool = vec![0, 1, 2];
        let mut remaining = pool.clone();
        let mut memo = HashSet::new();
        assert!(!solve(&mut ctx, &pool, &mut remaining, &mut memo));
        // The root state (nothing assigned) is among the cached failures.
        let root: StateKey = pool.iter().map(|&h| (h, None)).collect();
        assert!(memo.contains(&root));
    }
}
