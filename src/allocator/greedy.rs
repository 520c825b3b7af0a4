//! Greedy placement of flexible tasks.
//!
//! Scans candidate start indices inside a task's feasible window — bounded
//! below by dependency completion, above by deadline minus duration minus
//! rest — and commits the first window that is free or that can be cleared
//! by evicting strictly lower-priority occupants. Evicted tasks are
//! re-placed immediately, dependency-first; a re-placement may evict
//! further tasks in turn.

use tracing::{debug, trace};

use super::context::{RunContext, WindowCheck};
use crate::models::UnplacedReason;

/// Attempts to place one flexible task. Returns whether it was placed;
/// on failure the task is reported [`UnplacedReason::NoFreeWindow`].
pub(crate) fn place_flexible(ctx: &mut RunContext, handle: usize) -> bool {
    let Some(duration) = ctx.duration_of(handle) else {
        ctx.report_unplaced(
            handle,
            UnplacedReason::NoDuration,
            format!(
                "task '{}' has neither a duration nor an estimate",
                ctx.task(handle).id
            ),
        );
        return false;
    };

    let floor = ctx.dependency_floor(handle);
    let Some(latest) = ctx.latest_start_index(handle, duration) else {
        if let Some(deadline) = ctx.task(handle).deadline {
            ctx.report_unplaced(
                handle,
                UnplacedReason::OutsideWorkingHours,
                format!(
                    "deadline {deadline} for task '{}' leaves no working time",
                    ctx.task(handle).id
                ),
            );
        } else {
            report_no_window(ctx, handle);
        }
        return false;
    };

    let priority = ctx.task(handle).priority;
    for start in floor..=latest {
        let probe = ctx.probe_window(start, duration);
        match probe.verdict {
            WindowCheck::Free => {
                ctx.place(handle, start, duration, probe.break_len);
                return true;
            }
            WindowCheck::Conflicts(occupants) => {
                // Only strictly lower-priority occupants make way; this
                // also bounds eviction cascades (priority strictly drops
                // along any chain).
                if !occupants.iter().all(|&o| ctx.task(o).priority < priority) {
                    trace!(
                        task = %ctx.task(handle).id,
                        start,
                        "conflict not evictable, scanning on"
                    );
                    continue;
                }
                debug!(
                    task = %ctx.task(handle).id,
                    start,
                    evicting = occupants.len(),
                    "clearing window by eviction"
                );
                let evicted = ctx.evict(&occupants);
                let reprobe = ctx.probe_window(start, duration);
                if reprobe.verdict == WindowCheck::Free {
                    ctx.place(handle, start, duration, reprobe.break_len);
                    replace_evicted(ctx, &evicted);
                    return true;
                }
                // Eviction frees every conflicting slot, so this is not
                // reachable; recover by re-placing what was evicted.
                replace_evicted(ctx, &evicted);
            }
            WindowCheck::Blocked => {}
        }
    }

    report_no_window(ctx, handle);
    false
}

/// Re-places evicted tasks in dependency-first order. A task that fits
/// nowhere anymore is reported as an eviction deadlock — its old slots
/// stay free, it is never silently dropped.
pub(crate) fn replace_evicted(ctx: &mut RunContext, evicted: &[usize]) {
    for &handle in evicted {
        if ctx.task(handle).is_placed() {
            continue;
        }
        // A task whose prerequisite also failed re-placement must wait for
        // the backtracking phase; placing it now would break dependency
        // order.
        if !ctx.deps_ready(handle) {
            ctx.report_unplaced(
                handle,
                UnplacedReason::EvictionDeadlock,
                format!(
                    "task '{}' was evicted and its dependencies are no longer placed",
                    ctx.task(handle).id
                ),
            );
            continue;
        }
        if !place_flexible(ctx, handle) {
            ctx.report_unplaced(
                handle,
                UnplacedReason::EvictionDeadlock,
                format!(
                    "task '{}' was evicted and no replacement window exists",
                    ctx.task(handle).id
                ),
            );
        }
    }
}

fn report_no_window(ctx: &mut RunContext, handle: usize) {
    ctx.report_unplaced(
        handle,
        UnplacedReason::NoFreeWindow,
        format!(
            "no free window for task '{}' within its constraints",
            ctx.task(handle).id
        ),
    );
}
