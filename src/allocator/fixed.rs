//! Fixed-task insertion.
//!
//! Tasks with caller-mandated windows go onto the grid first. A fixed task
//! claims exactly its window (plus trailing rest); anything else occupying
//! those slots is evicted and re-placed greedily. Rest can never be
//! evicted — a fixed window touching rest falls back to greedy placement,
//! marked rescheduled. A window outside working hours is reported and left
//! alone.
//!
//! Insertion runs in ascending priority so that when two fixed windows
//! collide, the higher-priority task inserts later and wins the slots.

use tracing::{debug, warn};

use super::context::{RunContext, WindowCheck};
use super::greedy;
use crate::models::UnplacedReason;

pub(crate) fn insert_fixed(ctx: &mut RunContext) {
    let mut fixed: Vec<usize> = (0..ctx.tasks.len())
        .filter(|&h| ctx.task(h).is_fixed() && !ctx.task(h).is_placed())
        .collect();
    fixed.sort_by_key(|&h| ctx.task(h).priority);

    for handle in fixed {
        let Some(window) = ctx.task(handle).fixed else {
            continue;
        };
        let duration = window.duration();
        if duration <= 0 {
            ctx.report_unplaced(
                handle,
                UnplacedReason::NoDuration,
                format!("fixed window for task '{}' is empty", ctx.task(handle).id),
            );
            continue;
        }

        let start = match ctx.grid.index_of_minute(window.start) {
            Some(start) if ctx.grid.is_contiguous(start, duration as usize) => start,
            _ => {
                ctx.report_unplaced(
                    handle,
                    UnplacedReason::OutsideWorkingHours,
                    format!(
                        "fixed window [{}, {}) for task '{}' is outside working hours",
                        window.start,
                        window.end,
                        ctx.task(handle).id
                    ),
                );
                continue;
            }
        };

        let probe = ctx.probe_window(start, duration);
        match probe.verdict {
            WindowCheck::Free => {
                ctx.place(handle, start, duration, probe.break_len);
            }
            WindowCheck::Conflicts(occupants) => {
                debug!(
                    task = %ctx.task(handle).id,
                    evicting = occupants.len(),
                    "fixed window occupied, evicting"
                );
                let evicted = ctx.evict(&occupants);
                let reprobe = ctx.probe_window(start, duration);
                if reprobe.verdict == WindowCheck::Free {
                    ctx.place(handle, start, duration, reprobe.break_len);
                } else {
                    // Eviction cleared every occupant, so this is not
                    // reachable; treat like a rest collision below.
                    warn!(task = %ctx.task(handle).id, "fixed window still blocked after eviction");
                    fall_back_to_greedy(ctx, handle);
                }
                greedy::replace_evicted(ctx, &evicted);
            }
            WindowCheck::Blocked => {
                // Rest in the window cannot be evicted.
                fall_back_to_greedy(ctx, handle);
            }
        }
    }
}

fn fall_back_to_greedy(ctx: &mut RunContext, handle: usize) {
    debug!(
        task = %ctx.task(handle).id,
        "fixed window infeasible, rescheduling greedily"
    );
    ctx.tasks[handle].rescheduled = true;
    greedy::place_flexible(ctx, handle);
}
