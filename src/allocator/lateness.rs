//! Lateness-minimizing refinement.
//!
//! Optional strategy over deadline-bearing tasks that are still off the
//! grid. Never runs unless the caller opts in.
//!
//! Tasks are taken in ascending deadline order and fed into a table
//! `dp[i][t]` = best outcome using the first `i` tasks within a budget of
//! `t` slots, where a task completing at budget `t` contributes
//! `max(0, completion_minute(t) − deadline)` lateness. "Best" minimizes
//! the number of excluded tasks first and cumulative lateness second, so
//! the reconstruction yields the largest subset with the least lateness.
//! Each chosen task is then committed through the same slot-assignment
//! scan greedy placement uses; already-completed tasks are never touched.

use tracing::debug;

use super::context::RunContext;
use super::greedy;

/// (excluded task count, cumulative lateness) — ordered lexicographically.
type Cost = (u32, i64);

/// Runs the refinement pass. Returns the handles it managed to place.
pub(crate) fn refine(ctx: &mut RunContext) -> Vec<usize> {
    // Deadline-bearing tasks not yet on the grid, earliest deadline first.
    let mut infos: Vec<(usize, usize, i64)> = (0..ctx.tasks.len())
        .filter(|&h| ctx.retryable(h) && !ctx.completed.contains(&h))
        .filter_map(|h| {
            let deadline = ctx.task(h).deadline?;
            let duration = ctx.duration_of(h)?;
            Some((h, duration as usize, deadline))
        })
        .collect();
    infos.sort_by_key(|&(_, _, deadline)| deadline);

    if infos.is_empty() {
        return Vec::new();
    }

    let horizon = ctx.grid.len();
    let n = infos.len();
    let mut dp: Vec<Vec<Cost>> = vec![vec![(0, 0); horizon + 1]; n + 1];

    for i in 1..=n {
        let (_, duration, deadline) = infos[i - 1];
        for t in 0..=horizon {
            let mut best: Cost = (dp[i - 1][t].0 + 1, dp[i - 1][t].1); // exclude task i
            if t >= duration {
                let completion = ctx.grid.slot(t - 1).end_minute();
                let lateness = (completion - deadline).max(0);
                let take: Cost = (dp[i - 1][t - duration].0, dp[i - 1][t - duration].1 + lateness);
                if take < best {
                    best = take;
                }
            }
            dp[i][t] = best;
        }
    }

    // Best final budget, then walk the table back to the chosen subset.
    let mut budget = 0;
    for t in 0..=horizon {
        if dp[n][t] < dp[n][budget] {
            budget = t;
        }
    }

    let mut chosen: Vec<usize> = Vec::new();
    let mut t = budget;
    for i in (1..=n).rev() {
        let (handle, duration, deadline) = infos[i - 1];
        if t >= duration {
            let completion = ctx.grid.slot(t - 1).end_minute();
            let lateness = (completion - deadline).max(0);
            let take: Cost = (dp[i - 1][t - duration].0, dp[i - 1][t - duration].1 + lateness);
            if dp[i][t] == take {
                chosen.push(handle);
                t -= duration;
                continue;
            }
        }
        // excluded at this budget
    }
    chosen.reverse(); // back to ascending deadline order

    debug!(
        candidates = n,
        chosen = chosen.len(),
        lateness = dp[n][budget].1,
        "lateness refinement selected subset"
    );

    let mut placed = Vec::new();
    for handle in chosen {
        if ctx.task(handle).is_placed() || !ctx.deps_ready(handle) {
            continue;
        }
        if greedy::place_flexible(ctx, handle) {
            placed.push(handle);
        }
    }
    placed
}
