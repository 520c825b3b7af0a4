//! Schedule quality metrics.
//!
//! Computed from a finished [`WeekSchedule`] against the grid it was
//! allocated on.
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan | Latest assigned end minute |
//! | Total lateness | Sum of max(0, end − deadline) over placed tasks |
//! | Max lateness | Largest single overrun |
//! | On-time rate | Fraction of placed deadline tasks meeting them |
//! | Grid utilization | Placed minutes / schedulable (non-break) minutes |

use crate::grid::WeeklyGrid;
use crate::models::WeekSchedule;

/// Performance indicators for one allocation outcome.
#[derive(Debug, Clone)]
pub struct ScheduleKpi {
    /// Latest assigned end minute across placed tasks.
    pub makespan_minute: i64,
    /// Sum of deadline overruns (minutes).
    pub total_lateness: i64,
    /// Largest single deadline overrun (minutes).
    pub max_lateness: i64,
    /// Fraction of placed deadline-bearing tasks that met their deadline
    /// (1.0 when none carry deadlines).
    pub on_time_rate: f64,
    /// Number of placed tasks.
    pub placed_count: usize,
    /// Number of reported unplaced tasks.
    pub unplaced_count: usize,
    /// Placed task minutes over schedulable grid minutes.
    pub grid_utilization: f64,
}

impl ScheduleKpi {
    /// Computes KPIs for a schedule on its grid.
    pub fn calculate(schedule: &WeekSchedule, grid: &WeeklyGrid) -> Self {
        let mut total_lateness = 0i64;
        let mut max_lateness = 0i64;
        let mut with_deadline = 0usize;
        let mut on_time = 0usize;
        let mut busy_minutes = 0i64;

        for task in schedule.placed() {
            let Some(window) = task.assigned else {
                continue;
            };
            busy_minutes += window.duration();
            if let Some(deadline) = task.deadline {
                with_deadline += 1;
                let lateness = (window.end - deadline).max(0);
                if lateness == 0 {
                    on_time += 1;
                }
                total_lateness += lateness;
                max_lateness = max_lateness.max(lateness);
            }
        }

        let on_time_rate = if with_deadline == 0 {
            1.0
        } else {
            on_time as f64 / with_deadline as f64
        };
        let capacity = grid.capacity() as f64;
        let grid_utilization = if capacity > 0.0 {
            busy_minutes as f64 / capacity
        } else {
            0.0
        };

        Self {
            makespan_minute: schedule.makespan_minute(),
            total_lateness,
            max_lateness,
            on_time_rate,
            placed_count: schedule.placed_count(),
            unplaced_count: schedule.unplaced.len(),
            grid_utilization,
        }
    }
}
