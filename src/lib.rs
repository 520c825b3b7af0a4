//! Weekly task allocation engine.
//!
//! Allocates prioritized, interdependent tasks onto a minute-granular slot
//! grid spanning one abstract week, under working-hours bounds, mandatory
//! post-task rest, deadlines, and caller-fixed time windows. Collisions
//! with higher-priority or fixed work are resolved by cascading eviction
//! and rescheduling.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Task`, `TimeWindow`, `RecurringTask`,
//!   `WeekSchedule` and its unplaced-task report
//! - **`validation`**: Input integrity checks (duplicate IDs, unknown
//!   references, dependency cycles)
//! - **`priority`**: Dependency priority propagation and the processing
//!   queue ordering
//! - **`grid`**: The weekly slot universe and its configuration
//! - **`allocator`**: The placement engine — fixed insertion with
//!   eviction, greedy placement, optional lateness refinement,
//!   backtracking search
//! - **`kpi`**: Schedule quality metrics
//! - **`export`**: iCalendar rendering of placed tasks
//! - **`timeutil`**: Minute-of-week ↔ datetime conversion, duration
//!   parsing
//!
//! # Model
//!
//! Time is an integer minute-of-week (Monday 00:00 = 0); the week recurs
//! and carries no calendar identity. One [`allocator::Allocator`] run is
//! synchronous, single-threaded, and owns all of its mutable state; the
//! caller gets every task back annotated, with an explicit report for
//! anything left off the grid.

pub mod allocator;
pub mod error;
pub mod export;
pub mod grid;
pub mod kpi;
pub mod models;
pub mod priority;
pub mod timeutil;
pub mod validation;
