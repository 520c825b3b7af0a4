//! Allocation domain models.
//!
//! Plain records shared by every engine component: tasks and their time
//! constraints, the recurring-task templates that expand into them, and
//! the placed/unplaced outcome of a run.

mod recurring;
mod schedule;
mod task;
pub(crate) mod window;

pub use recurring::{Recurrence, RecurringTask};
pub use schedule::{Unplaced, UnplacedReason, WeekSchedule};
pub use task::Task;
pub use window::{TimeWindow, MINUTES_PER_DAY, MINUTES_PER_WEEK};
