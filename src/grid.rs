//! Weekly slot grid.
//!
//! The grid is the universe of schedulable time: one atomic one-minute
//! [`Slot`] for every minute inside working hours on each of the 7 days
//! (Monday = 0). It is the sole authority on whether a minute is
//! schedulable at all. Structure is fixed once built; only slot occupancy
//! mutates during a run.
//!
//! Slots tagged `is_break` by the periodic break pattern are mandated rest
//! and can never hold a task. Post-task rest is marked at placement time as
//! `occupied` with no occupant.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::models::MINUTES_PER_DAY;

/// Working-hours and break-pattern configuration for one week.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridConfig {
    /// First working minute of each day (minutes from midnight).
    pub work_start: i64,
    /// End of working hours (minutes from midnight, exclusive).
    pub work_end: i64,
    /// Length of one break cycle (minutes). The final `break_duration`
    /// minutes of every cycle are tagged break-eligible.
    pub break_interval: i64,
    /// Length of the periodic break and of the mandatory rest after every
    /// placed task (minutes). Zero disables both.
    pub break_duration: i64,
}

impl Default for GridConfig {
    /// 09:00–17:00, a 15-minute break every 2 hours.
    fn default() -> Self {
        Self {
            work_start: 9 * 60,
            work_end: 17 * 60,
            break_interval: 120,
            break_duration: 15,
        }
    }
}

impl GridConfig {
    /// Creates a config with the given working hours and no breaks.
    pub fn new(work_start: i64, work_end: i64) -> Self {
        Self {
            work_start,
            work_end,
            break_interval: 0,
            break_duration: 0,
        }
    }

    /// Sets the break pattern.
    pub fn with_breaks(mut self, interval: i64, duration: i64) -> Self {
        self.break_interval = interval;
        self.break_duration = duration;
        self
    }

    /// Working minutes per day.
    pub fn day_length(&self) -> i64 {
        self.work_end - self.work_start
    }

    fn validate(&self) -> Result<(), ScheduleError> {
        let fail = |reason: String| Err(ScheduleError::InvalidGrid { reason });

        if self.work_start < 0 || self.work_end > MINUTES_PER_DAY {
            return fail(format!(
                "working hours {}..{} outside 0..{MINUTES_PER_DAY}",
                self.work_start, self.work_end
            ));
        }
        if self.work_start >= self.work_end {
            return fail(format!(
                "working hours start ({}) must precede end ({})",
                self.work_start, self.work_end
            ));
        }
        if self.break_duration < 0 || self.break_interval < 0 {
            return fail("break parameters must be non-negative".to_string());
        }
        if self.break_duration > 0 && self.break_interval <= self.break_duration {
            return fail(format!(
                "break interval ({}) must exceed break duration ({})",
                self.break_interval, self.break_duration
            ));
        }
        Ok(())
    }
}

/// One atomic minute of the weekly grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    /// Position in the grid.
    pub index: usize,
    /// Absolute minute-of-week this slot covers (end = start + 1).
    pub start_minute: i64,
    /// Whether anything (task or rest) holds this slot.
    pub occupied: bool,
    /// Tagged by the periodic break pattern; never holds a task.
    pub is_break: bool,
    /// Handle of the occupying task. `None` while `occupied` means
    /// post-task rest, not a task.
    pub occupant: Option<usize>,
}

impl Slot {
    /// Exclusive end minute (slots are atomic).
    #[inline]
    pub fn end_minute(&self) -> i64 {
        self.start_minute + 1
    }

    /// Whether the slot is rest: periodic break or post-task rest.
    #[inline]
    pub fn is_rest(&self) -> bool {
        self.is_break || (self.occupied && self.occupant.is_none())
    }

    /// Whether a task portion could go here right now.
    #[inline]
    pub fn is_free(&self) -> bool {
        !self.occupied && !self.is_break
    }
}

/// The fixed universe of slots for one week.
#[derive(Debug, Clone)]
pub struct WeeklyGrid {
    config: GridConfig,
    slots: Vec<Slot>,
    minute_index: HashMap<i64, usize>,
}

impl WeeklyGrid {
    /// Builds the grid for one week from a validated configuration.
    pub fn build(config: GridConfig) -> Result<Self, ScheduleError> {
        config.validate()?;

        let per_day = config.day_length() as usize;
        let mut slots = Vec::with_capacity(7 * per_day);
        let mut minute_index = HashMap::with_capacity(7 * per_day);

        for day in 0..7 {
            for offset in 0..config.day_length() {
                let minute = day * MINUTES_PER_DAY + config.work_start + offset;
                let is_break = config.break_duration > 0
                    && offset % config.break_interval
                        >= config.break_interval - config.break_duration;
                let index = slots.len();
                minute_index.insert(minute, index);
                slots.push(Slot {
                    index,
                    start_minute: minute,
                    occupied: false,
                    is_break,
                    occupant: None,
                });
            }
        }

        Ok(Self {
            config,
            slots,
            minute_index,
        })
    }

    /// The configuration this grid was built from.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Number of slots in the grid.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the grid has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot at an index.
    pub fn slot(&self, index: usize) -> &Slot {
        &self.slots[index]
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut Slot {
        &mut self.slots[index]
    }

    /// All slots, in index order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Index of the slot covering a minute-of-week, if it is working time.
    pub fn index_of_minute(&self, minute: i64) -> Option<usize> {
        self.minute_index.get(&minute).copied()
    }

    /// Index of the last slot starting at or before a minute-of-week.
    ///
    /// Used to translate deadline minutes (which may fall outside working
    /// hours) into a grid ceiling. `None` if the minute precedes the grid.
    pub fn latest_index_at_or_before(&self, minute: i64) -> Option<usize> {
        let n = self.slots.partition_point(|s| s.start_minute <= minute);
        n.checked_sub(1)
    }

    /// Whether `len` slots from `start` cover consecutive minutes.
    ///
    /// Slot indices run continuously across day boundaries while their
    /// minutes jump; a placement window must stay inside one working block
    /// so the occupant's [start, end) matches its slots.
    pub fn is_contiguous(&self, start: usize, len: usize) -> bool {
        if len == 0 || start + len > self.slots.len() {
            return false;
        }
        let first = self.slots[start].start_minute;
        self.slots[start + len - 1].start_minute == first + len as i64 - 1
    }

    /// Number of slots not tagged by the periodic break pattern.
    pub fn capacity(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_break).count()
    }

    /// Number of slots currently free for a task portion.
    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_free()).count()
    }
}
