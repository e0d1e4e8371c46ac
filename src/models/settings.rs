use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const DEFAULT_WORK_START_MINUTE: u32 = 9 * 60;
pub const DEFAULT_WORK_END_MINUTE: u32 = 18 * 60;
pub const DEFAULT_BUFFER_MINUTES: i64 = 15;
pub const DEFAULT_MAX_CONSECUTIVE_HOURS: f64 = 4.0; // 4 hours continuous work
pub const DEFAULT_MIN_BREAK_MINUTES: i64 = 10; // Recommend 10-minute break
pub const DEFAULT_SLOT_INCREMENT_MINUTES: i64 = 15;

/// Per-user auto-scheduling policy. Resolved by the caller and threaded
/// into every core function; the scheduling core never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutoScheduleSettings {
    /// Weekday ordinals eligible for placement, 0 = Monday .. 6 = Sunday.
    pub work_days: Vec<u32>,
    /// Minutes from midnight.
    pub work_start_minute: u32,
    /// Minutes from midnight, exclusive end of the work window.
    pub work_end_minute: u32,
    /// Minimum gap kept between any auto-placed interval and its
    /// neighbors, independent of break policy.
    pub buffer_minutes: i64,
    pub max_consecutive_hours: f64,
    pub min_break_minutes: i64,
    pub enforce_breaks: bool,
    /// Granularity of candidate start times during the slot search.
    #[serde(default = "default_slot_increment")]
    pub slot_increment_minutes: i64,
}

fn default_slot_increment() -> i64 {
    DEFAULT_SLOT_INCREMENT_MINUTES
}

impl Default for AutoScheduleSettings {
    fn default() -> Self {
        Self {
            work_days: vec![0, 1, 2, 3, 4],
            work_start_minute: DEFAULT_WORK_START_MINUTE,
            work_end_minute: DEFAULT_WORK_END_MINUTE,
            buffer_minutes: DEFAULT_BUFFER_MINUTES,
            max_consecutive_hours: DEFAULT_MAX_CONSECUTIVE_HOURS,
            min_break_minutes: DEFAULT_MIN_BREAK_MINUTES,
            enforce_breaks: true,
            slot_increment_minutes: DEFAULT_SLOT_INCREMENT_MINUTES,
        }
    }
}

impl AutoScheduleSettings {
    pub fn validate(&self) -> AppResult<()> {
        ensure_valid_minute(self.work_start_minute)?;
        ensure_valid_minute(self.work_end_minute)?;
        if self.work_start_minute >= self.work_end_minute {
            return Err(AppError::validation(
                "invalid work window: start must be earlier than end",
            ));
        }
        if self.work_days.is_empty() {
            return Err(AppError::validation("at least one work day is required"));
        }
        if self.work_days.iter().any(|day| *day > 6) {
            return Err(AppError::validation(
                "work day ordinals must be 0 (Monday) through 6 (Sunday)",
            ));
        }
        if self.buffer_minutes < 0 {
            return Err(AppError::validation("buffer minutes must not be negative"));
        }
        if self.min_break_minutes < 0 {
            return Err(AppError::validation(
                "minimum break duration must not be negative",
            ));
        }
        if self.max_consecutive_hours <= 0.0 {
            return Err(AppError::validation(
                "maximum consecutive work hours must be positive",
            ));
        }
        if self.slot_increment_minutes <= 0 {
            return Err(AppError::validation("slot increment must be positive"));
        }
        Ok(())
    }

    pub fn is_work_day(&self, weekday_ordinal: u32) -> bool {
        self.work_days.contains(&weekday_ordinal)
    }

    pub fn max_consecutive_minutes(&self) -> i64 {
        (self.max_consecutive_hours * 60.0).round() as i64
    }

    pub fn work_minutes_per_day(&self) -> i64 {
        i64::from(self.work_end_minute) - i64::from(self.work_start_minute)
    }
}

fn ensure_valid_minute(value: u32) -> AppResult<()> {
    if value > 1440 {
        return Err(AppError::validation(
            "work window bounds must be within 0~1440 minutes",
        ));
    }
    Ok(())
}
