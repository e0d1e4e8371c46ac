use chrono::{offset::LocalResult, DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Timelike};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::task::TaskRecord;

pub fn parse_datetime(value: &str) -> AppResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|err| {
        AppError::validation_with_details(
            "invalid datetime format",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn parse_optional_datetime(value: Option<&String>) -> AppResult<Option<DateTime<FixedOffset>>> {
    match value {
        Some(raw) => Ok(Some(parse_datetime(raw)?)),
        Option::None => Ok(Option::None),
    }
}

pub fn format_datetime(dt: DateTime<FixedOffset>) -> String {
    dt.to_rfc3339()
}

pub fn add_minutes(dt: DateTime<FixedOffset>, minutes: i64) -> AppResult<DateTime<FixedOffset>> {
    dt.checked_add_signed(Duration::minutes(minutes))
        .ok_or_else(|| AppError::validation("datetime arithmetic out of range"))
}

pub fn duration_minutes(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> AppResult<i64> {
    let total = end.signed_duration_since(start).num_minutes();
    if total < 0 {
        Err(AppError::validation("end time must not precede start time"))
    } else {
        Ok(total)
    }
}

pub fn minutes_from_midnight(dt: DateTime<FixedOffset>) -> i64 {
    let time = dt.time();
    (time.hour() as i64) * 60 + (time.minute() as i64)
}

pub fn to_naive_time(total_minutes: u32) -> NaiveTime {
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    NaiveTime::from_hms_opt(hours, minutes, 0)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).expect("00:00 must be valid"))
}

/// Round up to the next multiple of `increment` minutes from midnight,
/// dropping any sub-minute component first.
pub fn round_up_to_increment(
    dt: DateTime<FixedOffset>,
    increment: i64,
) -> AppResult<DateTime<FixedOffset>> {
    let truncated = dt
        .with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .ok_or_else(|| AppError::validation("datetime arithmetic out of range"))?;
    let carry = if truncated < dt { 1 } else { 0 };
    let minute_of_day = minutes_from_midnight(truncated) + carry;
    let rounded = ((minute_of_day + increment - 1) / increment) * increment;
    add_minutes(truncated, rounded - minutes_from_midnight(truncated))
}

/// Anchor a wall-clock time on the same day as `day`, keeping its offset.
pub fn build_day_time(
    day: DateTime<FixedOffset>,
    naive_time: NaiveTime,
) -> DateTime<FixedOffset> {
    let offset = *day.offset();
    let naive = day.date_naive().and_time(naive_time);
    match offset.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(first, _) => first,
        LocalResult::None => day,
    }
}

/// Immutable half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl TimeSlot {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> AppResult<Self> {
        if end <= start {
            return Err(AppError::validation_with_details(
                "interval end must be after its start",
                json!({"start": format_datetime(start), "end": format_datetime(end)}),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn from_start(start: DateTime<FixedOffset>, minutes: i64) -> AppResult<Self> {
        Self::new(start, add_minutes(start, minutes)?)
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_minutes()
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Minutes from this interval's end to the next interval's start.
    /// Negative when the intervals overlap.
    pub fn gap_to(&self, next: &TimeSlot) -> i64 {
        next.start.signed_duration_since(self.end).num_minutes()
    }

    pub fn shifted_by(&self, minutes: i64) -> AppResult<Self> {
        Self::new(add_minutes(self.start, minutes)?, add_minutes(self.end, minutes)?)
    }

    /// True when the other interval sits closer than `buffer` minutes,
    /// overlap included.
    pub fn conflicts_with(&self, other: &TimeSlot, buffer_minutes: i64) -> bool {
        if self.overlaps(other) {
            return true;
        }
        if other.start >= self.end {
            self.gap_to(other) < buffer_minutes
        } else {
            other.gap_to(self) < buffer_minutes
        }
    }
}

/// Scheduling state of a task, as the engine is allowed to see it. A
/// `Locked` placement carries its interval as an immovable fact; only
/// `Auto` placements are ever rewritten.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Unscheduled,
    Locked(TimeSlot),
    Auto { slot: TimeSlot, score: Option<f64> },
}

impl Placement {
    pub fn slot(&self) -> Option<TimeSlot> {
        match self {
            Placement::Unscheduled => None,
            Placement::Locked(slot) => Some(*slot),
            Placement::Auto { slot, .. } => Some(*slot),
        }
    }
}

pub fn placement_of(task: &TaskRecord) -> AppResult<Placement> {
    match (&task.scheduled_start_at, &task.scheduled_end_at) {
        (Some(start_raw), Some(end_raw)) => {
            let slot = TimeSlot::new(parse_datetime(start_raw)?, parse_datetime(end_raw)?)?;
            if task.schedule_locked {
                Ok(Placement::Locked(slot))
            } else {
                Ok(Placement::Auto {
                    slot,
                    score: task.schedule_score,
                })
            }
        }
        _ => Ok(Placement::Unscheduled),
    }
}
