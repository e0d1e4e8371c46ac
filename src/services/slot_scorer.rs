use chrono::{DateTime, FixedOffset};

use crate::models::settings::AutoScheduleSettings;
use crate::models::task::{EnergyLevel, PreferredTime};
use crate::services::schedule_utils::{self, TimeSlot};

const BASE_SCORE: f64 = 50.0;
const PREFERRED_TIME_BONUS: f64 = 20.0;
const ENERGY_FIT_BONUS: f64 = 15.0;
const URGENCY_BONUS: f64 = 25.0;
const PRIORITY_WEIGHT: f64 = 2.0;

const MORNING_END_MINUTE: i64 = 12 * 60;
const AFTERNOON_END_MINUTE: i64 = 17 * 60;

/// Days of remaining slack over which due-date pressure fades to zero.
const URGENCY_HORIZON_MINUTES: f64 = 7.0 * 24.0 * 60.0;

/// Desirability of placing a task into `slot`. Pure and deterministic:
/// identical inputs always produce the identical score. Candidates ending
/// after the due date must be filtered out before scoring; the urgency
/// term assumes non-negative slack.
pub fn score_candidate(
    slot: &TimeSlot,
    energy_level: Option<EnergyLevel>,
    preferred_time: Option<PreferredTime>,
    due_at: Option<DateTime<FixedOffset>>,
    priority: i64,
    settings: &AutoScheduleSettings,
) -> f64 {
    let start_minute = schedule_utils::minutes_from_midnight(slot.start());

    let mut score = BASE_SCORE;

    if let Some(preferred) = preferred_time {
        if time_bucket(start_minute) == preferred {
            score += PREFERRED_TIME_BONUS;
        }
    }

    if let Some(energy) = energy_level {
        score += ENERGY_FIT_BONUS * energy_fit(energy, workday_fraction(start_minute, settings));
    }

    if let Some(due) = due_at {
        let slack = due.signed_duration_since(slot.end()).num_minutes().max(0) as f64;
        let pressure = 1.0 - (slack / URGENCY_HORIZON_MINUTES).clamp(0.0, 1.0);
        score += URGENCY_BONUS * pressure;
    }

    score + PRIORITY_WEIGHT * priority as f64
}

fn time_bucket(start_minute: i64) -> PreferredTime {
    if start_minute < MORNING_END_MINUTE {
        PreferredTime::Morning
    } else if start_minute < AFTERNOON_END_MINUTE {
        PreferredTime::Afternoon
    } else {
        PreferredTime::Evening
    }
}

/// Position of a start time inside the work window, 0.0 at the window
/// start and 1.0 at its end.
fn workday_fraction(start_minute: i64, settings: &AutoScheduleSettings) -> f64 {
    let span = settings.work_minutes_per_day();
    if span <= 0 {
        return 0.0;
    }
    let offset = start_minute - i64::from(settings.work_start_minute);
    (offset as f64 / span as f64).clamp(0.0, 1.0)
}

/// High-energy tasks fit best early in the work day, low-energy tasks
/// late, medium-energy tasks mid-window.
fn energy_fit(energy: EnergyLevel, fraction: f64) -> f64 {
    match energy {
        EnergyLevel::High => 1.0 - fraction,
        EnergyLevel::Low => fraction,
        EnergyLevel::Medium => 1.0 - (fraction - 0.5).abs() * 2.0,
    }
}
