use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::settings::AutoScheduleSettings;
use crate::models::task::{EnergyLevel, PreferredTime, TaskRecord};
use crate::services::schedule_utils::{self, TimeSlot};
use crate::services::slot_scorer;

/// Days searched past "now" for tasks without a due date. A due date can
/// only truncate the scan, never extend it.
pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 30;

/// Externally sourced calendar busy time (synced events, expanded
/// recurrences) the engine must plan around.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusyInterval {
    pub id: String,
    pub start_at: String,
    pub end_at: String,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOutcome {
    pub tasks: Vec<TaskRecord>,
    /// Candidates for which no feasible interval exists before their due
    /// date or within the look-ahead horizon. Not an error condition.
    pub unplaced_task_ids: Vec<String>,
}

struct PendingTask {
    index: usize,
    id: String,
    duration_minutes: i64,
    priority: i64,
    energy_level: Option<EnergyLevel>,
    preferred_time: Option<PreferredTime>,
    due_at: Option<DateTime<FixedOffset>>,
    not_before_at: Option<DateTime<FixedOffset>>,
}

/// Greedy forward-scanning placement engine. Tasks are placed one at a
/// time, urgent ones first, each into the highest-scoring interval of the
/// first day that has any feasible interval. A heuristic, not an exact
/// solver; callers depend on the first-feasible-day determinism.
pub struct SchedulingEngine {
    lookahead_days: i64,
}

impl SchedulingEngine {
    pub fn new(lookahead_days: Option<i64>) -> Self {
        Self {
            lookahead_days: lookahead_days.unwrap_or(DEFAULT_LOOKAHEAD_DAYS).max(1),
        }
    }

    /// Place every auto-schedule candidate in `tasks` around the locked
    /// placements and busy intervals. Non-candidates pass through
    /// untouched. One unplaceable task never aborts the batch.
    pub fn schedule_multiple_tasks(
        &self,
        tasks: Vec<TaskRecord>,
        locked_tasks: &[TaskRecord],
        settings: &AutoScheduleSettings,
        busy_intervals: &[BusyInterval],
        now: DateTime<FixedOffset>,
    ) -> AppResult<ScheduleOutcome> {
        settings.validate()?;

        let mut tasks = tasks;
        let mut obstacles = collect_obstacles(locked_tasks, busy_intervals)?;

        let mut pending = Vec::new();
        for (index, task) in tasks.iter().enumerate() {
            if !task.is_auto_candidate() {
                continue;
            }
            if task.duration_minutes <= 0 {
                return Err(AppError::validation_with_details(
                    "task duration must be positive",
                    json!({"taskId": task.id, "durationMinutes": task.duration_minutes}),
                ));
            }
            pending.push(PendingTask {
                index,
                id: task.id.clone(),
                duration_minutes: task.duration_minutes,
                priority: task.priority,
                energy_level: task.energy_level,
                preferred_time: task.preferred_time,
                due_at: schedule_utils::parse_optional_datetime(task.due_at.as_ref())?,
                not_before_at: schedule_utils::parse_optional_datetime(
                    task.not_before_at.as_ref(),
                )?,
            });
        }

        pending.sort_by(order_for_placement);

        let mut unplaced_task_ids = Vec::new();
        for item in &pending {
            match self.find_best_slot(item, &obstacles, settings, now)? {
                Some((slot, score)) => {
                    let task = &mut tasks[item.index];
                    task.scheduled_start_at =
                        Some(schedule_utils::format_datetime(slot.start()));
                    task.scheduled_end_at = Some(schedule_utils::format_datetime(slot.end()));
                    task.schedule_score = Some(score);
                    task.last_scheduled_at = Some(schedule_utils::format_datetime(now));
                    debug!(
                        target: "app::scheduler",
                        task_id = %item.id,
                        start = %task.scheduled_start_at.as_deref().unwrap_or_default(),
                        score,
                        "task placed"
                    );
                    obstacles.push(slot);
                }
                None => {
                    debug!(
                        target: "app::scheduler",
                        task_id = %item.id,
                        "no feasible interval before due date or horizon"
                    );
                    unplaced_task_ids.push(item.id.clone());
                }
            }
        }

        info!(
            target: "app::scheduler",
            placed = pending.len() - unplaced_task_ids.len(),
            unplaced = unplaced_task_ids.len(),
            "placement pass finished"
        );

        Ok(ScheduleOutcome {
            tasks,
            unplaced_task_ids,
        })
    }

    /// Scan forward day by day; the first work day offering any feasible
    /// interval wins, and the best-scoring interval of that day is taken.
    fn find_best_slot(
        &self,
        task: &PendingTask,
        obstacles: &[TimeSlot],
        settings: &AutoScheduleSettings,
        now: DateTime<FixedOffset>,
    ) -> AppResult<Option<(TimeSlot, f64)>> {
        let search_from = match task.not_before_at {
            Some(not_before) if not_before > now => not_before,
            _ => now,
        };

        for day_offset in 0..self.lookahead_days {
            let day = search_from + Duration::days(day_offset);
            let window_start = schedule_utils::build_day_time(
                day,
                schedule_utils::to_naive_time(settings.work_start_minute),
            );

            if let Some(due) = task.due_at {
                // Later days only start later; the scan is over.
                if window_start >= due {
                    break;
                }
            }

            if !settings.is_work_day(day.weekday().num_days_from_monday()) {
                continue;
            }

            let window_end = schedule_utils::build_day_time(
                day,
                schedule_utils::to_naive_time(settings.work_end_minute),
            );

            let mut earliest = window_start;
            if day_offset == 0 && search_from > earliest {
                earliest = schedule_utils::round_up_to_increment(
                    search_from,
                    settings.slot_increment_minutes,
                )?;
            }

            let best = self.scan_day(task, earliest, window_end, obstacles, settings)?;
            if best.is_some() {
                return Ok(best);
            }
        }

        Ok(None)
    }

    fn scan_day(
        &self,
        task: &PendingTask,
        earliest: DateTime<FixedOffset>,
        window_end: DateTime<FixedOffset>,
        obstacles: &[TimeSlot],
        settings: &AutoScheduleSettings,
    ) -> AppResult<Option<(TimeSlot, f64)>> {
        let mut best: Option<(TimeSlot, f64)> = None;
        let mut cursor = earliest;

        loop {
            let end = schedule_utils::add_minutes(cursor, task.duration_minutes)?;
            if end > window_end {
                break;
            }
            if let Some(due) = task.due_at {
                if end > due {
                    break;
                }
            }

            let candidate = TimeSlot::new(cursor, end)?;
            let blocked = obstacles
                .iter()
                .any(|obstacle| candidate.conflicts_with(obstacle, settings.buffer_minutes));
            if !blocked {
                let score = slot_scorer::score_candidate(
                    &candidate,
                    task.energy_level,
                    task.preferred_time,
                    task.due_at,
                    task.priority,
                    settings,
                );
                // Strict comparison keeps the earlier start on ties.
                let better = match &best {
                    Some((_, best_score)) => score > *best_score,
                    Option::None => true,
                };
                if better {
                    best = Some((candidate, score));
                }
            }

            cursor = schedule_utils::add_minutes(cursor, settings.slot_increment_minutes)?;
        }

        Ok(best)
    }
}

fn collect_obstacles(
    locked_tasks: &[TaskRecord],
    busy_intervals: &[BusyInterval],
) -> AppResult<Vec<TimeSlot>> {
    let mut obstacles = Vec::new();
    for task in locked_tasks {
        if let Some(slot) = schedule_utils::placement_of(task)?.slot() {
            obstacles.push(slot);
        }
    }
    for busy in busy_intervals {
        obstacles.push(TimeSlot::new(
            schedule_utils::parse_datetime(&busy.start_at)?,
            schedule_utils::parse_datetime(&busy.end_at)?,
        )?);
    }
    Ok(obstacles)
}

/// Ascending due date (nulls last), then descending priority, then
/// ascending duration, with the id as a final total-order tie-break.
fn order_for_placement(a: &PendingTask, b: &PendingTask) -> Ordering {
    compare_due(a.due_at, b.due_at)
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.duration_minutes.cmp(&b.duration_minutes))
        .then_with(|| a.id.cmp(&b.id))
}

fn compare_due(a: Option<DateTime<FixedOffset>>, b: Option<DateTime<FixedOffset>>) -> Ordering {
    match (a, b) {
        (Some(a_due), Some(b_due)) => a_due.cmp(&b_due),
        (Some(_), Option::None) => Ordering::Less,
        (Option::None, Some(_)) => Ordering::Greater,
        (Option::None, Option::None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn dt(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(0).expect("offset");
        let naive = NaiveDate::from_ymd_opt(2025, 6, day)
            .expect("valid date")
            .and_hms_opt(hour, minute, 0)
            .expect("valid time");
        offset
            .from_local_datetime(&naive)
            .single()
            .expect("valid datetime")
    }

    fn pending(id: &str, due: Option<DateTime<FixedOffset>>, priority: i64, duration: i64) -> PendingTask {
        PendingTask {
            index: 0,
            id: id.to_string(),
            duration_minutes: duration,
            priority,
            energy_level: None,
            preferred_time: None,
            due_at: due,
            not_before_at: None,
        }
    }

    #[test]
    fn placement_order_puts_urgent_high_priority_short_tasks_first() {
        let mut items = vec![
            pending("no-due", None, 5, 30),
            pending("late-due", Some(dt(6, 17, 0)), 1, 60),
            pending("early-due-long", Some(dt(4, 17, 0)), 2, 90),
            pending("early-due-short", Some(dt(4, 17, 0)), 2, 30),
            pending("early-due-priority", Some(dt(4, 17, 0)), 4, 120),
        ];
        items.sort_by(order_for_placement);

        let order: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "early-due-priority",
                "early-due-short",
                "early-due-long",
                "late-due",
                "no-due"
            ]
        );
    }

    #[test]
    fn identical_sort_keys_fall_back_to_id_order() {
        let mut items = vec![
            pending("beta", None, 2, 30),
            pending("alpha", None, 2, 30),
        ];
        items.sort_by(order_for_placement);
        assert_eq!(items[0].id, "alpha");
    }
}
