use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::breaks::{BreakSuggestion, BreakViolation};
use crate::models::settings::AutoScheduleSettings;
use crate::models::task::TaskRecord;
use crate::services::break_service;
use crate::services::schedule_utils;
use crate::services::scheduling_engine::{BusyInterval, ScheduleOutcome, SchedulingEngine};

/// Everything a full reschedule run produced, handed back to the caller
/// for persistence and user-facing reporting. Task order matches the
/// input.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleOutcome {
    pub tasks: Vec<TaskRecord>,
    pub unplaced_task_ids: Vec<String>,
    pub violations: Vec<BreakViolation>,
    pub suggestions: Vec<BreakSuggestion>,
    pub compliance_score: i64,
}

/// Orchestrates the "reschedule all" operation: partition the user's
/// tasks, clear stale placements, place candidates around locked tasks
/// and calendar busy time, optionally enforce break policy, then audit
/// the result.
///
/// The read-clear-place-write sequence is not safe against a second
/// concurrent run for the same user; callers must serialize runs, e.g.
/// with a per-user advisory lock held for the whole orchestration.
pub struct PlannerService {
    engine: SchedulingEngine,
}

impl PlannerService {
    pub fn new() -> Self {
        Self {
            engine: SchedulingEngine::new(None),
        }
    }

    pub fn with_engine(engine: SchedulingEngine) -> Self {
        Self { engine }
    }

    pub fn reschedule_all(
        &self,
        tasks: Vec<TaskRecord>,
        busy_intervals: &[BusyInterval],
        settings: &AutoScheduleSettings,
        now_at: &str,
    ) -> AppResult<RescheduleOutcome> {
        settings.validate()?;
        let now = schedule_utils::parse_datetime(now_at)?;

        let run_id = Uuid::new_v4();
        info!(
            target: "app::planner",
            %run_id,
            task_count = tasks.len(),
            busy_count = busy_intervals.len(),
            "starting full reschedule"
        );

        let mut tasks = tasks;
        let locked: Vec<TaskRecord> = tasks
            .iter()
            .filter(|task| task.schedule_locked)
            .cloned()
            .collect();
        let candidate_indexes: Vec<usize> = tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.is_auto_candidate())
            .map(|(index, _)| index)
            .collect();

        let mut candidates = Vec::with_capacity(candidate_indexes.len());
        for &index in &candidate_indexes {
            let mut candidate = tasks[index].clone();
            // Stale placements from earlier runs must not act as
            // obstacles for this one.
            candidate.clear_placement();
            candidates.push(candidate);
        }

        debug!(
            target: "app::planner",
            %run_id,
            candidates = candidates.len(),
            locked = locked.len(),
            "task partition ready"
        );

        let ScheduleOutcome {
            tasks: placed,
            unplaced_task_ids,
        } = self
            .engine
            .schedule_multiple_tasks(candidates, &locked, settings, busy_intervals, now)?;

        for (&index, task) in candidate_indexes.iter().zip(placed.into_iter()) {
            tasks[index] = task;
        }

        let tasks = if settings.enforce_breaks {
            break_service::enforce_breaks_in_schedule(tasks, settings)?
        } else {
            tasks
        };

        let violations = break_service::validate_schedule_breaks(&tasks, settings)?;
        let suggestions = break_service::suggest_breaks(&violations, settings);
        let compliance_score = break_service::get_break_compliance_score(&tasks, settings)?;

        info!(
            target: "app::planner",
            %run_id,
            unplaced = unplaced_task_ids.len(),
            violations = violations.len(),
            compliance_score,
            "reschedule finished"
        );

        Ok(RescheduleOutcome {
            tasks,
            unplaced_task_ids,
            violations,
            suggestions,
            compliance_score,
        })
    }
}

impl Default for PlannerService {
    fn default() -> Self {
        Self::new()
    }
}
