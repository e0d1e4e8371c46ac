use tracing::debug;

use crate::error::AppResult;
use crate::models::breaks::{
    BreakSeverity, BreakSuggestion, BreakSuggestionKind, BreakViolation, BreakViolationKind,
};
use crate::models::settings::AutoScheduleSettings;
use crate::models::task::TaskRecord;
use crate::services::schedule_utils::{self, Placement, TimeSlot};

pub const LUNCH_WINDOW_START_MINUTE: i64 = 11 * 60 + 30;
pub const LUNCH_WINDOW_END_MINUTE: i64 = 13 * 60 + 30;

const LUNCH_MIN_GAP_MINUTES: i64 = 30; // Qualifying lunch gap
const LUNCH_BREAK_MINUTES: i64 = 30; // Suggested lunch duration
const SEVERE_GAP_MINUTES: i64 = 5;
const SEVERE_OVERRUN_FACTOR: f64 = 1.5;

struct ScheduledEntry {
    index: usize,
    task_id: String,
    title: String,
    slot: TimeSlot,
    locked: bool,
}

/// Tasks with both scheduled endpoints, ascending by start time with the
/// task id as a stable tie-break.
fn scheduled_entries(tasks: &[TaskRecord]) -> AppResult<Vec<ScheduledEntry>> {
    let mut entries = Vec::new();
    for (index, task) in tasks.iter().enumerate() {
        let (slot, locked) = match schedule_utils::placement_of(task)? {
            Placement::Locked(slot) => (slot, true),
            Placement::Auto { slot, .. } => (slot, false),
            Placement::Unscheduled => continue,
        };
        entries.push(ScheduledEntry {
            index,
            task_id: task.id.clone(),
            title: task.title.clone(),
            slot,
            locked,
        });
    }
    entries.sort_by(|a, b| {
        a.slot
            .start()
            .cmp(&b.slot.start())
            .then_with(|| a.task_id.cmp(&b.task_id))
    });
    Ok(entries)
}

/// Audit a placed schedule against the break policy. Violations are data,
/// not errors: an out-of-compliance schedule is a valid outcome. Emits
/// insufficient-break findings first, then continuous-work findings, then
/// the lunch finding; a task may appear in more than one.
pub fn validate_schedule_breaks(
    tasks: &[TaskRecord],
    settings: &AutoScheduleSettings,
) -> AppResult<Vec<BreakViolation>> {
    settings.validate()?;

    let entries = scheduled_entries(tasks)?;
    let mut violations = Vec::new();
    if entries.is_empty() {
        return Ok(violations);
    }

    collect_insufficient_breaks(&entries, settings, &mut violations);
    collect_continuous_work(&entries, settings, &mut violations);
    collect_missing_lunch(&entries, &mut violations);

    debug!(
        target: "app::breaks",
        scheduled = entries.len(),
        violations = violations.len(),
        "break audit finished"
    );

    Ok(violations)
}

fn collect_insufficient_breaks(
    entries: &[ScheduledEntry],
    settings: &AutoScheduleSettings,
    violations: &mut Vec<BreakViolation>,
) {
    for pair in entries.windows(2) {
        let gap = pair[0].slot.gap_to(&pair[1].slot);
        if gap < 0 || gap >= settings.min_break_minutes {
            continue;
        }
        let severity = if gap < SEVERE_GAP_MINUTES {
            BreakSeverity::High
        } else {
            BreakSeverity::Medium
        };
        violations.push(BreakViolation {
            kind: BreakViolationKind::InsufficientBreak,
            task_ids: vec![pair[0].task_id.clone(), pair[1].task_id.clone()],
            start_at: schedule_utils::format_datetime(pair[0].slot.end()),
            end_at: schedule_utils::format_datetime(pair[1].slot.start()),
            description: format!(
                "Only {} min between '{}' and '{}' where at least {} min of break is required",
                gap, pair[0].title, pair[1].title, settings.min_break_minutes
            ),
            severity,
            suggestion: format!(
                "Leave at least a {}-minute break after '{}'",
                settings.min_break_minutes, pair[0].title
            ),
        });
    }
}

fn collect_continuous_work(
    entries: &[ScheduledEntry],
    settings: &AutoScheduleSettings,
    violations: &mut Vec<BreakViolation>,
) {
    let limit = settings.max_consecutive_minutes();
    let mut block: Vec<&ScheduledEntry> = vec![&entries[0]];
    let mut block_minutes = entries[0].slot.duration_minutes();

    for entry in &entries[1..] {
        let gap = block
            .last()
            .expect("work block is never empty")
            .slot
            .gap_to(&entry.slot);
        if gap < settings.min_break_minutes {
            block.push(entry);
            block_minutes += entry.slot.duration_minutes();
        } else {
            close_work_block(&block, block_minutes, limit, settings, violations);
            block = vec![entry];
            block_minutes = entry.slot.duration_minutes();
        }
    }
    close_work_block(&block, block_minutes, limit, settings, violations);
}

fn close_work_block(
    block: &[&ScheduledEntry],
    block_minutes: i64,
    limit: i64,
    settings: &AutoScheduleSettings,
    violations: &mut Vec<BreakViolation>,
) {
    if block_minutes <= limit {
        return;
    }
    let severity = if block_minutes as f64 > limit as f64 * SEVERE_OVERRUN_FACTOR {
        BreakSeverity::High
    } else {
        BreakSeverity::Medium
    };
    let first = block.first().expect("work block is never empty");
    let last = block.last().expect("work block is never empty");
    violations.push(BreakViolation {
        kind: BreakViolationKind::TooLongContinuous,
        task_ids: block.iter().map(|entry| entry.task_id.clone()).collect(),
        start_at: schedule_utils::format_datetime(first.slot.start()),
        end_at: schedule_utils::format_datetime(last.slot.end()),
        description: format!(
            "{} min of continuous work across {} tasks exceeds the {} min limit",
            block_minutes,
            block.len(),
            limit
        ),
        severity,
        suggestion: format!(
            "Split this work block with a {}-minute break",
            settings.min_break_minutes * 2
        ),
    });
}

/// Two or more tasks starting inside 11:30-13:30 with no qualifying gap
/// among them. A single task spanning the whole window emits nothing;
/// that is the documented behavior, kept as-is.
fn collect_missing_lunch(entries: &[ScheduledEntry], violations: &mut Vec<BreakViolation>) {
    let lunch: Vec<&ScheduledEntry> = entries
        .iter()
        .filter(|entry| {
            let minute = schedule_utils::minutes_from_midnight(entry.slot.start());
            (LUNCH_WINDOW_START_MINUTE..=LUNCH_WINDOW_END_MINUTE).contains(&minute)
        })
        .collect();

    if lunch.len() < 2 {
        return;
    }
    let has_lunch_gap = lunch
        .windows(2)
        .any(|pair| pair[0].slot.gap_to(&pair[1].slot) >= LUNCH_MIN_GAP_MINUTES);
    if has_lunch_gap {
        return;
    }

    let first = lunch.first().expect("lunch group has at least two entries");
    let last = lunch.last().expect("lunch group has at least two entries");
    violations.push(BreakViolation {
        kind: BreakViolationKind::NoLunchBreak,
        task_ids: lunch.iter().map(|entry| entry.task_id.clone()).collect(),
        start_at: schedule_utils::format_datetime(first.slot.start()),
        end_at: schedule_utils::format_datetime(last.slot.end()),
        description: format!(
            "{} tasks fill the 11:30-13:30 window without a {}-minute lunch gap",
            lunch.len(),
            LUNCH_MIN_GAP_MINUTES
        ),
        severity: BreakSeverity::Medium,
        suggestion: "Keep a 30-minute lunch gap free in the midday window".to_string(),
    });
}

/// Push a chronologically ordered task chain forward until the break
/// policy holds: every gap reaches the minimum break, and a double-length
/// break lands wherever the continuous-work limit is hit. A single O(n)
/// sweep with a monotonically growing offset; order never changes and no
/// task ever moves earlier. Locked tasks are untouchable and do not
/// participate.
///
/// The sweep does not re-check external busy intervals after shifting, so
/// a shift can push a task onto calendar busy time the enforcer cannot
/// see. Callers that care must re-run placement afterwards.
pub fn enforce_breaks_in_schedule(
    tasks: Vec<TaskRecord>,
    settings: &AutoScheduleSettings,
) -> AppResult<Vec<TaskRecord>> {
    settings.validate()?;

    let mut tasks = tasks;
    let entries = scheduled_entries(&tasks)?;
    let movable: Vec<&ScheduledEntry> = entries.iter().filter(|entry| !entry.locked).collect();
    if movable.is_empty() {
        return Ok(tasks);
    }

    let limit = settings.max_consecutive_minutes();
    let long_break = settings.min_break_minutes * 2;
    let mut offset: i64 = 0;
    let mut block_minutes: i64 = 0;
    let mut shifts: Vec<(usize, i64)> = Vec::new();

    for (position, entry) in movable.iter().enumerate() {
        shifts.push((entry.index, offset));
        block_minutes += entry.slot.duration_minutes();

        let Some(next) = movable.get(position + 1) else {
            break;
        };
        // Both sides carry the same pending offset, so the effective gap
        // is the original one.
        let gap = entry.slot.gap_to(&next.slot);

        let mut required: i64 = 0;
        if gap < settings.min_break_minutes {
            required = settings.min_break_minutes - gap;
        }
        if block_minutes >= limit {
            if gap < long_break {
                required = required.max(long_break - gap);
            }
            block_minutes = 0;
        } else if gap >= settings.min_break_minutes {
            block_minutes = 0;
        }

        offset += required.max(0);
    }

    for (index, shift) in shifts {
        if shift == 0 {
            continue;
        }
        let slot = match schedule_utils::placement_of(&tasks[index])? {
            Placement::Auto { slot, .. } => slot,
            _ => continue,
        };
        let shifted = slot.shifted_by(shift)?;
        let task = &mut tasks[index];
        task.scheduled_start_at = Some(schedule_utils::format_datetime(shifted.start()));
        task.scheduled_end_at = Some(schedule_utils::format_datetime(shifted.end()));
    }

    debug!(
        target: "app::breaks",
        moved = movable.len(),
        total_shift = offset,
        "break enforcement sweep finished"
    );

    Ok(tasks)
}

/// Map violations to concrete remediation suggestions, one per finding.
pub fn suggest_breaks(
    violations: &[BreakViolation],
    settings: &AutoScheduleSettings,
) -> Vec<BreakSuggestion> {
    violations
        .iter()
        .map(|violation| match violation.kind {
            BreakViolationKind::InsufficientBreak => BreakSuggestion {
                kind: BreakSuggestionKind::ShortBreak,
                suggested_at: violation.start_at.clone(),
                duration_minutes: settings.min_break_minutes,
                reason: violation.description.clone(),
                priority: violation.severity,
            },
            BreakViolationKind::TooLongContinuous => BreakSuggestion {
                kind: BreakSuggestionKind::LongBreak,
                suggested_at: violation.end_at.clone(),
                duration_minutes: settings.min_break_minutes * 2,
                reason: violation.description.clone(),
                priority: violation.severity,
            },
            BreakViolationKind::NoLunchBreak => BreakSuggestion {
                kind: BreakSuggestionKind::Lunch,
                suggested_at: violation.start_at.clone(),
                duration_minutes: LUNCH_BREAK_MINUTES,
                reason: violation.description.clone(),
                priority: violation.severity,
            },
        })
        .collect()
}

/// 0-100 summary of how well the schedule satisfies break policy.
/// Severity weights are summed and normalized against the worst case of
/// three penalty points per audited task.
pub fn get_break_compliance_score(
    tasks: &[TaskRecord],
    settings: &AutoScheduleSettings,
) -> AppResult<i64> {
    if !settings.enforce_breaks {
        return Ok(100);
    }
    let scheduled_count = tasks.iter().filter(|task| task.is_scheduled()).count() as i64;
    if scheduled_count == 0 {
        return Ok(100);
    }

    let violations = validate_schedule_breaks(tasks, settings)?;
    let penalty: i64 = violations
        .iter()
        .map(|violation| violation.severity.weight())
        .sum();
    let max_penalty = 3 * scheduled_count;
    let ratio = 1.0 - penalty as f64 / max_penalty as f64;
    Ok(((100.0 * ratio).round() as i64).max(0))
}
