//! Integration tests for break auditing, enforcement and the compliance
//! score, including the canonical policy examples.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone};
use dayplan_core::models::breaks::{BreakSeverity, BreakViolationKind};
use dayplan_core::models::settings::AutoScheduleSettings;
use dayplan_core::models::task::{TaskRecord, TaskStatus};
use dayplan_core::services::break_service;
use dayplan_core::services::schedule_utils;

fn dt(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(0).expect("offset");
    let naive = NaiveDate::from_ymd_opt(2025, 6, 2)
        .expect("valid date")
        .and_hms_opt(hour, minute, 0)
        .expect("valid time");
    offset
        .from_local_datetime(&naive)
        .single()
        .expect("valid datetime")
}

fn scheduled_task(id: &str, start: DateTime<FixedOffset>, duration: i64) -> TaskRecord {
    TaskRecord {
        id: id.to_string(),
        title: format!("Task {id}"),
        status: TaskStatus::Todo,
        priority: 3,
        duration_minutes: duration,
        energy_level: None,
        preferred_time: None,
        due_at: None,
        not_before_at: None,
        is_recurring: false,
        recurrence_rule: None,
        is_auto_scheduled: true,
        schedule_locked: false,
        scheduled_start_at: Some(schedule_utils::format_datetime(start)),
        scheduled_end_at: Some(schedule_utils::format_datetime(
            start + Duration::minutes(duration),
        )),
        schedule_score: Some(60.0),
        last_scheduled_at: None,
    }
}

fn start_of(task: &TaskRecord) -> DateTime<FixedOffset> {
    schedule_utils::parse_datetime(task.scheduled_start_at.as_ref().expect("start set"))
        .expect("valid start")
}

#[test]
fn empty_schedule_yields_no_violations() {
    let settings = AutoScheduleSettings::default();
    let violations = break_service::validate_schedule_breaks(&[], &settings)
        .expect("audit of empty schedule should succeed");
    assert!(violations.is_empty());
}

#[test]
fn back_to_back_tasks_yield_one_high_severity_break_violation() {
    let settings = AutoScheduleSettings {
        min_break_minutes: 10,
        ..Default::default()
    };
    // Two 60-minute tasks with zero gap.
    let tasks = vec![
        scheduled_task("first", dt(9, 0), 60),
        scheduled_task("second", dt(10, 0), 60),
    ];

    let violations = break_service::validate_schedule_breaks(&tasks, &settings)
        .expect("audit should succeed");

    assert_eq!(violations.len(), 1);
    let violation = &violations[0];
    assert_eq!(violation.kind, BreakViolationKind::InsufficientBreak);
    assert_eq!(violation.severity, BreakSeverity::High, "a zero gap is severe");
    assert_eq!(
        violation.task_ids,
        vec!["first".to_string(), "second".to_string()]
    );
}

#[test]
fn four_back_to_back_blocks_yield_one_high_continuous_work_violation() {
    let settings = AutoScheduleSettings {
        min_break_minutes: 10,
        max_consecutive_hours: 3.0,
        ..Default::default()
    };
    // Four consecutive 90-minute tasks, 360 min total against a 180 min
    // limit: severity is high because 360 > 1.5 x 180.
    let tasks = vec![
        scheduled_task("one", dt(9, 0), 90),
        scheduled_task("two", dt(10, 30), 90),
        scheduled_task("three", dt(12, 0), 90),
        scheduled_task("four", dt(13, 30), 90),
    ];

    let violations = break_service::validate_schedule_breaks(&tasks, &settings)
        .expect("audit should succeed");

    let continuous: Vec<_> = violations
        .iter()
        .filter(|violation| violation.kind == BreakViolationKind::TooLongContinuous)
        .collect();
    assert_eq!(continuous.len(), 1);
    assert_eq!(continuous[0].severity, BreakSeverity::High);
    assert_eq!(
        continuous[0].task_ids,
        vec![
            "one".to_string(),
            "two".to_string(),
            "three".to_string(),
            "four".to_string()
        ]
    );
}

#[test]
fn continuous_work_just_over_the_limit_is_medium() {
    let settings = AutoScheduleSettings {
        min_break_minutes: 10,
        max_consecutive_hours: 3.0,
        ..Default::default()
    };
    // 200 min chained: over the 180 limit but under 270.
    let tasks = vec![
        scheduled_task("one", dt(9, 0), 100),
        scheduled_task("two", dt(10, 40), 100),
    ];

    let violations = break_service::validate_schedule_breaks(&tasks, &settings)
        .expect("audit should succeed");

    let continuous: Vec<_> = violations
        .iter()
        .filter(|violation| violation.kind == BreakViolationKind::TooLongContinuous)
        .collect();
    assert_eq!(continuous.len(), 1);
    assert_eq!(continuous[0].severity, BreakSeverity::Medium);
}

#[test]
fn crowded_lunch_window_yields_a_medium_violation() {
    let settings = AutoScheduleSettings {
        min_break_minutes: 10,
        ..Default::default()
    };
    let tasks = vec![
        scheduled_task("before", dt(9, 0), 60),
        scheduled_task("lunch-a", dt(11, 45), 60),
        scheduled_task("lunch-b", dt(13, 0), 30),
    ];

    let violations = break_service::validate_schedule_breaks(&tasks, &settings)
        .expect("audit should succeed");

    let lunch: Vec<_> = violations
        .iter()
        .filter(|violation| violation.kind == BreakViolationKind::NoLunchBreak)
        .collect();
    assert_eq!(lunch.len(), 1);
    assert_eq!(lunch[0].severity, BreakSeverity::Medium);
    assert_eq!(
        lunch[0].task_ids,
        vec!["lunch-a".to_string(), "lunch-b".to_string()]
    );
}

#[test]
fn single_task_spanning_lunch_is_not_flagged() {
    let settings = AutoScheduleSettings {
        min_break_minutes: 10,
        ..Default::default()
    };
    // One long task across the whole lunch window: documented behavior is
    // no violation.
    let tasks = vec![scheduled_task("marathon", dt(11, 30), 150)];

    let violations = break_service::validate_schedule_breaks(&tasks, &settings)
        .expect("audit should succeed");
    assert!(violations
        .iter()
        .all(|violation| violation.kind != BreakViolationKind::NoLunchBreak));
}

#[test]
fn lunch_window_with_a_real_gap_is_fine() {
    let settings = AutoScheduleSettings {
        min_break_minutes: 10,
        ..Default::default()
    };
    let tasks = vec![
        scheduled_task("lunch-a", dt(11, 45), 30),
        scheduled_task("lunch-b", dt(13, 0), 30),
    ];

    let violations = break_service::validate_schedule_breaks(&tasks, &settings)
        .expect("audit should succeed");
    assert!(violations
        .iter()
        .all(|violation| violation.kind != BreakViolationKind::NoLunchBreak));
}

#[test]
fn enforcement_fixes_the_continuous_work_example() {
    let settings = AutoScheduleSettings {
        min_break_minutes: 10,
        max_consecutive_hours: 3.0,
        ..Default::default()
    };
    let tasks = vec![
        scheduled_task("one", dt(9, 0), 90),
        scheduled_task("two", dt(10, 30), 90),
        scheduled_task("three", dt(12, 0), 90),
        scheduled_task("four", dt(13, 30), 90),
    ];
    let original_starts: Vec<DateTime<FixedOffset>> = tasks.iter().map(start_of).collect();

    let enforced = break_service::enforce_breaks_in_schedule(tasks, &settings)
        .expect("enforcement should succeed");

    // Re-auditing the enforced schedule finds nothing.
    let violations = break_service::validate_schedule_breaks(&enforced, &settings)
        .expect("audit should succeed");
    assert!(
        violations.is_empty(),
        "enforced schedule still has violations: {violations:?}"
    );

    // Relative order is kept and no task moved earlier.
    let new_starts: Vec<DateTime<FixedOffset>> = enforced.iter().map(start_of).collect();
    for (original, shifted) in original_starts.iter().zip(new_starts.iter()) {
        assert!(shifted >= original, "a task moved earlier");
    }
    let mut sorted = new_starts.clone();
    sorted.sort();
    assert_eq!(new_starts, sorted, "relative order changed");

    // Durations are untouched.
    for task in &enforced {
        let start = start_of(task);
        let end =
            schedule_utils::parse_datetime(task.scheduled_end_at.as_ref().unwrap()).unwrap();
        assert_eq!(end.signed_duration_since(start).num_minutes(), 90);
    }
}

#[test]
fn enforcement_is_idempotent() {
    let settings = AutoScheduleSettings {
        min_break_minutes: 10,
        max_consecutive_hours: 3.0,
        ..Default::default()
    };
    let tasks = vec![
        scheduled_task("one", dt(9, 0), 90),
        scheduled_task("two", dt(10, 30), 90),
        scheduled_task("three", dt(12, 0), 90),
        scheduled_task("four", dt(13, 30), 90),
    ];

    let first_pass = break_service::enforce_breaks_in_schedule(tasks, &settings)
        .expect("enforcement should succeed");
    let second_pass = break_service::enforce_breaks_in_schedule(first_pass.clone(), &settings)
        .expect("enforcement should succeed");

    assert_eq!(first_pass, second_pass);
}

#[test]
fn compliant_schedule_is_left_untouched() {
    let settings = AutoScheduleSettings {
        min_break_minutes: 10,
        max_consecutive_hours: 3.0,
        ..Default::default()
    };
    let tasks = vec![
        scheduled_task("one", dt(9, 0), 60),
        scheduled_task("two", dt(10, 30), 60),
    ];

    let enforced = break_service::enforce_breaks_in_schedule(tasks.clone(), &settings)
        .expect("enforcement should succeed");
    assert_eq!(enforced, tasks);
}

#[test]
fn compliance_score_reflects_severity_weights() {
    let settings = AutoScheduleSettings {
        min_break_minutes: 10,
        enforce_breaks: true,
        ..Default::default()
    };
    // One high-severity violation over two audited tasks: penalty 3 of a
    // possible 6.
    let tasks = vec![
        scheduled_task("first", dt(9, 0), 60),
        scheduled_task("second", dt(10, 0), 60),
    ];

    let score = break_service::get_break_compliance_score(&tasks, &settings)
        .expect("score should succeed");
    assert_eq!(score, 50);
}

#[test]
fn compliance_score_is_hundred_without_enforcement_or_tasks() {
    let relaxed = AutoScheduleSettings {
        enforce_breaks: false,
        min_break_minutes: 10,
        ..Default::default()
    };
    let violating = vec![
        scheduled_task("first", dt(9, 0), 60),
        scheduled_task("second", dt(10, 0), 60),
    ];
    assert_eq!(
        break_service::get_break_compliance_score(&violating, &relaxed)
            .expect("score should succeed"),
        100
    );

    let strict = AutoScheduleSettings::default();
    assert_eq!(
        break_service::get_break_compliance_score(&[], &strict).expect("score should succeed"),
        100
    );
}
