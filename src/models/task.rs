use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

impl EnergyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyLevel::Low => "low",
            EnergyLevel::Medium => "medium",
            EnergyLevel::High => "high",
        }
    }
}

impl fmt::Display for EnergyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for EnergyLevel {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "low" => Ok(EnergyLevel::Low),
            "medium" => Ok(EnergyLevel::Medium),
            "high" => Ok(EnergyLevel::High),
            other => Err(format!("unsupported energy level: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PreferredTime {
    Morning,
    Afternoon,
    Evening,
}

impl PreferredTime {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferredTime::Morning => "morning",
            PreferredTime::Afternoon => "afternoon",
            PreferredTime::Evening => "evening",
        }
    }
}

impl fmt::Display for PreferredTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PreferredTime {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "morning" => Ok(PreferredTime::Morning),
            "afternoon" => Ok(PreferredTime::Afternoon),
            "evening" => Ok(PreferredTime::Evening),
            other => Err(format!("unsupported preferred time: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Completed, in-progress and cancelled tasks are never rescheduled.
    pub fn is_schedulable(&self) -> bool {
        matches!(self, TaskStatus::Todo)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "todo" => Ok(TaskStatus::Todo),
            "in-progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(format!("unsupported task status: {other}")),
        }
    }
}

/// A task as exchanged with the persistence layer. All timestamps are
/// RFC3339 strings in a single caller-normalized offset; the scheduling
/// core parses them on the way in and writes them back on the way out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub priority: i64,
    pub duration_minutes: i64,
    #[serde(default)]
    pub energy_level: Option<EnergyLevel>,
    #[serde(default)]
    pub preferred_time: Option<PreferredTime>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub not_before_at: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_rule: Option<String>,
    #[serde(default)]
    pub is_auto_scheduled: bool,
    #[serde(default)]
    pub schedule_locked: bool,
    #[serde(default)]
    pub scheduled_start_at: Option<String>,
    #[serde(default)]
    pub scheduled_end_at: Option<String>,
    #[serde(default)]
    pub schedule_score: Option<f64>,
    #[serde(default)]
    pub last_scheduled_at: Option<String>,
}

impl TaskRecord {
    pub fn is_scheduled(&self) -> bool {
        self.scheduled_start_at.is_some() && self.scheduled_end_at.is_some()
    }

    /// Eligible for automatic placement: opted in, not pinned by the
    /// user, and still open.
    pub fn is_auto_candidate(&self) -> bool {
        self.is_auto_scheduled && !self.schedule_locked && self.status.is_schedulable()
    }

    pub fn clear_placement(&mut self) {
        self.scheduled_start_at = None;
        self.scheduled_end_at = None;
        self.schedule_score = None;
    }
}
