use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BreakViolationKind {
    InsufficientBreak,
    TooLongContinuous,
    NoLunchBreak,
}

impl BreakViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakViolationKind::InsufficientBreak => "insufficient_break",
            BreakViolationKind::TooLongContinuous => "too_long_continuous",
            BreakViolationKind::NoLunchBreak => "no_lunch_break",
        }
    }
}

impl fmt::Display for BreakViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BreakViolationKind {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "insufficient_break" => Ok(BreakViolationKind::InsufficientBreak),
            "too_long_continuous" => Ok(BreakViolationKind::TooLongContinuous),
            "no_lunch_break" => Ok(BreakViolationKind::NoLunchBreak),
            other => Err(format!("unsupported break violation kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BreakSeverity {
    Low,
    Medium,
    High,
}

impl BreakSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakSeverity::Low => "low",
            BreakSeverity::Medium => "medium",
            BreakSeverity::High => "high",
        }
    }

    /// Penalty weight used by the compliance score.
    pub fn weight(&self) -> i64 {
        match self {
            BreakSeverity::Low => 1,
            BreakSeverity::Medium => 2,
            BreakSeverity::High => 3,
        }
    }
}

impl fmt::Display for BreakSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BreakSuggestionKind {
    ShortBreak,
    LongBreak,
    Lunch,
}

impl BreakSuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakSuggestionKind::ShortBreak => "short_break",
            BreakSuggestionKind::LongBreak => "long_break",
            BreakSuggestionKind::Lunch => "lunch",
        }
    }
}

impl fmt::Display for BreakSuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An audit finding over a placed schedule. Produced fresh on every audit
/// call, never persisted; task ids are referenced by value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BreakViolation {
    pub kind: BreakViolationKind,
    pub task_ids: Vec<String>,
    pub start_at: String,
    pub end_at: String,
    pub description: String,
    pub severity: BreakSeverity,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BreakSuggestion {
    pub kind: BreakSuggestionKind,
    pub suggested_at: String,
    pub duration_minutes: i64,
    pub reason: String,
    pub priority: BreakSeverity,
}
