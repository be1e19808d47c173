//! Runtime execution state models.
//!
//! This module defines the structures describing one streamed execution as
//! seen by the console: its lifecycle status, the classified log lines it has
//! produced, and the best-effort step progress parsed from those lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle status of a streamed execution.
///
/// The status progresses through these states during normal execution:
/// Idle -> Connecting -> Running -> Completed
///
/// Terminal states:
/// - Completed: the backend reported success
/// - Failed: the start request failed or the backend reported an error
/// - Cancelled: the backend confirmed a stop request
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Nothing has been started, or the state was just reset.
    #[default]
    Idle,

    /// A start request was issued and the stream is being established.
    Connecting,

    /// The backend acknowledged the start and is producing output.
    Running,

    /// The execution finished successfully.
    Completed,

    /// The execution could not start or the backend reported an error.
    Failed,

    /// The backend confirmed that the execution was stopped.
    Cancelled,
}

impl ExecutionStatus {
    /// Returns `true` for `Completed`, `Failed` and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    /// Returns `true` while a stop request makes sense.
    pub fn is_active(self) -> bool {
        matches!(self, ExecutionStatus::Connecting | ExecutionStatus::Running)
    }

    /// Lowercase label used by badges and plain output.
    pub fn label(self) -> &'static str {
        match self {
            ExecutionStatus::Idle => "idle",
            ExecutionStatus::Connecting => "connecting",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Severity/category of a log line, derived from its text.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TS)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    #[default]
    Info,
    Error,
    Warning,
    Success,
    Progress,
}

impl LogCategory {
    /// Glyph shown in front of a line of this category.
    pub fn icon(self) -> &'static str {
        match self {
            LogCategory::Error => "❌",
            LogCategory::Warning => "⚠️",
            LogCategory::Success => "✅",
            LogCategory::Progress => "🔄",
            LogCategory::Info => "📋",
        }
    }
}

/// A single classified line of execution output.
///
/// Entries are created by the console when a line arrives (or is synthesized
/// locally), so `timestamp` is the arrival time, not the backend's emission
/// time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct ExecutionLogEntry {
    /// Monotonically increasing id, unique within one console session.
    pub id: u64,

    /// Instant the line was captured by the console.
    pub timestamp: DateTime<Utc>,

    /// Derived category.
    pub category: LogCategory,

    /// Trimmed line text.
    pub text: String,

    /// Whether the line matches a high-signal marker.
    ///
    /// Only used by the "important only" filter; it never affects ordering
    /// or retention.
    pub important: bool,
}

/// Step progress parsed from a `Step <n>/<m>: <description>` line.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct StepProgress {
    pub current_step: u32,
    pub total_steps: u32,
    pub step_description: String,
}

impl StepProgress {
    /// Completion percentage rounded to the nearest integer.
    ///
    /// Returns 0 when `total_steps` is 0 and never exceeds 100.
    pub fn percent(&self) -> u16 {
        if self.total_steps == 0 {
            return 0;
        }
        let ratio = f64::from(self.current_step) / f64::from(self.total_steps);
        (ratio * 100.0).round().clamp(0.0, 100.0) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal_and_active() {
        assert!(!ExecutionStatus::Idle.is_terminal());
        assert!(ExecutionStatus::Connecting.is_active());
        assert!(ExecutionStatus::Running.is_active());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Cancelled.is_terminal());
        assert!(!ExecutionStatus::Cancelled.is_active());
    }

    #[test]
    fn test_progress_percent() {
        let progress = StepProgress {
            current_step: 1,
            total_steps: 3,
            step_description: "loading".to_string(),
        };
        assert_eq!(progress.percent(), 33);

        let empty = StepProgress {
            current_step: 2,
            total_steps: 0,
            step_description: String::new(),
        };
        assert_eq!(empty.percent(), 0);

        let overshoot = StepProgress {
            current_step: 7,
            total_steps: 5,
            step_description: String::new(),
        };
        assert_eq!(overshoot.percent(), 100);
    }
}
