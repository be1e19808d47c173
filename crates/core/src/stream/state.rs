//! Mutable record describing the current (or most recent) execution.

use crate::logs::LogBuffer;
use chrono::{DateTime, Utc};
use cm_protocol::{ExecutionStatus, StepProgress};
use std::collections::BTreeMap;
use std::time::Duration;

/// Everything the console knows about one execution.
///
/// Owned by [`ExecutionStream`](crate::stream::ExecutionStream) and reset to
/// the idle baseline whenever a new execution starts. The log buffer keeps
/// its id sequence across resets.
#[derive(Debug, Clone)]
pub struct ExecutionStreamState {
    pub status: ExecutionStatus,
    /// Set once the backend acknowledges the start.
    pub execution_id: Option<u64>,
    pub process_name: Option<String>,
    pub variables: BTreeMap<String, String>,
    pub started_at: Option<DateTime<Utc>>,
    /// `None` while the execution is live.
    pub ended_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Last parsed step marker. Sticky until the next reset.
    pub progress: Option<StepProgress>,
    pub logs: LogBuffer,
}

impl ExecutionStreamState {
    pub fn new(max_logs: usize) -> Self {
        Self {
            status: ExecutionStatus::Idle,
            execution_id: None,
            process_name: None,
            variables: BTreeMap::new(),
            started_at: None,
            ended_at: None,
            last_error: None,
            progress: None,
            logs: LogBuffer::new(max_logs),
        }
    }

    /// Return to the idle baseline: empty logs, every optional field cleared.
    pub fn reset(&mut self) {
        self.status = ExecutionStatus::Idle;
        self.execution_id = None;
        self.process_name = None;
        self.variables.clear();
        self.started_at = None;
        self.ended_at = None;
        self.last_error = None;
        self.progress = None;
        self.logs.clear();
    }

    /// Elapsed time from `started_at` to `ended_at`, or to `now` while live.
    pub fn duration_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        let started = self.started_at?;
        let ended = self.ended_at.unwrap_or(now);
        (ended - started).to_std().ok()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_at(Utc::now())
    }
}

impl Default for ExecutionStreamState {
    fn default() -> Self {
        Self::new(cm_protocol::DEFAULT_MAX_LOGS)
    }
}

/// Format a duration as `Xm Ys`, or `Ys` under a minute.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (minutes, seconds) = (secs / 60, secs % 60);
    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
