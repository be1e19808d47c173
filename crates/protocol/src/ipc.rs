//! Communication protocol between the console UI and the stream controller.
//!
//! This module defines the message types for asynchronous communication
//! between the TUI (user interface) and the Core (stream controller).
//!
//! The protocol follows an Operation/Event pattern:
//! - `Op`: Commands sent from TUI to Core
//! - `Event`: State changes sent from Core to TUI
//!
//! Every `Op` and every transport event is handled by one serialized loop in
//! the core, so the order of `Event`s matches the order in which the
//! underlying stream messages arrived.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::execution_models::{ExecutionLogEntry, ExecutionStatus, StepProgress};

/// Operations sent from the UI (TUI) to the Core logic.
///
/// Uses tagged enum serialization for TypeScript compatibility:
/// ```json
/// {
///   "type": "startExecution",
///   "payload": {
///     "process_id": 42,
///     "variables": { "topic": "AI" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Op {
    /// Start executing a process and stream its output.
    ///
    /// Any stream that is still open is closed first.
    StartExecution {
        process_id: u64,
        #[serde(default)]
        variables: BTreeMap<String, String>,
    },

    /// Send a stop signal for the current execution and drop the stream.
    StopExecution,

    /// Empty the log buffer.
    ///
    /// While an execution is live only the buffer is emptied; otherwise the
    /// whole execution record returns to idle.
    ClearLogs,

    /// Shut down the controller. The stream is closed.
    Shutdown,
}

/// Events sent from the Core logic to the UI (TUI).
///
/// Uses tagged enum serialization for TypeScript compatibility:
/// ```json
/// {
///   "type": "statusChanged",
///   "payload": {
///     "status": "running",
///     "execution_id": 7,
///     "process_name": "Research"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// Execution status or its descriptive fields changed.
    StatusChanged {
        status: ExecutionStatus,
        execution_id: Option<u64>,
        process_name: Option<String>,
        started_at: Option<chrono::DateTime<chrono::Utc>>,
        ended_at: Option<chrono::DateTime<chrono::Utc>>,
        error: Option<String>,
    },

    /// A new line was appended to the log buffer.
    LogAppended { entry: ExecutionLogEntry },

    /// The log buffer was emptied.
    LogsCleared,

    /// Step progress changed (or was reset to `None` by a new start).
    ProgressUpdated { progress: Option<StepProgress> },

    /// The stream connection opened, closed or reported an error.
    ConnectionChanged {
        connected: bool,
        error: Option<String>,
    },

    /// The backend reported completion. Emitted once per execution.
    ExecutionCompleted { execution_id: u64 },

    /// The backend reported a failure. Emitted once per execution.
    ExecutionFailed { execution_id: u64, error: String },

    /// The start request itself failed; no stream was opened.
    StartFailed { process_id: u64, error: String },
}
