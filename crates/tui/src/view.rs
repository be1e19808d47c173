//! UI-side mirror of the execution state.
//!
//! The core publishes fine-grained events; `ConsoleView` folds them back into
//! the same `ExecutionStreamState` record the controller owns, plus the
//! connection fields the status panel shows.

use cm_core::stream::ExecutionStreamState;
use cm_protocol::ExecutionLogEntry;

#[derive(Debug, Clone)]
pub struct ConsoleView {
    pub state: ExecutionStreamState,
    /// Whether the execution stream is currently open.
    pub connected: bool,
    /// Transport error, shown independently of the execution status.
    pub connection_error: Option<String>,
    /// Only show entries flagged as important.
    pub important_only: bool,
}

impl ConsoleView {
    pub fn new(max_logs: usize) -> Self {
        Self {
            state: ExecutionStreamState::new(max_logs),
            connected: false,
            connection_error: None,
            important_only: false,
        }
    }

    /// Entries to display, honouring the important-only filter.
    pub fn visible_logs(&self) -> Vec<&ExecutionLogEntry> {
        if self.important_only {
            self.state.logs.important().collect()
        } else {
            self.state.logs.iter().collect()
        }
    }
}

impl Default for ConsoleView {
    fn default() -> Self {
        Self::new(cm_protocol::DEFAULT_MAX_LOGS)
    }
}
