//! Event collection and custom assertion helpers.

use cm_protocol::{Event, ExecutionLogEntry, ExecutionStatus};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// Collect events until `stop` matches one (inclusive) or `timeout` passes.
#[allow(dead_code)]
pub async fn collect_events_until(
    rx: &mut UnboundedReceiver<Event>,
    timeout: Duration,
    stop: impl Fn(&Event) -> bool,
) -> Vec<Event> {
    let mut events = Vec::new();
    let deadline = tokio::time::Instant::now() + timeout;

    while let Ok(Some(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        let done = stop(&event);
        events.push(event);
        if done {
            break;
        }
    }
    events
}

/// Whether the event reports a terminal execution status.
#[allow(dead_code)]
pub fn is_terminal_status(event: &Event) -> bool {
    matches!(event, Event::StatusChanged { status, .. } if status.is_terminal())
}

/// Every log entry appended, in order.
#[allow(dead_code)]
pub fn appended_logs(events: &[Event]) -> Vec<ExecutionLogEntry> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::LogAppended { entry } => Some(entry.clone()),
            _ => None,
        })
        .collect()
}

/// Log entries appended since the most recent `LogsCleared`.
#[allow(dead_code)]
pub fn logs_after_last_clear(events: &[Event]) -> Vec<ExecutionLogEntry> {
    let start = events
        .iter()
        .rposition(|e| matches!(e, Event::LogsCleared))
        .map_or(0, |i| i + 1);
    appended_logs(&events[start..])
}

/// Statuses in the order they were published.
#[allow(dead_code)]
pub fn status_sequence(events: &[Event]) -> Vec<ExecutionStatus> {
    let mut statuses: Vec<ExecutionStatus> = Vec::new();
    for event in events {
        if let Event::StatusChanged { status, .. } = event {
            if statuses.last() != Some(status) {
                statuses.push(*status);
            }
        }
    }
    statuses
}

/// Execution ids of every `ExecutionCompleted` event.
#[allow(dead_code)]
pub fn completions(events: &[Event]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::ExecutionCompleted { execution_id } => Some(*execution_id),
            _ => None,
        })
        .collect()
}
