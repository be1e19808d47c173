//! Non-interactive execution watcher.
//!
//! Starts one execution through the core service, prints what happens, and
//! maps the end of the execution to a process exit code.

use chrono::Local;
use cm_core::stream::ServiceHandle;
use cm_core::transport::manager::MAX_RECONNECT_ATTEMPTS_REACHED;
use cm_protocol::{Event, ExecutionLogEntry, ExecutionStatus, LogCategory, Op};
use color_eyre::eyre::WrapErr;
use colored::{ColoredString, Colorize};
use std::collections::BTreeMap;
use std::io::Write;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// How a watched execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    Completed,
    Failed(String),
    Cancelled,
    StartFailed(String),
    ReconnectExhausted,
    /// Interrupted locally; a stop signal was sent.
    Interrupted,
    /// The core service went away before a terminal event.
    ServiceEnded,
}

impl WatchOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            WatchOutcome::Completed => 0,
            WatchOutcome::Interrupted => 130,
            _ => 1,
        }
    }

    fn summary(&self) -> ColoredString {
        match self {
            WatchOutcome::Completed => "Execution completed".green().bold(),
            WatchOutcome::Failed(error) => format!("Execution failed: {}", error).red().bold(),
            WatchOutcome::Cancelled => "Execution cancelled".yellow().bold(),
            WatchOutcome::StartFailed(error) => {
                format!("Failed to start execution: {}", error).red().bold()
            }
            WatchOutcome::ReconnectExhausted => {
                "Lost the execution stream: reconnection attempts exhausted"
                    .red()
                    .bold()
            }
            WatchOutcome::Interrupted => "Interrupted, stop signal sent".yellow().bold(),
            WatchOutcome::ServiceEnded => "Core service stopped unexpectedly".red().bold(),
        }
    }
}

/// Decide whether `event` ends the watch.
pub fn outcome_of(event: &Event) -> Option<WatchOutcome> {
    match event {
        Event::ExecutionCompleted { .. } => Some(WatchOutcome::Completed),
        Event::ExecutionFailed { error, .. } => Some(WatchOutcome::Failed(error.clone())),
        Event::StatusChanged {
            status: ExecutionStatus::Cancelled,
            ..
        } => Some(WatchOutcome::Cancelled),
        Event::StartFailed { error, .. } => Some(WatchOutcome::StartFailed(error.clone())),
        Event::ConnectionChanged {
            connected: false,
            error: Some(error),
        } if error == MAX_RECONNECT_ATTEMPTS_REACHED => Some(WatchOutcome::ReconnectExhausted),
        _ => None,
    }
}

fn colorize(entry: &ExecutionLogEntry) -> ColoredString {
    let text = entry.text.as_str();
    let colored = match entry.category {
        LogCategory::Error => text.red(),
        LogCategory::Warning => text.yellow(),
        LogCategory::Success => text.green(),
        LogCategory::Progress => text.cyan(),
        LogCategory::Info => text.normal(),
    };
    if entry.important {
        colored.bold()
    } else {
        colored
    }
}

/// Print one event. Plain mode only prints log lines.
pub fn print_event(out: &mut impl Write, event: &Event, json: bool) -> std::io::Result<()> {
    if json {
        let line = serde_json::to_string(event).map_err(std::io::Error::other)?;
        return writeln!(out, "{}", line);
    }

    if let Event::LogAppended { entry } = event {
        let stamp = entry.timestamp.with_timezone(&Local).format("%H:%M:%S");
        writeln!(
            out,
            "{} {}",
            format!("[{}]", stamp).dimmed(),
            colorize(entry)
        )?;
    }
    Ok(())
}

/// Run one execution to its end.
///
/// Events published together with the terminal one (the final log lines)
/// are printed before returning. The service is always shut down. The first
/// Ctrl-C stops the execution; a second one leaves without waiting.
pub async fn watch(
    handle: ServiceHandle,
    process_id: u64,
    variables: BTreeMap<String, String>,
    json: bool,
    out: &mut impl Write,
) -> color_eyre::Result<WatchOutcome> {
    let (interrupt_tx, mut interrupts) = mpsc::unbounded_channel();
    let forwarder = tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if interrupt_tx.send(()).is_err() {
                break;
            }
        }
    });

    let result = watch_with_interrupts(handle, process_id, variables, json, out, &mut interrupts).await;
    forwarder.abort();
    result
}

async fn watch_with_interrupts(
    mut handle: ServiceHandle,
    process_id: u64,
    variables: BTreeMap<String, String>,
    json: bool,
    out: &mut impl Write,
    interrupts: &mut UnboundedReceiver<()>,
) -> color_eyre::Result<WatchOutcome> {
    let _ = handle.op_tx.send(Op::StartExecution {
        process_id,
        variables,
    });

    let mut interrupted = false;
    let mut forced = false;
    let outcome = loop {
        tokio::select! {
            event = handle.event_rx.recv() => {
                let Some(event) = event else {
                    break WatchOutcome::ServiceEnded;
                };
                print_event(out, &event, json).wrap_err("Failed to write output")?;
                if let Some(outcome) = outcome_of(&event) {
                    break outcome;
                }
            }
            Some(()) = interrupts.recv() => {
                if interrupted {
                    tracing::warn!(process_id, "interrupted again, not waiting for the service");
                    forced = true;
                    break WatchOutcome::Interrupted;
                }
                interrupted = true;
                tracing::info!(process_id, "interrupted, stopping execution");
                let _ = handle.op_tx.send(Op::StopExecution);
                let _ = handle.op_tx.send(Op::Shutdown);
            }
        }
    };

    while let Ok(event) = handle.event_rx.try_recv() {
        print_event(out, &event, json).wrap_err("Failed to write output")?;
    }

    let outcome = match outcome {
        WatchOutcome::ServiceEnded | WatchOutcome::Cancelled if interrupted => {
            WatchOutcome::Interrupted
        }
        outcome => outcome,
    };

    let _ = handle.op_tx.send(Op::Shutdown);
    if forced {
        handle.join.abort();
    } else if let Err(e) = handle.join.await {
        tracing::warn!(error = %e, "core service ended abnormally");
    }

    if !json {
        writeln!(out, "{}", outcome.summary()).wrap_err("Failed to write output")?;
    }
    out.flush().wrap_err("Failed to write output")?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cm_core::api::MockExecutionApi;
    use cm_core::stream::ExecutionService;
    use cm_core::transport::MockConnector;
    use cm_protocol::{ConsoleConfig, StreamMessage, StreamSettings};
    use std::sync::Arc;
    use std::time::Duration;

    const BASE_URL: &str = "http://backend.test/api/v1";

    fn spawn(api: &MockExecutionApi, connector: &MockConnector) -> ServiceHandle {
        let config = ConsoleConfig {
            api_base_url: BASE_URL.to_string(),
            max_logs: 100,
            request_timeout_ms: 1000,
            stream: StreamSettings {
                reconnect_attempts: 1,
                reconnect_delay_ms: 10,
            },
        };
        ExecutionService::spawn(&config, Arc::new(api.clone()), Arc::new(connector.clone()))
    }

    async fn server(connector: &MockConnector) -> cm_core::transport::MockServer {
        for _ in 0..100 {
            if let Some(server) = connector.take_server() {
                return server;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("stream was never opened");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(WatchOutcome::Completed.exit_code(), 0);
        assert_eq!(WatchOutcome::Failed("x".into()).exit_code(), 1);
        assert_eq!(WatchOutcome::Cancelled.exit_code(), 1);
        assert_eq!(WatchOutcome::StartFailed("x".into()).exit_code(), 1);
        assert_eq!(WatchOutcome::ReconnectExhausted.exit_code(), 1);
        assert_eq!(WatchOutcome::Interrupted.exit_code(), 130);
    }

    #[test]
    fn test_outcome_of_events() {
        assert_eq!(
            outcome_of(&Event::ExecutionCompleted { execution_id: 1 }),
            Some(WatchOutcome::Completed)
        );
        assert_eq!(
            outcome_of(&Event::ConnectionChanged {
                connected: false,
                error: Some(MAX_RECONNECT_ATTEMPTS_REACHED.to_string()),
            }),
            Some(WatchOutcome::ReconnectExhausted)
        );
        // A transient connection error keeps watching.
        assert_eq!(
            outcome_of(&Event::ConnectionChanged {
                connected: false,
                error: Some("Stream connection error: reset".to_string()),
            }),
            None
        );
        assert_eq!(outcome_of(&Event::LogsCleared), None);
    }

    #[test]
    fn test_plain_output_prints_log_lines_only() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        let entry = ExecutionLogEntry {
            id: 0,
            timestamp: chrono::Utc::now(),
            category: LogCategory::Success,
            text: "🎉 Execution completed successfully!".to_string(),
            important: true,
        };

        print_event(&mut out, &Event::LogsCleared, false).unwrap();
        print_event(&mut out, &Event::LogAppended { entry }, false).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with('['));
        assert!(text.trim_end().ends_with("] 🎉 Execution completed successfully!"));
    }

    #[test]
    fn test_json_output_is_one_event_per_line() {
        let mut out = Vec::new();
        print_event(&mut out, &Event::LogsCleared, true).unwrap();
        print_event(&mut out, &Event::ExecutionCompleted { execution_id: 3 }, true).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines[0]["type"], "logsCleared");
        assert_eq!(lines[1]["type"], "executionCompleted");
        assert_eq!(lines[1]["payload"]["execution_id"], 3);
    }

    #[tokio::test]
    async fn test_watch_completes() {
        colored::control::set_override(false);
        let api = MockExecutionApi::new(BASE_URL);
        api.respond_with(7);
        let connector = MockConnector::new();
        let handle = spawn(&api, &connector);

        let driver = tokio::spawn({
            let connector = connector.clone();
            async move {
                let server = server(&connector).await;
                server.send_message(&StreamMessage {
                    process_name: Some("Research".to_string()),
                    ..StreamMessage::new("execution_started")
                });
                server.send_message(&StreamMessage {
                    content: Some("Step 1/1: Writing".to_string()),
                    ..StreamMessage::new("output")
                });
                server.send_message(&StreamMessage::new("execution_completed"));
                server
            }
        });

        let mut out = Vec::new();
        let outcome = watch(handle, 42, BTreeMap::new(), false, &mut out)
            .await
            .unwrap();
        let _server = driver.await.unwrap();

        assert_eq!(outcome, WatchOutcome::Completed);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Execution started for: Research"));
        assert!(text.contains("Step 1/1: Writing"));
        assert!(text.contains("🎉 Execution completed successfully!"));
        assert!(text.trim_end().ends_with("Execution completed"));
    }

    #[tokio::test]
    async fn test_watch_reports_start_failure() {
        let api = MockExecutionApi::new(BASE_URL);
        api.fail_with(cm_core::api::ApiError::Status {
            status: 404,
            status_text: "Not Found".to_string(),
        });
        let connector = MockConnector::new();
        let handle = spawn(&api, &connector);

        let mut out = Vec::new();
        let outcome = watch(handle, 99, BTreeMap::new(), true, &mut out)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WatchOutcome::StartFailed("HTTP 404: Not Found".to_string())
        );
        assert_eq!(connector.open_count(), 0);
    }

    #[tokio::test]
    async fn test_watch_gives_up_after_reconnects() {
        let api = MockExecutionApi::new(BASE_URL);
        api.respond_with(7);
        let connector = MockConnector::new();
        connector.refuse_next("refused");
        connector.refuse_next("refused");
        let handle = spawn(&api, &connector);

        let mut out = Vec::new();
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            watch(handle, 42, BTreeMap::new(), true, &mut out),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(outcome, WatchOutcome::ReconnectExhausted);
        assert_eq!(connector.open_count(), 2);
    }

    #[tokio::test]
    async fn test_interrupt_stops_pending_start() {
        colored::control::set_override(false);
        let api = MockExecutionApi::new(BASE_URL).gated();
        let connector = MockConnector::new();
        let handle = spawn(&api, &connector);
        let (interrupt_tx, mut interrupts) = mpsc::unbounded_channel();
        interrupt_tx.send(()).unwrap();

        let mut out = Vec::new();
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            watch_with_interrupts(handle, 42, BTreeMap::new(), false, &mut out, &mut interrupts),
        )
        .await
        .expect("watch did not return after an interrupt")
        .unwrap();

        assert_eq!(outcome, WatchOutcome::Interrupted);
        assert_eq!(outcome.exit_code(), 130);
        assert_eq!(connector.open_count(), 0);
    }

    #[tokio::test]
    async fn test_second_interrupt_leaves_without_waiting() {
        // A service that never answers nor ends.
        let (op_tx, _op_rx) = mpsc::unbounded_channel();
        let (_event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
        let handle = ServiceHandle {
            op_tx,
            event_rx,
            join: tokio::spawn(std::future::pending()),
        };
        let (interrupt_tx, mut interrupts) = mpsc::unbounded_channel();
        interrupt_tx.send(()).unwrap();
        interrupt_tx.send(()).unwrap();

        let mut out = Vec::new();
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            watch_with_interrupts(handle, 42, BTreeMap::new(), true, &mut out, &mut interrupts),
        )
        .await
        .expect("second interrupt did not end the watch")
        .unwrap();

        assert_eq!(outcome, WatchOutcome::Interrupted);
    }
}
