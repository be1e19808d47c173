//! Event handling utilities for the TUI.
//!
//! This module provides functions for handling different types of events:
//! - Core events (from cm-core), folded into the [`ConsoleView`]
//! - Keyboard events (user input), routed to the composer or the log view
//! - Translating parsed commands into core operations

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use cm_protocol::{Event, Op};

use crate::event::EventStatus;
use crate::view::ConsoleView;
use crate::widgets::command_composer::{Command, CommandComposer};
use crate::widgets::LogView;

/// Outcome of a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Nothing further to do beyond redrawing.
    Continue,
    /// Exit the application.
    Quit,
    /// The composer produced a command.
    Submit(Command),
    /// The composer input could not be parsed.
    Invalid(String),
}

/// Handle an event received from the core.
///
/// Returns a short notice for events the user should notice even when the
/// log view is scrolled away.
pub fn handle_core_event(view: &mut ConsoleView, event: Event) -> Option<String> {
    match event {
        Event::StatusChanged {
            status,
            execution_id,
            process_name,
            started_at,
            ended_at,
            error,
        } => {
            let state = &mut view.state;
            state.status = status;
            state.execution_id = execution_id;
            state.process_name = process_name;
            state.started_at = started_at;
            state.ended_at = ended_at;
            state.last_error = error;
            None
        }
        Event::LogAppended { entry } => {
            view.state.logs.push_entry(entry);
            None
        }
        Event::LogsCleared => {
            view.state.logs.clear();
            None
        }
        Event::ProgressUpdated { progress } => {
            view.state.progress = progress;
            None
        }
        Event::ConnectionChanged { connected, error } => {
            view.connected = connected;
            view.connection_error = error;
            None
        }
        Event::ExecutionCompleted { execution_id } => {
            Some(format!("Execution #{} completed", execution_id))
        }
        Event::ExecutionFailed {
            execution_id,
            error,
        } => Some(format!("Execution #{} failed: {}", execution_id, error)),
        Event::StartFailed { process_id, error } => Some(format!(
            "Could not start process {}: {}",
            process_id, error
        )),
    }
}

/// Handle a keyboard event from the user.
///
/// Editing keys go to the composer first; whatever it does not consume
/// scrolls the log view.
pub fn handle_keyboard_event(
    key_event: KeyEvent,
    composer: &mut CommandComposer,
    log_view: &mut LogView,
) -> KeyAction {
    if key_event.kind != KeyEventKind::Press {
        return KeyAction::Continue;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL) {
        return match key_event.code {
            KeyCode::Char('c') => KeyAction::Quit,
            _ => KeyAction::Continue,
        };
    }

    match key_event.code {
        KeyCode::Char('q') if composer.is_empty() => return KeyAction::Quit,
        KeyCode::Enter => return submit_command(composer),
        KeyCode::PageUp => log_view.page_up(),
        KeyCode::PageDown => log_view.page_down(),
        KeyCode::End => log_view.scroll_to_bottom(),
        _ => {
            if composer.handle_key_event(key_event) == EventStatus::NotConsumed {
                match key_event.code {
                    KeyCode::Up => log_view.scroll_up(),
                    KeyCode::Down => log_view.scroll_down(),
                    _ => {}
                }
            }
        }
    }

    KeyAction::Continue
}

/// Parse the composer input. Valid input is cleared; invalid input is kept
/// so it can be corrected.
fn submit_command(composer: &mut CommandComposer) -> KeyAction {
    match composer.parse_command() {
        Ok(Some(command)) => {
            composer.clear();
            KeyAction::Submit(command)
        }
        Ok(None) => KeyAction::Continue,
        Err(message) => KeyAction::Invalid(message),
    }
}

/// Core operation for a command. Commands handled locally return `None`.
pub fn command_op(command: &Command) -> Option<Op> {
    match command {
        Command::Start {
            process_id,
            variables,
        } => Some(Op::StartExecution {
            process_id: *process_id,
            variables: variables.clone(),
        }),
        Command::Stop => Some(Op::StopExecution),
        Command::Clear => Some(Op::ClearLogs),
        Command::ToggleImportant | Command::Export { .. } | Command::Quit => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cm_protocol::{ExecutionLogEntry, ExecutionStatus, LogCategory, StepProgress};
    use std::collections::BTreeMap;

    fn type_text(composer: &mut CommandComposer, log_view: &mut LogView, text: &str) {
        for c in text.chars() {
            handle_keyboard_event(KeyEvent::from(KeyCode::Char(c)), composer, log_view);
        }
    }

    fn log_entry(id: u64, text: &str) -> ExecutionLogEntry {
        ExecutionLogEntry {
            id,
            timestamp: Utc::now(),
            category: LogCategory::Info,
            text: text.to_string(),
            important: false,
        }
    }

    #[test]
    fn test_status_changed_updates_view() {
        let mut view = ConsoleView::new(10);
        let now = Utc::now();

        let notice = handle_core_event(
            &mut view,
            Event::StatusChanged {
                status: ExecutionStatus::Running,
                execution_id: Some(7),
                process_name: Some("Research".to_string()),
                started_at: Some(now),
                ended_at: None,
                error: None,
            },
        );

        assert!(notice.is_none());
        assert_eq!(view.state.status, ExecutionStatus::Running);
        assert_eq!(view.state.execution_id, Some(7));
        assert_eq!(view.state.process_name.as_deref(), Some("Research"));
        assert_eq!(view.state.started_at, Some(now));
    }

    #[test]
    fn test_log_events_update_buffer() {
        let mut view = ConsoleView::new(2);

        handle_core_event(&mut view, Event::LogAppended { entry: log_entry(0, "a") });
        handle_core_event(&mut view, Event::LogAppended { entry: log_entry(1, "b") });
        handle_core_event(&mut view, Event::LogAppended { entry: log_entry(2, "c") });

        let texts: Vec<_> = view.state.logs.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c"]);

        handle_core_event(&mut view, Event::LogsCleared);
        assert!(view.state.logs.is_empty());
    }

    #[test]
    fn test_progress_and_connection_events() {
        let mut view = ConsoleView::new(10);
        let progress = StepProgress {
            current_step: 1,
            total_steps: 2,
            step_description: "Researching".to_string(),
        };

        handle_core_event(
            &mut view,
            Event::ProgressUpdated {
                progress: Some(progress.clone()),
            },
        );
        handle_core_event(
            &mut view,
            Event::ConnectionChanged {
                connected: false,
                error: Some("Max reconnection attempts reached".to_string()),
            },
        );

        assert_eq!(view.state.progress, Some(progress));
        assert!(!view.connected);
        assert_eq!(
            view.connection_error.as_deref(),
            Some("Max reconnection attempts reached")
        );
    }

    #[test]
    fn test_terminal_events_produce_notices() {
        let mut view = ConsoleView::new(10);

        let notice = handle_core_event(&mut view, Event::ExecutionCompleted { execution_id: 7 });
        assert_eq!(notice.as_deref(), Some("Execution #7 completed"));

        let notice = handle_core_event(
            &mut view,
            Event::ExecutionFailed {
                execution_id: 7,
                error: "boom".to_string(),
            },
        );
        assert_eq!(notice.as_deref(), Some("Execution #7 failed: boom"));

        let notice = handle_core_event(
            &mut view,
            Event::StartFailed {
                process_id: 42,
                error: "HTTP 404: Not Found".to_string(),
            },
        );
        assert_eq!(
            notice.as_deref(),
            Some("Could not start process 42: HTTP 404: Not Found")
        );
    }

    #[test]
    fn test_q_quits_only_when_input_is_empty() {
        let mut composer = CommandComposer::new();
        let mut log_view = LogView::new();

        let action =
            handle_keyboard_event(KeyEvent::from(KeyCode::Char('q')), &mut composer, &mut log_view);
        assert_eq!(action, KeyAction::Quit);

        type_text(&mut composer, &mut log_view, "/qu");
        assert_eq!(composer.input(), "/qu");

        let action =
            handle_keyboard_event(KeyEvent::from(KeyCode::Char('q')), &mut composer, &mut log_view);
        assert_eq!(action, KeyAction::Continue);
        assert_eq!(composer.input(), "/quq");
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut composer = CommandComposer::new();
        let mut log_view = LogView::new();
        type_text(&mut composer, &mut log_view, "/start 1");

        let action = handle_keyboard_event(
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            &mut composer,
            &mut log_view,
        );
        assert_eq!(action, KeyAction::Quit);
    }

    #[test]
    fn test_enter_submits_and_clears() {
        let mut composer = CommandComposer::new();
        let mut log_view = LogView::new();
        type_text(&mut composer, &mut log_view, "/start 42 topic=AI");

        let action =
            handle_keyboard_event(KeyEvent::from(KeyCode::Enter), &mut composer, &mut log_view);

        let mut variables = BTreeMap::new();
        variables.insert("topic".to_string(), "AI".to_string());
        assert_eq!(
            action,
            KeyAction::Submit(Command::Start {
                process_id: 42,
                variables,
            })
        );
        assert!(composer.is_empty());
    }

    #[test]
    fn test_invalid_input_is_kept() {
        let mut composer = CommandComposer::new();
        let mut log_view = LogView::new();
        type_text(&mut composer, &mut log_view, "/bogus");

        let action =
            handle_keyboard_event(KeyEvent::from(KeyCode::Enter), &mut composer, &mut log_view);

        assert!(matches!(action, KeyAction::Invalid(msg) if msg.contains("Unknown command")));
        assert_eq!(composer.input(), "/bogus");
    }

    #[test]
    fn test_release_events_are_ignored() {
        let mut composer = CommandComposer::new();
        let mut log_view = LogView::new();
        let mut key = KeyEvent::from(KeyCode::Char('q'));
        key.kind = KeyEventKind::Release;

        assert_eq!(
            handle_keyboard_event(key, &mut composer, &mut log_view),
            KeyAction::Continue
        );
    }

    #[test]
    fn test_command_op_mapping() {
        assert!(matches!(
            command_op(&Command::Start {
                process_id: 3,
                variables: BTreeMap::new(),
            }),
            Some(Op::StartExecution { process_id: 3, .. })
        ));
        assert!(matches!(command_op(&Command::Stop), Some(Op::StopExecution)));
        assert!(matches!(command_op(&Command::Clear), Some(Op::ClearLogs)));
        assert!(command_op(&Command::ToggleImportant).is_none());
        assert!(command_op(&Command::Export { path: None }).is_none());
        assert!(command_op(&Command::Quit).is_none());
    }
}
