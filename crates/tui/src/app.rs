//! TUI application state and event loop.
//!
//! This module defines the main `App` struct that manages the TUI state
//! and the event loop using `tokio::select!`.

use anyhow::Result;
use chrono::Utc;
use cm_protocol::{Event, ExecutionStatus, Op};
use crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Clear, Paragraph},
    Frame,
};
use std::time::Duration;
use tokio::select;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_stream::StreamExt;

use crate::event_handler::{self, KeyAction};
use crate::export::{default_export_path, export_logs};
use crate::tui::{Tui, TuiEvent};
use crate::view::ConsoleView;
use crate::widgets::{render_progress, render_status_panel, Command, CommandComposer, LogView};

const KEY_HINTS: &str = "PgUp/PgDn scroll · End follow · Tab complete · Ctrl-C quit";

/// Main TUI application state.
pub struct App {
    /// Mirror of the core's execution state.
    pub view: ConsoleView,
    pub composer: CommandComposer,
    pub log_view: LogView,
    /// Channel to send operations to the core.
    pub op_tx: UnboundedSender<Op>,
    /// Channel to receive events from the core.
    pub event_rx: UnboundedReceiver<Event>,
    /// Flag to indicate if the application should exit.
    pub should_exit: bool,
    /// Last message for the footer line.
    pub notice: Option<String>,
}

impl App {
    /// Create a new App with communication channels.
    pub fn new(max_logs: usize, op_tx: UnboundedSender<Op>, event_rx: UnboundedReceiver<Event>) -> Self {
        Self {
            view: ConsoleView::new(max_logs),
            composer: CommandComposer::new(),
            log_view: LogView::new(),
            op_tx,
            event_rx,
            should_exit: false,
            notice: None,
        }
    }

    /// Main event loop.
    ///
    /// Uses `tokio::select!` to handle terminal input and core events concurrently.
    pub async fn run(&mut self, tui: &mut Tui) -> Result<()> {
        let mut tui_events = tui.event_stream();
        let frames = tui.frame_requester();

        frames.schedule_frame();

        while !self.should_exit {
            select! {
                Some(event) = self.event_rx.recv() => {
                    self.handle_core_event(event);
                    frames.schedule_frame();
                }
                Some(tui_event) = tui_events.next() => {
                    self.handle_tui_event(tui, tui_event)?;
                }
                else => break,
            }
        }

        Ok(())
    }

    /// Handle events from the core (cm-core).
    fn handle_core_event(&mut self, event: Event) {
        if matches!(event, Event::LogsCleared) {
            self.log_view.reset();
        }
        if let Some(notice) = event_handler::handle_core_event(&mut self.view, event) {
            self.notice = Some(notice);
        }
    }

    /// Handle TUI events (keyboard input, paste, mouse wheel, draw).
    fn handle_tui_event(&mut self, tui: &mut Tui, event: TuiEvent) -> Result<()> {
        match event {
            TuiEvent::Key(key_event) => self.handle_key_event(key_event),
            TuiEvent::Paste(text) => self.composer.insert_str(&text),
            TuiEvent::ScrollUp => self.log_view.scroll_up(),
            TuiEvent::ScrollDown => self.log_view.scroll_down(),
            TuiEvent::Draw => {
                tui.draw(|frame| {
                    self.render(frame);
                })?;
                // Keep the duration ticking while the execution is live.
                if self.view.state.status == ExecutionStatus::Running {
                    tui.frame_requester().schedule_frame_in(Duration::from_secs(1));
                }
                return Ok(());
            }
        }
        tui.frame_requester().schedule_frame();
        Ok(())
    }

    /// Handle keyboard events.
    fn handle_key_event(&mut self, key_event: KeyEvent) {
        match event_handler::handle_keyboard_event(key_event, &mut self.composer, &mut self.log_view) {
            KeyAction::Continue => {}
            KeyAction::Quit => self.should_exit = true,
            KeyAction::Submit(command) => self.apply_command(command),
            KeyAction::Invalid(message) => self.notice = Some(message),
        }
    }

    /// Execute a parsed command, either locally or by forwarding it to the core.
    pub fn apply_command(&mut self, command: Command) {
        if let Some(op) = event_handler::command_op(&command) {
            if self.op_tx.send(op).is_err() {
                tracing::warn!("core service is gone, dropping command");
                self.notice = Some("Core service is not running".to_string());
            }
            return;
        }

        match command {
            Command::ToggleImportant => {
                self.view.important_only = !self.view.important_only;
                self.log_view.scroll_to_bottom();
                self.notice = Some(if self.view.important_only {
                    "Showing important logs only".to_string()
                } else {
                    "Showing all logs".to_string()
                });
            }
            Command::Export { path } => {
                let path = path.unwrap_or_else(|| default_export_path(self.view.state.execution_id));
                let entries = self.view.state.logs.to_vec();
                self.notice = Some(match export_logs(&entries, &path) {
                    Ok(count) => format!("Exported {} lines to {}", count, path.display()),
                    Err(e) => {
                        tracing::warn!(error = %e, "log export failed");
                        format!("Export failed: {:#}", e)
                    }
                });
            }
            Command::Quit => self.should_exit = true,
            Command::Start { .. } | Command::Stop | Command::Clear => {}
        }
    }

    /// Render the TUI.
    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5), // Status panel
                Constraint::Length(3), // Progress
                Constraint::Min(3),    // Logs
                Constraint::Length(1), // Notice / key hints
                Constraint::Length(3), // Command input
            ])
            .split(area);

        render_status_panel(frame, chunks[0], &self.view, Utc::now());
        render_progress(frame, chunks[1], self.view.state.progress.as_ref());

        let entries = self.view.visible_logs();
        self.log_view
            .render(frame, chunks[2], &entries, self.view.important_only);

        self.render_footer(frame, chunks[3]);
        self.composer.render(chunks[4], frame.buffer_mut());
        self.render_popup(frame, chunks[2]);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let paragraph = match &self.notice {
            Some(notice) => Paragraph::new(notice.as_str()).style(Style::default().fg(Color::Cyan)),
            None => Paragraph::new(KEY_HINTS).style(Style::default().fg(Color::DarkGray)),
        };
        frame.render_widget(paragraph, area);
    }

    /// Draw the autocomplete popup over the bottom of `area`.
    fn render_popup(&self, frame: &mut Frame, area: Rect) {
        if !self.composer.should_show_popup() {
            return;
        }
        let count = self.composer.suggestions().len() as u16;
        if count == 0 {
            return;
        }

        let height = (count + 2).min(area.height);
        let popup = Rect {
            x: area.x,
            y: area.y + area.height - height,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup);
        self.composer.render_popup(popup, frame.buffer_mut());
    }
}
