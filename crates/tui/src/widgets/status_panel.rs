//! Execution status panel.
//!
//! Shows the status badge, connection badges, execution identifiers, the
//! elapsed time and the last error.

use chrono::DateTime;
use chrono::Utc;
use cm_core::stream::format_duration;
use cm_protocol::ExecutionStatus;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Wrap;
use ratatui::Frame;

use crate::view::ConsoleView;

/// Badge colour for an execution status.
pub fn status_color(status: ExecutionStatus) -> Color {
    match status {
        ExecutionStatus::Idle => Color::DarkGray,
        ExecutionStatus::Connecting => Color::Yellow,
        ExecutionStatus::Running => Color::Blue,
        ExecutionStatus::Completed => Color::Green,
        ExecutionStatus::Failed => Color::Red,
        ExecutionStatus::Cancelled => Color::Magenta,
    }
}

fn badge(text: &str, bg: Color) -> Span<'static> {
    Span::styled(
        format!(" {} ", text),
        Style::default()
            .fg(Color::Black)
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    )
}

/// Renders the status panel. `now` drives the live duration.
pub fn render_status_panel(frame: &mut Frame, area: Rect, view: &ConsoleView, now: DateTime<Utc>) {
    let state = &view.state;

    let mut badges = vec![badge(
        &state.status.label().to_uppercase(),
        status_color(state.status),
    )];
    if view.connected {
        badges.push(Span::raw(" "));
        badges.push(badge("● Live", Color::Green));
    }
    if view.connection_error.is_some() {
        badges.push(Span::raw(" "));
        badges.push(badge("Connection Error", Color::Red));
    }

    let label = Style::default().fg(Color::DarkGray);
    let execution = state
        .execution_id
        .map(|id| format!("#{}", id))
        .unwrap_or_else(|| "-".to_string());
    let process = state.process_name.clone().unwrap_or_else(|| "-".to_string());
    let duration = state
        .duration_at(now)
        .map(format_duration)
        .unwrap_or_else(|| "-".to_string());

    let mut lines = vec![
        Line::from(badges),
        Line::from(vec![
            Span::styled("Execution: ", label),
            Span::raw(execution),
            Span::styled("   Process: ", label),
            Span::raw(process),
            Span::styled("   Duration: ", label),
            Span::raw(duration),
        ]),
    ];

    if let Some(error) = &state.last_error {
        lines.push(Line::from(Span::styled(
            format!("Error: {}", error),
            Style::default().fg(Color::Red),
        )));
    } else if let Some(error) = &view.connection_error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Execution Monitor"),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}
