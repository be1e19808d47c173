//! Step progress gauge.

use cm_protocol::StepProgress;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::style::Style;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Gauge;
use ratatui::Frame;

/// Gauge label, e.g. `Step 1/3: Researching`.
pub fn progress_label(progress: &StepProgress) -> String {
    format!(
        "Step {}/{}: {} ({}%)",
        progress.current_step,
        progress.total_steps,
        progress.step_description,
        progress.percent()
    )
}

/// Renders the progress gauge, or an empty placeholder when no step is known.
pub fn render_progress(frame: &mut Frame, area: Rect, progress: Option<&StepProgress>) {
    let block = Block::default().borders(Borders::ALL).title("Progress");

    let gauge = match progress {
        Some(progress) => Gauge::default()
            .block(block)
            .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
            .percent(progress.percent())
            .label(progress_label(progress)),
        None => Gauge::default()
            .block(block)
            .gauge_style(Style::default().fg(Color::DarkGray))
            .percent(0)
            .label("No step reported"),
    };

    frame.render_widget(gauge, area);
}
