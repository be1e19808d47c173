//! Scrollable log view with auto-follow.
//!
//! The view sticks to the newest entry until the user scrolls up. Scrolling
//! back down to the last line re-enables following. Whether the view is at
//! the bottom is decided by comparing the scroll offset against the content
//! height recorded during the last render.

use chrono::Local;
use cm_protocol::ExecutionLogEntry;
use cm_protocol::LogCategory;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Scrollbar;
use ratatui::widgets::ScrollbarOrientation;
use ratatui::widgets::ScrollbarState;
use ratatui::Frame;

use crate::export::clock;

/// Foreground colour for a log category.
pub fn category_color(category: LogCategory) -> Color {
    match category {
        LogCategory::Error => Color::Red,
        LogCategory::Warning => Color::Yellow,
        LogCategory::Success => Color::Green,
        LogCategory::Progress => Color::Cyan,
        LogCategory::Info => Color::Gray,
    }
}

/// Log view scroll state.
#[derive(Debug, Clone)]
pub struct LogView {
    scroll_offset: usize,
    follow: bool,
    /// Inner height from the last render.
    viewport_height: usize,
    /// Number of lines from the last render.
    content_len: usize,
}

impl LogView {
    pub fn new() -> Self {
        Self {
            scroll_offset: 0,
            follow: true,
            viewport_height: 0,
            content_len: 0,
        }
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Whether new entries scroll the view automatically.
    pub fn is_following(&self) -> bool {
        self.follow
    }

    /// Largest valid scroll offset for the last rendered content.
    pub fn max_offset(&self) -> usize {
        self.content_len.saturating_sub(self.viewport_height)
    }

    pub fn page_size(&self) -> usize {
        self.viewport_height.max(1)
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
        self.update_follow();
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = (self.scroll_offset + 1).min(self.max_offset());
        self.update_follow();
    }

    pub fn page_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(self.page_size());
        self.update_follow();
    }

    pub fn page_down(&mut self) {
        self.scroll_offset = (self.scroll_offset + self.page_size()).min(self.max_offset());
        self.update_follow();
    }

    /// Jump to the newest entry and resume following.
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.max_offset();
        self.follow = true;
    }

    /// Forget the scroll position, e.g. after the buffer was cleared.
    pub fn reset(&mut self) {
        *self = Self {
            viewport_height: self.viewport_height,
            ..Self::new()
        };
    }

    fn update_follow(&mut self) {
        self.follow = self.scroll_offset >= self.max_offset();
    }

    /// Render `entries` into `area`, recording the viewport for scrolling.
    pub fn render(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        entries: &[&ExecutionLogEntry],
        important_only: bool,
    ) {
        self.viewport_height = area.height.saturating_sub(2) as usize;
        self.content_len = entries.len();

        if self.follow {
            self.scroll_offset = self.max_offset();
        } else {
            self.scroll_offset = self.scroll_offset.min(self.max_offset());
        }

        let mut title = format!("Logs ({})", entries.len());
        if important_only {
            title.push_str(" - important only");
        }
        if !self.follow {
            title.push_str(" - paused, End to follow");
        }
        let block = Block::default().borders(Borders::ALL).title(title);

        let lines: Vec<Line> = if entries.is_empty() {
            let placeholder = if important_only {
                "No important logs."
            } else {
                "No logs yet."
            };
            vec![Line::from(Span::styled(
                placeholder,
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            entries.iter().map(|entry| log_line(entry)).collect()
        };

        let paragraph = Paragraph::new(lines)
            .block(block)
            .scroll((self.scroll_offset as u16, 0));
        frame.render_widget(paragraph, area);

        if self.content_len > self.viewport_height {
            let mut scrollbar_state = ScrollbarState::default()
                .content_length(self.max_offset())
                .viewport_content_length(self.viewport_height)
                .position(self.scroll_offset);

            let scrollbar = Scrollbar::default()
                .orientation(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"));

            frame.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
        }
    }
}

impl Default for LogView {
    fn default() -> Self {
        Self::new()
    }
}

fn log_line(entry: &ExecutionLogEntry) -> Line<'static> {
    let color = category_color(entry.category);
    let mut text_style = Style::default().fg(color);
    if entry.important {
        text_style = text_style.add_modifier(Modifier::BOLD);
    }

    Line::from(vec![
        Span::styled(
            format!("[{}] ", clock(&entry.timestamp, &Local)),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(format!("{} ", entry.category.icon()), Style::default().fg(color)),
        Span::styled(entry.text.clone(), text_style),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn entries(count: usize) -> Vec<ExecutionLogEntry> {
        (0..count)
            .map(|i| ExecutionLogEntry {
                id: i as u64,
                timestamp: Utc::now(),
                category: LogCategory::Info,
                text: format!("Log line {}", i),
                important: false,
            })
            .collect()
    }

    fn draw(view: &mut LogView, logs: &[ExecutionLogEntry], height: u16) -> String {
        let refs: Vec<&ExecutionLogEntry> = logs.iter().collect();
        let backend = TestBackend::new(80, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| view.render(frame, frame.area(), &refs, false))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_renders_empty_state() {
        let mut view = LogView::new();
        let content = draw(&mut view, &[], 10);

        assert!(content.contains("No logs yet."));
        assert!(content.contains("Logs (0)"));
    }

    #[test]
    fn test_renders_icon_and_text() {
        let mut view = LogView::new();
        let logs = vec![ExecutionLogEntry {
            id: 0,
            timestamp: Utc::now(),
            category: LogCategory::Success,
            text: "Execution completed".to_string(),
            important: true,
        }];

        let content = draw(&mut view, &logs, 10);
        assert!(content.contains("✅"));
        assert!(content.contains("Execution completed"));
    }

    #[test]
    fn test_follows_newest_entry() {
        let mut view = LogView::new();
        // 10 rows leaves 8 visible lines.
        let content = draw(&mut view, &entries(20), 10);

        assert!(view.is_following());
        assert_eq!(view.scroll_offset(), 12);
        assert!(content.contains("Log line 19"));
        assert!(!content.contains("Log line 0 "));

        let content = draw(&mut view, &entries(25), 10);
        assert_eq!(view.scroll_offset(), 17);
        assert!(content.contains("Log line 24"));
    }

    #[test]
    fn test_scrolling_up_stops_follow() {
        let mut view = LogView::new();
        draw(&mut view, &entries(20), 10);

        view.scroll_up();
        assert!(!view.is_following());
        assert_eq!(view.scroll_offset(), 11);

        // New entries no longer move the view.
        let content = draw(&mut view, &entries(30), 10);
        assert_eq!(view.scroll_offset(), 11);
        assert!(!content.contains("Log line 29"));
        assert!(content.contains("End to follow"));
    }

    #[test]
    fn test_scrolling_back_to_bottom_resumes_follow() {
        let mut view = LogView::new();
        draw(&mut view, &entries(20), 10);

        view.page_up();
        assert_eq!(view.scroll_offset(), 4);
        assert!(!view.is_following());

        view.page_down();
        assert_eq!(view.scroll_offset(), 12);
        assert!(view.is_following());

        view.scroll_up();
        view.scroll_down();
        assert!(view.is_following());
    }

    #[test]
    fn test_scroll_to_bottom() {
        let mut view = LogView::new();
        draw(&mut view, &entries(20), 10);

        view.page_up();
        view.page_up();
        assert_eq!(view.scroll_offset(), 0);

        view.scroll_to_bottom();
        assert_eq!(view.scroll_offset(), 12);
        assert!(view.is_following());
    }

    #[test]
    fn test_short_content_always_follows() {
        let mut view = LogView::new();
        draw(&mut view, &entries(3), 10);

        view.scroll_up();
        assert_eq!(view.scroll_offset(), 0);
        assert!(view.is_following());
    }

    #[test]
    fn test_reset_restores_follow() {
        let mut view = LogView::new();
        draw(&mut view, &entries(20), 10);
        view.page_up();

        view.reset();
        assert!(view.is_following());
        assert_eq!(view.scroll_offset(), 0);
        assert_eq!(view.page_size(), 8);
    }
}
