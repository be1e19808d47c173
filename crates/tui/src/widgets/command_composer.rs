//! Command composer widget with slash command autocomplete.
//!
//! This widget provides a text input field for entering commands, with
//! autocomplete suggestions when the user types a slash command.

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::event::EventStatus;

/// Available slash commands with their descriptions.
const COMMANDS: &[(&str, &str)] = &[
    ("/start <process_id> [key=value..]", "Start an execution"),
    ("/stop", "Stop the running execution"),
    ("/clear", "Clear the log buffer"),
    ("/important", "Toggle the important-only filter"),
    ("/export [path]", "Write the logs to a file"),
    ("/quit", "Exit the console"),
];

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start {
        process_id: u64,
        variables: BTreeMap<String, String>,
    },
    Stop,
    Clear,
    ToggleImportant,
    Export {
        path: Option<PathBuf>,
    },
    Quit,
}

/// Parse `key=value` pairs. Keys must be non-empty; values may contain `=`.
pub fn parse_variables<'a, I>(pairs: I) -> Result<BTreeMap<String, String>, String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut variables = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("Invalid variable '{}', expected key=value", pair))?;
        if key.is_empty() {
            return Err(format!("Invalid variable '{}', key is empty", pair));
        }
        variables.insert(key.to_string(), value.to_string());
    }
    Ok(variables)
}

/// Command composer state.
#[derive(Debug, Clone)]
pub struct CommandComposer {
    /// Current input text
    input: String,
    /// Cursor position as a byte offset, always on a char boundary
    cursor_pos: usize,
    /// Whether autocomplete popup should be shown
    show_popup: bool,
    /// Selected index in the autocomplete list
    selected_index: usize,
}

impl Default for CommandComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandComposer {
    /// Create a new command composer.
    pub fn new() -> Self {
        Self {
            input: String::new(),
            cursor_pos: 0,
            show_popup: false,
            selected_index: 0,
        }
    }

    /// Get the current input text.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    /// Check if autocomplete popup should be shown.
    pub fn should_show_popup(&self) -> bool {
        self.show_popup
    }

    /// Get filtered command suggestions based on current input.
    pub fn suggestions(&self) -> Vec<(&'static str, &'static str)> {
        if !self.input.starts_with('/') {
            return Vec::new();
        }

        let filter = self.input.trim();
        if filter == "/" {
            return COMMANDS.to_vec();
        }

        COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(filter))
            .copied()
            .collect()
    }

    /// Get the currently selected suggestion.
    pub fn selected_suggestion(&self) -> Option<(&'static str, &'static str)> {
        self.suggestions().get(self.selected_index).copied()
    }

    /// Insert a character at the cursor position.
    pub fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor_pos, c);
        self.cursor_pos += c.len_utf8();
        self.update_popup_state();
    }

    /// Insert a string at the cursor position (bracketed paste).
    pub fn insert_str(&mut self, text: &str) {
        let text: String = text.chars().filter(|c| !c.is_control()).collect();
        self.input.insert_str(self.cursor_pos, &text);
        self.cursor_pos += text.len();
        self.update_popup_state();
    }

    /// Delete the character before the cursor (backspace).
    pub fn delete_char(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.input.remove(prev);
            self.cursor_pos = prev;
            self.update_popup_state();
        }
    }

    /// Clear all input.
    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor_pos = 0;
        self.show_popup = false;
        self.selected_index = 0;
    }

    /// Move cursor left.
    pub fn move_cursor_left(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.cursor_pos = prev;
        }
    }

    /// Move cursor right.
    pub fn move_cursor_right(&mut self) {
        if let Some(c) = self.input[self.cursor_pos..].chars().next() {
            self.cursor_pos += c.len_utf8();
        }
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.input[..self.cursor_pos]
            .char_indices()
            .next_back()
            .map(|(idx, _)| idx)
    }

    /// Move selection up in autocomplete popup.
    pub fn move_selection_up(&mut self) {
        if self.selected_index > 0 {
            self.selected_index -= 1;
        }
    }

    /// Move selection down in autocomplete popup.
    pub fn move_selection_down(&mut self) {
        let suggestions = self.suggestions();
        if self.selected_index + 1 < suggestions.len() {
            self.selected_index += 1;
        }
    }

    /// Complete with the currently selected suggestion (Tab key).
    pub fn complete_with_selection(&mut self) {
        if let Some((cmd, _)) = self.selected_suggestion() {
            // Drop the argument placeholders.
            let cmd_name = cmd.split_whitespace().next().unwrap_or(cmd);
            self.input = format!("{} ", cmd_name);
            self.cursor_pos = self.input.len();
            self.show_popup = false;
            self.selected_index = 0;
        }
    }

    fn update_popup_state(&mut self) {
        self.show_popup = self.input.starts_with('/') && !self.input.contains(' ');

        let suggestions = self.suggestions();
        if self.selected_index >= suggestions.len() {
            self.selected_index = suggestions.len().saturating_sub(1);
        }
    }

    /// Handle editing keys. Enter and quit keys are left to the caller.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> EventStatus {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return EventStatus::NotConsumed;
        }
        match key.code {
            KeyCode::Char(c) => self.insert_char(c),
            KeyCode::Backspace => self.delete_char(),
            KeyCode::Left => self.move_cursor_left(),
            KeyCode::Right => self.move_cursor_right(),
            KeyCode::Tab if self.show_popup => self.complete_with_selection(),
            KeyCode::Up if self.show_popup => self.move_selection_up(),
            KeyCode::Down if self.show_popup => self.move_selection_down(),
            KeyCode::Esc if !self.input.is_empty() => self.clear(),
            _ => return EventStatus::NotConsumed,
        }
        EventStatus::Consumed
    }

    /// Render the input field.
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Command (/ for commands, q to quit)");

        let inner = block.inner(area);
        block.render(area, buf);

        let (before, after) = self.input.split_at(self.cursor_pos);
        let line = Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::DarkGray)),
            Span::styled(before.to_string(), Style::default().fg(Color::Yellow)),
            Span::styled("▏", Style::default().fg(Color::White)),
            Span::styled(after.to_string(), Style::default().fg(Color::Yellow)),
        ]);
        Paragraph::new(line).render(inner, buf);
    }

    /// Render the autocomplete popup.
    pub fn render_popup(&self, area: Rect, buf: &mut Buffer) {
        if !self.show_popup {
            return;
        }

        let suggestions = self.suggestions();
        if suggestions.is_empty() {
            return;
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Suggestions")
            .style(Style::default().bg(Color::Black));

        let inner = block.inner(area);
        block.render(area, buf);

        let mut y = inner.y;
        for (i, (cmd, desc)) in suggestions.iter().enumerate() {
            if y >= inner.y + inner.height {
                break;
            }

            let style = if i == self.selected_index {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };

            let line = Line::from(vec![
                Span::styled(format!("{:<36}", cmd), style),
                Span::styled(desc.to_string(), style.fg(Color::Gray)),
            ]);

            buf.set_line(inner.x, y, &line, inner.width);
            y += 1;
        }
    }

    /// Parse the current input into a [`Command`].
    ///
    /// Returns Ok(Some(Command)) if a valid command was parsed,
    /// Ok(None) if input is empty or whitespace,
    /// Err(String) if the command is invalid.
    pub fn parse_command(&self) -> Result<Option<Command>, String> {
        let input = self.input.trim();

        if input.is_empty() {
            return Ok(None);
        }

        if !input.starts_with('/') {
            return Err("Invalid command. Commands must start with '/'".to_string());
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts.first().ok_or("Empty command")?;

        match *cmd {
            "/start" => {
                let raw_id = parts.get(1).ok_or("Missing process ID")?;
                let process_id = raw_id
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid process ID: {}", raw_id))?;
                let variables = parse_variables(parts[2..].iter().copied())?;
                Ok(Some(Command::Start {
                    process_id,
                    variables,
                }))
            }
            "/stop" => Ok(Some(Command::Stop)),
            "/clear" => Ok(Some(Command::Clear)),
            "/important" => Ok(Some(Command::ToggleImportant)),
            "/export" => Ok(Some(Command::Export {
                path: parts.get(1).map(PathBuf::from),
            })),
            "/quit" => Ok(Some(Command::Quit)),
            _ => Err(format!("Unknown command: {}", cmd)),
        }
    }
}
