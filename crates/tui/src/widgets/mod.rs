//! TUI widgets module.
//!
//! This module contains reusable widgets for the TUI.

pub mod command_composer;
pub mod log_view;
pub mod progress;
pub mod status_panel;

pub use command_composer::{Command, CommandComposer};
pub use log_view::LogView;
pub use progress::render_progress;
pub use status_panel::render_status_panel;
