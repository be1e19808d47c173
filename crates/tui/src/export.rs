//! Plain-text export of the log buffer.

use anyhow::Context;
use anyhow::Result;
use chrono::DateTime;
use chrono::Local;
use chrono::TimeZone;
use chrono::Utc;
use cm_protocol::ExecutionLogEntry;
use std::path::Path;
use std::path::PathBuf;

/// Default export file name for an execution.
pub fn default_export_path(execution_id: Option<u64>) -> PathBuf {
    match execution_id {
        Some(id) => PathBuf::from(format!("execution-{id}-logs.txt")),
        None => PathBuf::from("execution-unknown-logs.txt"),
    }
}

/// Render entries as `[HH:MM:SS] text` lines in the local timezone.
pub fn format_logs(entries: &[ExecutionLogEntry]) -> String {
    format_logs_in(entries, &Local)
}

/// Same as [`format_logs`] with an explicit timezone.
pub fn format_logs_in<Tz>(entries: &[ExecutionLogEntry], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    entries
        .iter()
        .map(|entry| format!("[{}] {}", clock(&entry.timestamp, tz), entry.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a timestamp as `HH:MM:SS`.
pub fn clock<Tz>(timestamp: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    timestamp.with_timezone(tz).format("%H:%M:%S").to_string()
}

/// Write the whole buffer to `path`, returning the number of lines written.
pub fn export_logs(entries: &[ExecutionLogEntry], path: &Path) -> Result<usize> {
    let mut text = format_logs(entries);
    if !text.is_empty() {
        text.push('\n');
    }
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write log export to {}", path.display()))?;
    Ok(entries.len())
}
