//! Tracing subscriber setup shared by the binaries.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Log human-readable lines to stderr.
///
/// Uses `RUST_LOG` if set, otherwise `default_level` (e.g. `"info"` or
/// `"cm_core=debug,warn"`). Safe to call more than once; later calls are
/// no-ops.
pub fn init_stderr_logging(default_level: &str) {
    fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .ok();
}

/// Append log lines to `path`, leaving the terminal to the UI.
///
/// # Errors
///
/// Returns the I/O error if the file cannot be opened for appending.
pub fn init_file_logging(path: &Path, default_level: &str) -> std::io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .ok();

    tracing::info!(path = %path.display(), "file logging initialised");
    Ok(())
}
