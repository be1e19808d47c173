//! Main entry point for the crewmon-tui binary.
//!
//! This executable runs the console with the configuration found in the
//! current directory. The `crewmon` CLI offers the same UI with flags.

use anyhow::Result;
use cm_core::config::load_config;
use cm_core::telemetry::init_file_logging;
use cm_tui::{run_app, AppOptions};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    init_file_logging(Path::new("crewmon.log"), "info")?;

    let config = load_config(Path::new(".")).await?;
    run_app(AppOptions {
        config,
        auto_start: None,
    })
    .await
}
