//! # cm-tui
//!
//! Terminal User Interface for crewmon.
//!
//! This crate provides the interactive console for watching a single
//! execution stream. It communicates with `cm-core` via channels using
//! the `Op` and `Event` protocol defined in `cm-protocol`.

pub mod app;
pub mod event;
pub mod event_handler;
pub mod export;
pub mod tui;
pub mod view;
pub mod widgets;

pub use app::App;
pub use tui::Tui;

use anyhow::Result;
use cm_core::api::HttpExecutionApi;
use cm_core::stream::ExecutionService;
use cm_core::transport::WsConnector;
use cm_protocol::{ConsoleConfig, Op};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Launch options for [`run_app`].
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub config: ConsoleConfig,
    /// Process to start as soon as the UI is up, with its variables.
    pub auto_start: Option<(u64, BTreeMap<String, String>)>,
}

/// Run the console until the user quits.
///
/// Spawns the core service against the configured backend, drives the
/// terminal, and shuts the service down on exit so the stream is closed.
pub async fn run_app(options: AppOptions) -> Result<()> {
    let AppOptions { config, auto_start } = options;

    let api = Arc::new(HttpExecutionApi::from_config(&config));
    let handle = ExecutionService::spawn(&config, api, Arc::new(WsConnector::new()));
    tracing::info!(api = %config.api_base_url, "console starting");

    if let Some((process_id, variables)) = auto_start {
        let _ = handle.op_tx.send(Op::StartExecution {
            process_id,
            variables,
        });
    }

    let op_tx = handle.op_tx.clone();
    let mut app = App::new(config.max_logs, handle.op_tx, handle.event_rx);

    let result = {
        let mut tui = Tui::init()?;
        let result = app.run(&mut tui).await;
        tui.restore()?;
        result
    };

    let _ = op_tx.send(Op::Shutdown);
    if let Err(e) = handle.join.await {
        tracing::warn!(error = %e, "core service ended abnormally");
    }
    tracing::info!("console stopped");

    result
}
