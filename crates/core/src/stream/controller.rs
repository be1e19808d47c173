//! Execution stream controller.
//!
//! `ExecutionStream` is the state machine sitting between the execution API,
//! the stream transport and the UI. It issues the start request, binds the
//! returned execution id to a stream connection, interprets every inbound
//! message, and keeps the [`ExecutionStreamState`] record current.
//!
//! Every state change is published as a fine-grained [`Event`] on the
//! controller's event channel, in the order the changes happen.
//!
//! # Transitions
//!
//! ```text
//! idle ──start──▶ connecting ──execution_started──▶ running
//!                                                     │
//!              completed ◀──execution_completed───────┤
//!              failed    ◀──execution_error───────────┤
//!              cancelled ◀──execution_stopped─────────┘
//! ```
//!
//! Terminal messages are accepted from any live state and ignored once the
//! execution is terminal, so completion and failure are reported exactly once.

use crate::api::{stream_url, ApiError, ApiResult, ExecutionApi};
use crate::logs::classify;
use crate::stream::state::ExecutionStreamState;
use crate::transport::{
    Connector, ReconnectPolicy, TransportError, TransportEvent, TransportManager,
};
use chrono::Utc;
use cm_protocol::{
    ClientMessage, ConsoleConfig, Event, ExecuteResponse, ExecutionStatus, LogCategory,
    MessageKind, StreamMessage,
};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Why a start request did not produce a stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    StreamUrl(#[from] TransportError),
}

/// A start request that has been sent but not answered yet.
pub struct PendingStart {
    process_id: u64,
    request: Pin<Box<dyn Future<Output = ApiResult<ExecuteResponse>> + Send>>,
}

impl PendingStart {
    pub fn process_id(&self) -> u64 {
        self.process_id
    }
}

impl Future for PendingStart {
    type Output = ApiResult<ExecuteResponse>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.request.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for PendingStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingStart")
            .field("process_id", &self.process_id)
            .finish_non_exhaustive()
    }
}

/// Drives one execution at a time from start request to terminal status.
pub struct ExecutionStream {
    api: Arc<dyn ExecutionApi>,
    transport: TransportManager,
    state: ExecutionStreamState,
    events_tx: mpsc::UnboundedSender<Event>,
    /// Connection flag and error last published to the UI.
    published_connection: (bool, Option<String>),
}

impl ExecutionStream {
    /// Create an idle controller.
    ///
    /// # Arguments
    ///
    /// * `config` - Log capacity and reconnection settings
    /// * `api` - Client used to start executions
    /// * `connector` - Opens stream connections
    /// * `events_tx` - Channel for sending events to the UI
    pub fn new(
        config: &ConsoleConfig,
        api: Arc<dyn ExecutionApi>,
        connector: Arc<dyn Connector>,
        events_tx: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let policy = ReconnectPolicy::from(config.stream);
        Self {
            api,
            transport: TransportManager::new(connector, policy),
            state: ExecutionStreamState::new(config.max_logs),
            events_tx,
            published_connection: (false, None),
        }
    }

    pub fn state(&self) -> &ExecutionStreamState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Last transport error, independent of the execution status.
    pub fn connection_error(&self) -> Option<&str> {
        self.transport.last_error()
    }

    pub fn transport(&self) -> &TransportManager {
        &self.transport
    }

    /// Start executing `process_id` and subscribe to its stream.
    ///
    /// Any open stream is closed and the state is reset to `connecting`
    /// (with the events published) before the start request is sent. On
    /// success the stream connection is initiated and the execution id is
    /// returned; messages then arrive through
    /// [`next_transport_event`](Self::next_transport_event).
    ///
    /// Callers that must keep handling other inputs while the request is in
    /// flight use [`begin_start`](Self::begin_start) and
    /// [`finish_start`](Self::finish_start) instead.
    ///
    /// # Errors
    ///
    /// Returns `StartError` when the backend rejects the request, cannot be
    /// reached, or the stream address cannot be derived. The state is then
    /// `failed` with `last_error` set.
    pub async fn start(
        &mut self,
        process_id: u64,
        variables: BTreeMap<String, String>,
    ) -> Result<u64, StartError> {
        let mut pending = self.begin_start(process_id, variables);
        let result = (&mut pending).await;
        self.finish_start(pending, result)
    }

    /// Reset to `connecting` and prepare the start request.
    ///
    /// The request goes out once the returned future is first polled. It owns
    /// everything it needs, so dropping it abandons the start.
    pub fn begin_start(
        &mut self,
        process_id: u64,
        variables: BTreeMap<String, String>,
    ) -> PendingStart {
        self.transport.disconnect();
        self.state.reset();
        self.state.status = ExecutionStatus::Connecting;
        self.state.variables = variables;

        self.publish(Event::LogsCleared);
        self.publish(Event::ProgressUpdated { progress: None });
        self.emit_status();
        self.publish_connection();

        info!(process_id, "starting execution for process {process_id}");
        let api = Arc::clone(&self.api);
        let variables = self.state.variables.clone();
        PendingStart {
            process_id,
            request: Box::pin(async move { api.start_execution(process_id, &variables).await }),
        }
    }

    /// Apply the answer to a request from [`begin_start`](Self::begin_start).
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    pub fn finish_start(
        &mut self,
        pending: PendingStart,
        result: ApiResult<ExecuteResponse>,
    ) -> Result<u64, StartError> {
        let started = match result {
            Ok(started) => started,
            Err(e) => {
                self.fail_start(&e.to_string());
                return Err(e.into());
            }
        };

        let execution_id = started.execution_id;
        debug!(process_id = pending.process_id, execution_id, "start request answered");
        self.state.execution_id = Some(execution_id);
        self.emit_status();

        let url = match stream_url(self.api.base_url(), execution_id) {
            Ok(url) => url,
            Err(e) => {
                self.fail_start(&e.to_string());
                return Err(e.into());
            }
        };

        info!(execution_id, url = %url, "connecting to execution stream");
        self.transport.connect(&url);
        Ok(execution_id)
    }

    /// Give up on a start request that has not been answered.
    ///
    /// No execution id is known, so nothing can be signalled to the backend.
    /// The attempt is recorded as `cancelled`.
    pub fn abandon_start(&mut self, pending: PendingStart) {
        info!(process_id = pending.process_id, "abandoning start request");
        drop(pending);
        self.finish(ExecutionStatus::Cancelled, None);
        self.append(
            "🛑 Start cancelled before the execution began",
            LogCategory::Warning,
            true,
        );
    }

    /// Ask the backend to stop the execution and close the stream.
    ///
    /// The stop signal is only sent when there is an execution id and an open
    /// connection; the stream is closed either way. The status is left alone:
    /// only the backend's `execution_stopped` confirmation cancels the
    /// execution, and closing the stream may prevent it from arriving.
    pub fn stop(&mut self) {
        if let Some(execution_id) = self.state.execution_id {
            if self.transport.is_connected() {
                info!(execution_id, "sending stop signal");
                if let Err(e) = self
                    .transport
                    .send_message(&ClientMessage::StopExecution { execution_id })
                {
                    warn!(error = %e, execution_id, "failed to send stop signal");
                }
                self.append("🛑 Stop signal sent", LogCategory::Warning, true);
            }
        }

        self.transport.disconnect();
        self.publish_connection();
    }

    /// Empty the log buffer.
    ///
    /// A live execution keeps its status and progress. Otherwise the whole
    /// record returns to `idle`.
    pub fn clear_logs(&mut self) {
        if self.state.status.is_active() {
            self.state.logs.clear();
            self.publish(Event::LogsCleared);
            return;
        }

        self.state.reset();
        self.publish(Event::LogsCleared);
        self.publish(Event::ProgressUpdated { progress: None });
        self.emit_status();
    }

    /// Close the stream for good.
    pub fn shutdown(&mut self) {
        debug!("shutting down execution stream");
        self.transport.disconnect();
        self.publish_connection();
    }

    /// Wait for the next transport event. Cancel-safe.
    pub async fn next_transport_event(&mut self) -> TransportEvent {
        self.transport.next_event().await
    }

    /// Apply one transport event to the execution state.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => {
                debug!("execution stream opened");
            }
            TransportEvent::Message(message) => self.handle_message(message),
            TransportEvent::MalformedMessage(detail) => {
                self.append(
                    format!("⚠️ Malformed stream message: {detail}"),
                    LogCategory::Warning,
                    false,
                );
            }
            TransportEvent::Error(detail) => {
                debug!(error = %detail, "execution stream error");
                self.append("❌ Connection error", LogCategory::Error, true);
            }
            TransportEvent::Closed => {
                if self.state.status == ExecutionStatus::Running {
                    self.append(
                        "🔌 Connection lost during execution",
                        LogCategory::Warning,
                        true,
                    );
                }
            }
            TransportEvent::ReconnectScheduled {
                attempt,
                max_attempts,
                ..
            } => {
                debug!(attempt, max_attempts, "execution stream reconnect scheduled");
            }
            TransportEvent::ReconnectExhausted => {
                warn!(
                    status = %self.state.status,
                    "execution stream gave up reconnecting"
                );
            }
        }
        self.publish_connection();
    }

    /// Apply one decoded stream message.
    pub fn handle_message(&mut self, message: StreamMessage) {
        match message.kind() {
            MessageKind::ConnectionEstablished => {
                self.append(
                    "🔌 Connected to execution stream",
                    LogCategory::Success,
                    false,
                );
                if !self.state.status.is_terminal() {
                    self.state.status = ExecutionStatus::Connecting;
                    self.emit_status();
                }
            }
            MessageKind::ExecutionStarted => self.on_started(message),
            MessageKind::Output => self.on_output(message),
            MessageKind::ExecutionCompleted => {
                if self.ignore_after_terminal("execution_completed") {
                    return;
                }
                self.finish(ExecutionStatus::Completed, message.execution_id);
                self.append(
                    "🎉 Execution completed successfully!",
                    LogCategory::Success,
                    true,
                );
                if let Some(execution_id) = self.state.execution_id {
                    info!(execution_id, "execution completed");
                    self.publish(Event::ExecutionCompleted { execution_id });
                }
            }
            MessageKind::ExecutionError => {
                if self.ignore_after_terminal("execution_error") {
                    return;
                }
                let error = message
                    .error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string());
                self.state.last_error = Some(error.clone());
                self.finish(ExecutionStatus::Failed, message.execution_id);

                self.append(
                    format!("❌ Execution failed: {error}"),
                    LogCategory::Error,
                    true,
                );
                if let Some(traceback) = &message.traceback {
                    self.append(
                        format!("🔍 Traceback: {traceback}"),
                        LogCategory::Error,
                        false,
                    );
                }
                if let Some(execution_id) = self.state.execution_id {
                    warn!(execution_id, error = %error, "execution failed");
                    self.publish(Event::ExecutionFailed {
                        execution_id,
                        error,
                    });
                }
            }
            MessageKind::ExecutionStopped => {
                if self.ignore_after_terminal("execution_stopped") {
                    return;
                }
                self.finish(ExecutionStatus::Cancelled, message.execution_id);
                self.append("🛑 Execution stopped", LogCategory::Warning, true);
            }
            MessageKind::Unknown(kind) => {
                warn!(kind = %kind, "unknown stream message type");
                self.append(
                    format!("📩 Unknown message: {kind}"),
                    LogCategory::Warning,
                    false,
                );
            }
        }
    }

    fn on_started(&mut self, message: StreamMessage) {
        if self.ignore_after_terminal("execution_started") {
            return;
        }

        let StreamMessage {
            execution_id,
            process_name,
            variables,
            ..
        } = message;

        self.state.status = ExecutionStatus::Running;
        if execution_id.is_some() {
            self.state.execution_id = execution_id;
        }
        self.state.process_name = process_name;
        self.state.started_at = Some(Utc::now());
        self.state.ended_at = None;

        let echoed = variables.as_ref().map_or(0, BTreeMap::len);
        if let Some(variables) = variables {
            self.state.variables = variables;
        }
        self.emit_status();

        let name = self
            .state
            .process_name
            .clone()
            .unwrap_or_else(|| "unknown process".to_string());
        info!(execution_id = ?self.state.execution_id, process = %name, "execution started");
        self.append(
            format!("🚀 Execution started for: {name}"),
            LogCategory::Success,
            true,
        );
        if echoed > 0 {
            self.append(
                format!("📋 Variables: {echoed} provided"),
                LogCategory::Info,
                false,
            );
        }
    }

    fn on_output(&mut self, message: StreamMessage) {
        let Some(content) = message.content else {
            return;
        };
        let text = content.trim();
        if text.is_empty() {
            return;
        }

        let classification = classify(text);
        if let Some(progress) = classification.progress {
            self.state.progress = Some(progress.clone());
            self.publish(Event::ProgressUpdated {
                progress: Some(progress),
            });
        }
        self.append(text, classification.category, classification.important);
    }

    fn ignore_after_terminal(&self, kind: &str) -> bool {
        if self.state.status.is_terminal() {
            debug!(kind, status = %self.state.status, "ignoring message after terminal status");
            return true;
        }
        false
    }

    fn finish(&mut self, status: ExecutionStatus, execution_id: Option<u64>) {
        self.state.status = status;
        self.state.ended_at = Some(Utc::now());
        if self.state.execution_id.is_none() {
            self.state.execution_id = execution_id;
        }
        self.emit_status();
    }

    fn fail_start(&mut self, error: &str) {
        warn!(error = %error, "failed to start execution");
        self.state.status = ExecutionStatus::Failed;
        self.state.last_error = Some(error.to_string());
        self.emit_status();
        self.append(
            format!("❌ Failed to start execution: {error}"),
            LogCategory::Error,
            true,
        );
    }

    fn append(&mut self, text: impl Into<String>, category: LogCategory, important: bool) {
        let entry = self.state.logs.push(text, category, important);
        self.publish(Event::LogAppended { entry });
    }

    fn emit_status(&self) {
        self.publish(Event::StatusChanged {
            status: self.state.status,
            execution_id: self.state.execution_id,
            process_name: self.state.process_name.clone(),
            started_at: self.state.started_at,
            ended_at: self.state.ended_at,
            error: self.state.last_error.clone(),
        });
    }

    /// Publish the connection flag and error if either changed.
    fn publish_connection(&mut self) {
        let current = (
            self.transport.is_connected(),
            self.transport.last_error().map(str::to_string),
        );
        if current != self.published_connection {
            self.published_connection = current.clone();
            self.publish(Event::ConnectionChanged {
                connected: current.0,
                error: current.1,
            });
        }
    }

    /// Send an event on the controller's channel.
    pub fn publish(&self, event: Event) {
        // The UI may already be gone during shutdown.
        let _ = self.events_tx.send(event);
    }
}
