//! Actor that owns an [`ExecutionStream`] and serializes all its inputs.
//!
//! The UI talks to the service only through [`Op`]s and [`Event`]s. One
//! loop selects over incoming operations, transport events and the answer
//! to an outstanding start request, and hands each to the controller before
//! taking the next, so stream messages are processed strictly one at a time
//! in arrival order. A start request in flight never holds up other ops.

use crate::api::ExecutionApi;
use crate::api::ApiResult;
use crate::stream::controller::{ExecutionStream, PendingStart};
use crate::transport::Connector;
use cm_protocol::{ConsoleConfig, Event, ExecuteResponse, Op};
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Both ends the UI needs to drive a spawned service.
pub struct ServiceHandle {
    /// Channel to send operations to the core.
    pub op_tx: UnboundedSender<Op>,
    /// Channel to receive events from the core.
    pub event_rx: UnboundedReceiver<Event>,
    /// Completes once the service processed `Op::Shutdown` or lost every sender.
    pub join: JoinHandle<()>,
}

pub struct ExecutionService {
    stream: ExecutionStream,
    op_rx: UnboundedReceiver<Op>,
    pending: Option<PendingStart>,
}

impl ExecutionService {
    pub fn new(stream: ExecutionStream, op_rx: UnboundedReceiver<Op>) -> Self {
        Self {
            stream,
            op_rx,
            pending: None,
        }
    }

    /// Build a controller from `config` and run it on a new task.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use cm_core::api::HttpExecutionApi;
    /// use cm_core::stream::ExecutionService;
    /// use cm_core::transport::WsConnector;
    /// use cm_protocol::{ConsoleConfig, Op};
    /// use std::collections::BTreeMap;
    /// use std::sync::Arc;
    ///
    /// # async fn example() {
    /// let config = ConsoleConfig::default();
    /// let api = Arc::new(HttpExecutionApi::from_config(&config));
    /// let mut handle = ExecutionService::spawn(&config, api, Arc::new(WsConnector));
    ///
    /// let _ = handle.op_tx.send(Op::StartExecution {
    ///     process_id: 42,
    ///     variables: BTreeMap::new(),
    /// });
    /// while let Some(event) = handle.event_rx.recv().await {
    ///     println!("{event:?}");
    /// }
    /// # }
    /// ```
    pub fn spawn(
        config: &ConsoleConfig,
        api: Arc<dyn ExecutionApi>,
        connector: Arc<dyn Connector>,
    ) -> ServiceHandle {
        let (op_tx, op_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let stream = ExecutionStream::new(config, api, connector, event_tx);
        let service = Self::new(stream, op_rx);
        let join = tokio::spawn(service.run());

        ServiceHandle {
            op_tx,
            event_rx,
            join,
        }
    }

    /// Process operations and transport events until shutdown.
    ///
    /// An unanswered start request is dropped on shutdown.
    pub async fn run(mut self) {
        info!("execution service started");
        loop {
            select! {
                op = self.op_rx.recv() => match op {
                    Some(Op::Shutdown) | None => break,
                    Some(op) => self.handle_op(op),
                },
                (process_id, result) = answer(&mut self.pending) => {
                    if let Some(pending) = self.pending.take() {
                        self.finish_start(pending, process_id, result);
                    }
                }
                event = self.stream.next_transport_event() => {
                    self.stream.handle_transport_event(event);
                }
            }
        }
        if let Some(pending) = self.pending.take() {
            debug!(process_id = pending.process_id(), "dropping unanswered start request");
        }
        self.stream.shutdown();
        info!("execution service stopped");
    }

    fn handle_op(&mut self, op: Op) {
        debug!(?op, "handling op");
        match op {
            Op::StartExecution {
                process_id,
                variables,
            } => {
                if let Some(previous) = self.pending.take() {
                    debug!(
                        process_id = previous.process_id(),
                        "replacing unanswered start request"
                    );
                }
                self.pending = Some(self.stream.begin_start(process_id, variables));
            }
            Op::StopExecution => match self.pending.take() {
                Some(pending) => self.stream.abandon_start(pending),
                None => self.stream.stop(),
            },
            Op::ClearLogs => self.stream.clear_logs(),
            Op::Shutdown => {}
        }
    }

    fn finish_start(
        &mut self,
        pending: PendingStart,
        process_id: u64,
        result: ApiResult<ExecuteResponse>,
    ) {
        if let Err(e) = self.stream.finish_start(pending, result) {
            self.stream.publish(Event::StartFailed {
                process_id,
                error: e.to_string(),
            });
        }
    }
}

/// Wait for the outstanding start request, or forever when there is none.
///
/// Cancel-safe: the request stays in `pending` when another branch wins.
async fn answer(pending: &mut Option<PendingStart>) -> (u64, ApiResult<ExecuteResponse>) {
    match pending {
        Some(request) => (request.process_id(), request.await),
        None => std::future::pending().await,
    }
}
