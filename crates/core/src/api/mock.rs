//! Scripted execution API for tests.

use crate::api::error::{ApiError, ApiResult};
use crate::api::ExecutionApi;
use async_trait::async_trait;
use cm_protocol::ExecuteResponse;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

/// One recorded `start_execution` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartCall {
    pub process_id: u64,
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct MockApiState {
    responses: VecDeque<ApiResult<ExecuteResponse>>,
    calls: Vec<StartCall>,
}

/// Execution API that answers from a script.
///
/// Unscripted calls succeed with execution id `1`. With a gate installed,
/// every call waits for [`release`](Self::release) before answering, which
/// lets tests observe the state while a start request is in flight.
#[derive(Debug, Clone)]
pub struct MockExecutionApi {
    base_url: String,
    state: Arc<Mutex<MockApiState>>,
    gate: Option<Arc<Notify>>,
}

impl MockExecutionApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            state: Arc::new(Mutex::new(MockApiState::default())),
            gate: None,
        }
    }

    /// Hold every call until [`release`](Self::release) is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    /// Let one held call answer.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockApiState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answer the next call with this execution id.
    pub fn respond_with(&self, execution_id: u64) {
        self.lock().responses.push_back(Ok(ExecuteResponse {
            execution_id,
            message: Some("Execution started".to_string()),
            websocket_url: None,
        }));
    }

    /// Fail the next call with this error.
    pub fn fail_with(&self, error: ApiError) {
        self.lock().responses.push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<StartCall> {
        self.lock().calls.clone()
    }
}

#[async_trait]
impl ExecutionApi for MockExecutionApi {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn start_execution(
        &self,
        process_id: u64,
        variables: &BTreeMap<String, String>,
    ) -> ApiResult<ExecuteResponse> {
        self.lock().calls.push(StartCall {
            process_id,
            variables: variables.clone(),
        });

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.lock().responses.pop_front().unwrap_or_else(|| {
            Ok(ExecuteResponse {
                execution_id: 1,
                message: None,
                websocket_url: None,
            })
        })
    }
}
