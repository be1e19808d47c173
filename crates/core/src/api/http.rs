//! reqwest-backed execution API client.

use crate::api::error::{ApiError, ApiResult};
use crate::api::{endpoint, ExecutionApi};
use async_trait::async_trait;
use cm_protocol::{ConsoleConfig, ExecuteRequest, ExecuteResponse, DEFAULT_REQUEST_TIMEOUT_MS};
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Talks to the backend over HTTP.
#[derive(Debug, Clone)]
pub struct HttpExecutionApi {
    client: Client,
    base_url: String,
}

impl HttpExecutionApi {
    /// Client with the default request timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS))
    }

    /// Client for the configured backend and request timeout.
    pub fn from_config(config: &ConsoleConfig) -> Self {
        Self::with_timeout(
            config.api_base_url.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    /// Client whose requests fail with `ApiError::Network` after `timeout`.
    ///
    /// The limit covers connecting as well as waiting for the answer.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "cannot build http client with timeouts, using defaults");
                Client::new()
            });
        Self::with_client(client, base_url)
    }

    /// Use a preconfigured client (timeouts, proxies, ...).
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ExecutionApi for HttpExecutionApi {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn start_execution(
        &self,
        process_id: u64,
        variables: &BTreeMap<String, String>,
    ) -> ApiResult<ExecuteResponse> {
        let url = endpoint(
            &self.base_url,
            &format!("/processes/{process_id}/execute/stream"),
        );
        debug!(url = %url, process_id, "requesting execution start");

        let body = ExecuteRequest {
            variables: variables.clone(),
        };
        let resp = self.client.post(&url).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), process_id, "execution start rejected");
            return Err(ApiError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let started = resp.json::<ExecuteResponse>().await?;
        debug!(execution_id = started.execution_id, "execution start accepted");
        Ok(started)
    }
}
