//! Execution control API.
//!
//! Starting an execution is a plain HTTP request. The backend answers with
//! the execution id, and the live output is then read from a separate stream
//! endpoint derived from the same base URL by [`stream_url`].

pub mod error;
pub mod http;
pub mod mock;

pub use error::{ApiError, ApiResult};
pub use http::HttpExecutionApi;
pub use mock::MockExecutionApi;

use crate::transport::TransportError;
use async_trait::async_trait;
use cm_protocol::ExecuteResponse;
use std::collections::BTreeMap;
use url::Url;

/// Client for the backend's execution control endpoints.
#[async_trait]
pub trait ExecutionApi: Send + Sync {
    /// Base URL every endpoint (and the stream address) is derived from.
    fn base_url(&self) -> &str;

    /// Ask the backend to start `process_id` with the given variables.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` for non-2xx answers and
    /// `ApiError::Network`/`ApiError::Decode` when no usable answer arrived.
    async fn start_execution(
        &self,
        process_id: u64,
        variables: &BTreeMap<String, String>,
    ) -> ApiResult<ExecuteResponse>;
}

/// Build the stream address for an execution.
///
/// The scheme of `api_base_url` is swapped (`http` to `ws`, `https` to
/// `wss`) and `/processes/ws/execution/{execution_id}` is appended to its
/// path.
///
/// # Errors
///
/// Returns `TransportError::InvalidUrl` if the base URL does not parse or is
/// not an http(s) URL.
///
/// # Example
///
/// ```rust
/// use cm_core::api::stream_url;
///
/// let url = stream_url("http://localhost:8000/api/v1", 7).unwrap();
/// assert_eq!(url, "ws://localhost:8000/api/v1/processes/ws/execution/7");
/// ```
pub fn stream_url(api_base_url: &str, execution_id: u64) -> Result<String, TransportError> {
    let invalid = |reason: &str| TransportError::InvalidUrl {
        url: api_base_url.to_string(),
        reason: reason.to_string(),
    };

    let mut url = Url::parse(api_base_url).map_err(|e| invalid(&e.to_string()))?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        _ => return Err(invalid("expected an http or https URL")),
    };
    url.set_scheme(scheme)
        .map_err(|_| invalid("cannot switch to a stream scheme"))?;

    let path = format!(
        "{}/processes/ws/execution/{}",
        url.path().trim_end_matches('/'),
        execution_id
    );
    url.set_path(&path);

    Ok(url.to_string())
}

/// Join an endpoint path onto the API base URL.
pub(crate) fn endpoint(api_base_url: &str, path: &str) -> String {
    format!("{}{}", api_base_url.trim_end_matches('/'), path)
}
