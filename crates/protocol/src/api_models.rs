//! HTTP request and response bodies for starting an execution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

/// Body of `POST {base}/processes/{id}/execute/stream`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, TS)]
pub struct ExecuteRequest {
    /// Values substituted into the process's `{placeholder}` variables.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// Successful response of the start request.
///
/// Only `execution_id` is required; the backend also echoes a human-readable
/// message and the relative stream path.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct ExecuteResponse {
    pub execution_id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websocket_url: Option<String>,
}
