//! Console configuration models for `.crewmon/config.toml`.
//!
//! This module defines the structure of the configuration file that controls
//! where the console reaches the backend and how it buffers and reconnects.

use serde::Deserialize;
use serde::Serialize;
use ts_rs::TS;

/// Default HTTP API base of a locally running backend.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Default log buffer capacity.
pub const DEFAULT_MAX_LOGS: usize = 1000;

/// Default limit for one execution API request, in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Represents the settings from `.crewmon/config.toml`.
///
/// Every field is optional in the file; missing fields fall back to the
/// defaults of a local development backend.
///
/// # Example
///
/// ```toml
/// # .crewmon/config.toml
/// api-base-url = "https://crews.example.com/api/v1"
/// max-logs = 5000
/// request-timeout-ms = 10000
///
/// [stream]
/// reconnect-attempts = 3
/// reconnect-delay-ms = 2000
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConsoleConfig {
    /// HTTP base of the backend API, e.g. `http://localhost:8000/api/v1`.
    ///
    /// The stream address is derived from it by swapping the scheme.
    pub api_base_url: String,

    /// Maximum number of log entries retained per execution.
    #[ts(type = "number")]
    pub max_logs: usize,

    /// Upper bound for one execution API request, connecting included.
    #[ts(type = "number")]
    pub request_timeout_ms: u64,

    /// Reconnection policy used for execution streams.
    pub stream: StreamSettings,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            max_logs: DEFAULT_MAX_LOGS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            stream: StreamSettings::default(),
        }
    }
}

/// Reconnection settings for the execution stream.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case", default)]
pub struct StreamSettings {
    /// How many automatic reconnects are attempted after an unexpected close.
    pub reconnect_attempts: u32,

    /// Fixed delay before each reconnect, in milliseconds.
    #[ts(type = "number")]
    pub reconnect_delay_ms: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            reconnect_attempts: 3,
            reconnect_delay_ms: 2000,
        }
    }
}
