//! Test fixtures for stream messages and wired-up services.

use cm_core::api::MockExecutionApi;
use cm_core::stream::{ExecutionService, ServiceHandle};
use cm_core::transport::MockConnector;
use cm_protocol::{ConsoleConfig, StreamMessage, StreamSettings};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Base URL the mock API pretends to serve.
#[allow(dead_code)]
pub const TEST_API_BASE: &str = "http://backend.test/api/v1";

/// Config with the stream caller's reconnect policy and a small buffer.
#[allow(dead_code)]
pub fn test_config() -> ConsoleConfig {
    ConsoleConfig {
        api_base_url: TEST_API_BASE.to_string(),
        max_logs: 100,
        request_timeout_ms: 5000,
        stream: StreamSettings {
            reconnect_attempts: 3,
            reconnect_delay_ms: 2000,
        },
    }
}

/// Spawn a service wired to in-memory doubles.
#[allow(dead_code)]
pub fn spawn_mock_service(api: &MockExecutionApi, connector: &MockConnector) -> ServiceHandle {
    ExecutionService::spawn(
        &test_config(),
        Arc::new(api.clone()),
        Arc::new(connector.clone()),
    )
}

#[allow(dead_code)]
pub fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[allow(dead_code)]
pub fn connection_established() -> StreamMessage {
    StreamMessage::new("connection_established")
}

#[allow(dead_code)]
pub fn execution_started(execution_id: u64, process_name: &str) -> StreamMessage {
    StreamMessage {
        execution_id: Some(execution_id),
        process_name: Some(process_name.to_string()),
        ..StreamMessage::new("execution_started")
    }
}

#[allow(dead_code)]
pub fn output(content: &str) -> StreamMessage {
    StreamMessage {
        content: Some(content.to_string()),
        ..StreamMessage::new("output")
    }
}

#[allow(dead_code)]
pub fn execution_completed(execution_id: u64) -> StreamMessage {
    StreamMessage {
        execution_id: Some(execution_id),
        ..StreamMessage::new("execution_completed")
    }
}

#[allow(dead_code)]
pub fn execution_stopped(execution_id: u64) -> StreamMessage {
    StreamMessage {
        execution_id: Some(execution_id),
        ..StreamMessage::new("execution_stopped")
    }
}
