//! Execution stream wire messages.
//!
//! The backend pushes one JSON object per stream frame. Every frame carries a
//! `type` discriminator plus a loose set of optional fields, so inbound frames
//! are decoded into the flat [`StreamMessage`] record first and only then
//! interpreted through [`StreamMessage::kind`]. This keeps unknown `type`
//! values decodable: they surface as [`MessageKind::Unknown`] instead of a
//! parse failure.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

/// Inbound stream frame as sent by the backend.
///
/// ```json
/// {
///   "type": "output",
///   "execution_id": 7,
///   "content": "Step 1/2: Researching",
///   "timestamp": 1712.5
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, TS)]
pub struct StreamMessage {
    /// Message discriminator, see [`MessageKind`].
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<u64>,

    /// Output text, present for `output`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Failure description, present for `execution_error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,

    /// Free-form note some kinds carry (e.g. `execution_stopped`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, String>>,

    /// Backend clock reading at emission. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl StreamMessage {
    /// Create a message of the given kind with every optional field empty.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Decode one text frame.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Interpret the `type` discriminator.
    pub fn kind(&self) -> MessageKind {
        MessageKind::from_wire(&self.kind)
    }
}

/// Recognized inbound message kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    ConnectionEstablished,
    ExecutionStarted,
    Output,
    ExecutionCompleted,
    ExecutionError,
    ExecutionStopped,
    /// Any other discriminator, kept verbatim for the warning log.
    Unknown(String),
}

impl MessageKind {
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "connection_established" => MessageKind::ConnectionEstablished,
            "execution_started" => MessageKind::ExecutionStarted,
            "output" => MessageKind::Output,
            "execution_completed" => MessageKind::ExecutionCompleted,
            "execution_error" => MessageKind::ExecutionError,
            "execution_stopped" => MessageKind::ExecutionStopped,
            other => MessageKind::Unknown(other.to_string()),
        }
    }
}

/// Outbound stream frame sent by the console.
///
/// ```json
/// { "type": "stop_execution", "execution_id": 7 }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask the backend to stop the given execution.
    StopExecution { execution_id: u64 },
}

impl ClientMessage {
    /// Encode as a text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
