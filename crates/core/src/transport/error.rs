//! Error types for the stream transport.

use thiserror::Error;

/// Errors reported by connectors and the transport manager.
///
/// None of these are fatal to the console: the manager turns them into
/// observable state and, for failed opens, into reconnect attempts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The stream address could not be built or parsed.
    #[error("Invalid stream URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Opening the channel failed (refused, handshake rejected, DNS, ...).
    #[error("Failed to connect to {url}: {reason}")]
    ConnectFailed { url: String, reason: String },

    /// A send was attempted while no channel is open.
    #[error("Stream not connected")]
    NotConnected,

    /// The channel rejected an outbound frame.
    #[error("Failed to send message: {0}")]
    SendFailed(String),
}

/// Type alias for Result with TransportError.
pub type TransportResult<T> = Result<T, TransportError>;
