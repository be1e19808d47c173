//! Connector abstraction over a bidirectional text channel.
//!
//! A connector opens one channel and hands back a [`ChannelHandle`]: a
//! receiver of inbound frames and a sender of outbound frames. The channel is
//! considered closed once the inbound receiver yields `None`; dropping the
//! outbound sender asks the underlying connection to close.

use crate::transport::error::TransportResult;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// WebSocket close code for a normal, user-initiated closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// A frame received from the remote end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// One text payload, expected to be a JSON stream message.
    Text(String),
    /// A transport-level error. The channel may still deliver frames; closure
    /// is signalled separately by the end of the inbound stream.
    Error(String),
}

/// A frame to deliver to the remote end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close { code: u16, reason: String },
}

/// Both halves of an open channel.
#[derive(Debug)]
pub struct ChannelHandle {
    pub inbound: mpsc::UnboundedReceiver<InboundFrame>,
    pub outbound: mpsc::UnboundedSender<OutboundFrame>,
}

/// Opens stream channels.
///
/// Implementations must not retry on their own; reconnection policy belongs
/// to [`TransportManager`](crate::transport::TransportManager).
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a channel to `url`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ConnectFailed` or `TransportError::InvalidUrl`
    /// when no channel could be established.
    async fn open(&self, url: &str) -> TransportResult<ChannelHandle>;
}
