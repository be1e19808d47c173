//! Stream transport layer.
//!
//! This module provides:
//! - The `Connector` abstraction that opens one bidirectional text channel
//! - A WebSocket connector built on tokio-tungstenite
//! - `TransportManager`, which owns at most one connection and hides the
//!   reconnection policy from its caller
//! - An in-memory connector for tests

pub mod connector;
pub mod error;
pub mod manager;
pub mod mock;
pub mod ws;

pub use connector::{ChannelHandle, Connector, InboundFrame, OutboundFrame};
pub use error::TransportError;
pub use manager::{ConnectionState, ReconnectPolicy, TransportEvent, TransportManager};
pub use mock::{MockConnector, MockServer};
pub use ws::WsConnector;
