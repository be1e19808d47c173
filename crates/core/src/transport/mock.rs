//! In-memory connector for testing.
//!
//! `MockConnector` hands out channel pairs instead of network connections.
//! Each accepted open produces a [`MockServer`] that a test takes with
//! [`MockConnector::take_server`] and drives directly: push frames to the
//! client, read what the client sent, or drop it to simulate the remote end
//! closing the connection.

use crate::transport::connector::{ChannelHandle, Connector, InboundFrame, OutboundFrame};
use crate::transport::error::{TransportError, TransportResult};
use async_trait::async_trait;
use cm_protocol::StreamMessage;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Scripted outcome of one open call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Accept,
    Refuse(String),
}

#[derive(Debug, Default)]
struct MockState {
    outcomes: VecDeque<OpenOutcome>,
    opened_urls: Vec<String>,
    servers: VecDeque<MockServer>,
}

/// Connector whose open calls succeed unless scripted otherwise.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector whose every open is refused until scripted otherwise.
    pub fn refusing(times: usize) -> Self {
        let connector = Self::new();
        for _ in 0..times {
            connector.refuse_next("connection refused");
        }
        connector
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Script the outcome of the next unscripted open call.
    pub fn push_outcome(&self, outcome: OpenOutcome) {
        self.lock().outcomes.push_back(outcome);
    }

    /// Refuse the next unscripted open call.
    pub fn refuse_next(&self, reason: &str) {
        self.push_outcome(OpenOutcome::Refuse(reason.to_string()));
    }

    /// Number of open calls made so far, accepted or refused.
    pub fn open_count(&self) -> usize {
        self.lock().opened_urls.len()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.lock().opened_urls.clone()
    }

    /// Take the server end of the oldest accepted connection not yet taken.
    pub fn take_server(&self) -> Option<MockServer> {
        self.lock().servers.pop_front()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, url: &str) -> TransportResult<ChannelHandle> {
        let mut state = self.lock();
        state.opened_urls.push(url.to_string());

        match state.outcomes.pop_front().unwrap_or(OpenOutcome::Accept) {
            OpenOutcome::Accept => {
                let (to_client, inbound) = mpsc::unbounded_channel();
                let (outbound, from_client) = mpsc::unbounded_channel();
                state.servers.push_back(MockServer {
                    url: url.to_string(),
                    to_client,
                    from_client,
                });
                Ok(ChannelHandle { inbound, outbound })
            }
            OpenOutcome::Refuse(reason) => Err(TransportError::ConnectFailed {
                url: url.to_string(),
                reason,
            }),
        }
    }
}

/// Server end of one in-memory connection.
///
/// Dropping it (or calling [`close`](Self::close)) ends the client's inbound
/// stream, which the client observes as the connection closing.
#[derive(Debug)]
pub struct MockServer {
    pub url: String,
    to_client: mpsc::UnboundedSender<InboundFrame>,
    from_client: mpsc::UnboundedReceiver<OutboundFrame>,
}

impl MockServer {
    /// Push a raw text frame. Returns false once the client side is gone.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.to_client.send(InboundFrame::Text(text.into())).is_ok()
    }

    /// Push a stream message encoded as JSON.
    pub fn send_message(&self, message: &StreamMessage) -> bool {
        match serde_json::to_string(message) {
            Ok(text) => self.send_text(text),
            Err(_) => false,
        }
    }

    /// Push a transport error without closing the connection.
    pub fn send_error(&self, detail: impl Into<String>) -> bool {
        self.to_client.send(InboundFrame::Error(detail.into())).is_ok()
    }

    /// Wait for the next frame the client sent.
    ///
    /// Returns `None` once the client dropped its outbound sender.
    pub async fn recv(&mut self) -> Option<OutboundFrame> {
        self.from_client.recv().await
    }

    /// Take a frame the client already sent, without waiting.
    pub fn try_recv(&mut self) -> Option<OutboundFrame> {
        self.from_client.try_recv().ok()
    }

    /// Close the connection from the server side.
    pub fn close(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accepts_by_default_and_records_urls() {
        let connector = MockConnector::new();

        let handle = connector.open("ws://a/1").await;
        assert!(handle.is_ok());
        assert_eq!(connector.open_count(), 1);
        assert_eq!(connector.opened_urls(), vec!["ws://a/1".to_string()]);

        let server = connector.take_server().unwrap();
        assert_eq!(server.url, "ws://a/1");
        assert!(connector.take_server().is_none());
    }

    #[tokio::test]
    async fn test_scripted_refusal() {
        let connector = MockConnector::refusing(1);

        let first = connector.open("ws://a/1").await;
        assert!(matches!(first, Err(TransportError::ConnectFailed { .. })));

        let second = connector.open("ws://a/1").await;
        assert!(second.is_ok());
        assert_eq!(connector.open_count(), 2);
    }

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let connector = MockConnector::new();
        let mut handle = connector.open("ws://a/1").await.unwrap();
        let mut server = connector.take_server().unwrap();

        assert!(server.send_text("hello"));
        assert_eq!(
            handle.inbound.recv().await,
            Some(InboundFrame::Text("hello".to_string()))
        );

        handle
            .outbound
            .send(OutboundFrame::Text("stop".to_string()))
            .unwrap();
        assert_eq!(
            server.recv().await,
            Some(OutboundFrame::Text("stop".to_string()))
        );

        server.close();
        assert_eq!(handle.inbound.recv().await, None);
    }
}
