//! WebSocket connector built on tokio-tungstenite.
//!
//! Each opened socket is split into a reader task and a writer task that
//! bridge it to the plain channels of a [`ChannelHandle`]. Ping/pong is
//! answered by tungstenite itself; only text (and UTF-8 binary) payloads are
//! forwarded.

use crate::transport::connector::{ChannelHandle, Connector, InboundFrame, OutboundFrame};
use crate::transport::error::{TransportError, TransportResult};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Opens `ws://` and `wss://` execution streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &str) -> TransportResult<ChannelHandle> {
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(TransportError::InvalidUrl {
                url: url.to_string(),
                reason: "expected a ws:// or wss:// address".to_string(),
            });
        }

        let (socket, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            TransportError::ConnectFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;
        debug!(url, "websocket handshake completed");

        let (mut sink, mut stream) = socket.split();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundFrame>();

        // Writer: drains outbound frames until a close frame or until the
        // handle's sender is dropped.
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                match frame {
                    OutboundFrame::Text(text) => {
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            warn!(error = %e, "websocket write failed");
                            break;
                        }
                    }
                    OutboundFrame::Close { code, reason } => {
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: reason.into(),
                        };
                        let _ = sink.send(Message::Close(Some(frame))).await;
                        break;
                    }
                }
            }
            let _ = sink.close().await;
        });

        // Reader: forwards payloads until the socket closes or the handle's
        // receiver is dropped.
        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                let frame = match message {
                    Ok(Message::Text(text)) => InboundFrame::Text(text.to_string()),
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => InboundFrame::Text(text),
                        Err(_) => InboundFrame::Error("binary frame is not valid UTF-8".to_string()),
                    },
                    Ok(Message::Close(frame)) => {
                        debug!(?frame, "websocket closed by peer");
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = inbound_tx.send(InboundFrame::Error(e.to_string()));
                        break;
                    }
                };
                if inbound_tx.send(frame).is_err() {
                    break;
                }
            }
        });

        Ok(ChannelHandle {
            inbound: inbound_rx,
            outbound: outbound_tx,
        })
    }
}
