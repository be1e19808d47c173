//! Transport connection manager.
//!
//! `TransportManager` owns at most one stream connection. It opens channels
//! through a [`Connector`], decodes inbound frames into [`StreamMessage`]s and
//! applies a bounded, fixed-delay reconnection policy after unexpected
//! closes.
//!
//! All background work (opening, reading, reconnect timers) reports back
//! through one internal signal channel. The owner drains it with
//! [`TransportManager::next_event`], so every state change happens on the
//! owner's task, one signal at a time, in arrival order.
//!
//! Every open attempt gets a new generation number. Signals from an older
//! generation (a connection that was disconnected or replaced) are dropped,
//! which is what keeps a manual [`disconnect`](TransportManager::disconnect)
//! from ever being followed by a reconnect.

use crate::transport::connector::{
    ChannelHandle, Connector, InboundFrame, OutboundFrame, NORMAL_CLOSURE,
};
use crate::transport::error::{TransportError, TransportResult};
use cm_protocol::{ClientMessage, StreamMessage, StreamSettings};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Error string surfaced once reconnect attempts are exhausted.
pub const MAX_RECONNECT_ATTEMPTS_REACHED: &str = "Max reconnection attempts reached";

/// Error string surfaced when an inbound frame is not a valid stream message.
pub const PARSE_FAILURE: &str = "Failed to parse message";

/// Bounded, fixed-delay reconnection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Reconnects attempted after consecutive unexpected closes.
    pub max_attempts: u32,
    /// Delay before each reconnect.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(3000),
        }
    }
}

impl From<StreamSettings> for ReconnectPolicy {
    fn from(settings: StreamSettings) -> Self {
        Self {
            max_attempts: settings.reconnect_attempts,
            delay: Duration::from_millis(settings.reconnect_delay_ms),
        }
    }
}

/// Connection lifecycle as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Observable outcome of one transport signal.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The channel opened; the attempt counter was reset.
    Opened,
    /// A decoded stream message.
    Message(StreamMessage),
    /// A frame that is not a valid stream message. The connection stays open.
    MalformedMessage(String),
    /// A transport-level error (including a failed open).
    Error(String),
    /// The channel closed or a pending open failed.
    Closed,
    /// A reconnect will be attempted after `delay`.
    ReconnectScheduled {
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
    },
    /// No more reconnects will be attempted.
    ReconnectExhausted,
}

/// Internal signals produced by background tasks.
#[derive(Debug)]
enum Signal {
    Opened {
        generation: u64,
        channel: ChannelHandle,
    },
    OpenFailed {
        generation: u64,
        error: TransportError,
    },
    Frame {
        generation: u64,
        frame: InboundFrame,
    },
    Closed {
        generation: u64,
    },
    ReconnectDue {
        generation: u64,
    },
}

/// Owns one stream connection and its reconnection policy.
pub struct TransportManager {
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,

    state: ConnectionState,
    target_url: Option<String>,
    reconnect_attempts: u32,
    should_auto_reconnect: bool,
    last_error: Option<String>,

    /// Incremented on every open attempt and on every manual disconnect.
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<OutboundFrame>>,
    open_task: Option<JoinHandle<()>>,
    reader_task: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,

    signal_tx: mpsc::UnboundedSender<Signal>,
    signal_rx: mpsc::UnboundedReceiver<Signal>,
    pending: VecDeque<TransportEvent>,
}

impl TransportManager {
    /// Create a disconnected manager.
    ///
    /// # Arguments
    ///
    /// * `connector` - Opens the underlying channels
    /// * `policy` - Reconnection bound and delay
    pub fn new(connector: Arc<dyn Connector>, policy: ReconnectPolicy) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Self {
            connector,
            policy,
            state: ConnectionState::Disconnected,
            target_url: None,
            reconnect_attempts: 0,
            should_auto_reconnect: true,
            last_error: None,
            generation: 0,
            outbound: None,
            open_task: None,
            reader_task: None,
            reconnect_timer: None,
            signal_tx,
            signal_rx,
            pending: VecDeque::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Last surfaced error, cleared by a fresh `connect` and by a successful open.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Address of the current or most recent connection.
    pub fn target_url(&self) -> Option<&str> {
        self.target_url.as_deref()
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// Open a connection to `url`.
    ///
    /// This is a no-op when a connection is already open or an open attempt
    /// is in flight. Otherwise automatic reconnection is re-armed and an
    /// open attempt is started in the background; its outcome arrives
    /// through [`next_event`](Self::next_event).
    pub fn connect(&mut self, url: &str) {
        match self.state {
            ConnectionState::Connected => {
                debug!(url, "stream already connected");
                return;
            }
            ConnectionState::Connecting => {
                debug!(url, "stream connection already in progress");
                return;
            }
            ConnectionState::Disconnected => {}
        }

        self.should_auto_reconnect = true;
        self.cancel_reconnect_timer();
        self.open(url.to_string());
    }

    /// Close the connection and suppress any pending or future reconnect.
    pub fn disconnect(&mut self) {
        debug!("disconnecting stream");
        self.should_auto_reconnect = false;
        self.cancel_reconnect_timer();

        if let Some(task) = self.open_task.take() {
            task.abort();
        }
        if let Some(outbound) = self.outbound.take() {
            let _ = outbound.send(OutboundFrame::Close {
                code: NORMAL_CLOSURE,
                reason: "Manual disconnect".to_string(),
            });
        }
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }

        // Anything still in flight from the old connection is now stale.
        self.generation += 1;
        self.pending.clear();
        self.state = ConnectionState::Disconnected;
        self.reconnect_attempts = 0;
    }

    /// Send a stream message as a JSON text frame.
    ///
    /// Nothing is queued: when the channel is not open the message is dropped
    /// and an error is surfaced.
    pub fn send_message(&mut self, message: &ClientMessage) -> TransportResult<()> {
        let text = message
            .to_json()
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        self.send_text(text)
    }

    /// Send a raw text frame.
    pub fn send_text(&mut self, text: String) -> TransportResult<()> {
        let outbound = match (&self.state, &self.outbound) {
            (ConnectionState::Connected, Some(outbound)) => outbound,
            _ => {
                warn!("cannot send, stream is not connected");
                let error = TransportError::NotConnected;
                self.last_error = Some(error.to_string());
                return Err(error);
            }
        };

        if let Err(e) = outbound.send(OutboundFrame::Text(text)) {
            let error = TransportError::SendFailed(e.to_string());
            warn!(error = %error, "stream send failed");
            self.last_error = Some(error.to_string());
            return Err(error);
        }
        Ok(())
    }

    /// Wait for the next observable transport event.
    ///
    /// Pends forever while there is no connection activity. Cancel-safe: a
    /// signal is only taken off the channel when it is handled to completion.
    pub async fn next_event(&mut self) -> TransportEvent {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return event;
            }
            // The manager keeps its own sender alive, so `None` is unreachable.
            if let Some(signal) = self.signal_rx.recv().await {
                self.handle_signal(signal);
            }
        }
    }

    fn open(&mut self, url: String) {
        self.generation += 1;
        let generation = self.generation;

        info!(url = %url, generation, "opening stream connection");
        self.state = ConnectionState::Connecting;
        self.last_error = None;
        self.target_url = Some(url.clone());

        let connector = Arc::clone(&self.connector);
        let signals = self.signal_tx.clone();
        self.open_task = Some(tokio::spawn(async move {
            let signal = match connector.open(&url).await {
                Ok(channel) => Signal::Opened {
                    generation,
                    channel,
                },
                Err(error) => Signal::OpenFailed { generation, error },
            };
            let _ = signals.send(signal);
        }));
    }

    fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Opened {
                generation,
                channel,
            } => {
                if generation != self.generation {
                    debug!(generation, "dropping stale connection");
                    return;
                }
                self.on_opened(generation, channel);
            }
            Signal::OpenFailed { generation, error } => {
                if generation != self.generation {
                    return;
                }
                warn!(error = %error, "stream connection failed");
                self.open_task = None;
                self.state = ConnectionState::Disconnected;
                self.last_error = Some(error.to_string());
                self.pending.push_back(TransportEvent::Error(error.to_string()));
                self.on_closed();
            }
            Signal::Frame { generation, frame } => {
                if generation != self.generation {
                    return;
                }
                self.on_frame(frame);
            }
            Signal::Closed { generation } => {
                if generation != self.generation {
                    return;
                }
                info!(generation, "stream connection closed");
                self.outbound = None;
                self.reader_task = None;
                self.state = ConnectionState::Disconnected;
                self.on_closed();
            }
            Signal::ReconnectDue { generation } => {
                self.reconnect_timer = None;
                if generation != self.generation || !self.should_auto_reconnect {
                    return;
                }
                if let Some(url) = self.target_url.clone() {
                    info!(
                        attempt = self.reconnect_attempts,
                        max_attempts = self.policy.max_attempts,
                        "reconnecting stream"
                    );
                    self.open(url);
                }
            }
        }
    }

    fn on_opened(&mut self, generation: u64, channel: ChannelHandle) {
        info!(generation, "stream connection opened");
        self.open_task = None;
        self.state = ConnectionState::Connected;
        self.reconnect_attempts = 0;
        self.last_error = None;

        let ChannelHandle {
            mut inbound,
            outbound,
        } = channel;
        self.outbound = Some(outbound);

        let signals = self.signal_tx.clone();
        self.reader_task = Some(tokio::spawn(async move {
            while let Some(frame) = inbound.recv().await {
                if signals.send(Signal::Frame { generation, frame }).is_err() {
                    return;
                }
            }
            let _ = signals.send(Signal::Closed { generation });
        }));

        self.pending.push_back(TransportEvent::Opened);
    }

    fn on_frame(&mut self, frame: InboundFrame) {
        match frame {
            InboundFrame::Text(text) => match StreamMessage::from_json(&text) {
                Ok(message) => self.pending.push_back(TransportEvent::Message(message)),
                Err(e) => {
                    warn!(error = %e, "failed to parse stream message");
                    self.last_error = Some(PARSE_FAILURE.to_string());
                    self.pending
                        .push_back(TransportEvent::MalformedMessage(e.to_string()));
                }
            },
            InboundFrame::Error(detail) => {
                warn!(error = %detail, "stream connection error");
                self.last_error = Some(format!("Stream connection error: {detail}"));
                self.pending.push_back(TransportEvent::Error(detail));
            }
        }
    }

    fn on_closed(&mut self) {
        self.pending.push_back(TransportEvent::Closed);

        if !self.should_auto_reconnect {
            return;
        }

        if self.reconnect_attempts < self.policy.max_attempts {
            self.reconnect_attempts += 1;
            let attempt = self.reconnect_attempts;
            let delay = self.policy.delay;
            let generation = self.generation;
            info!(
                attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "scheduling stream reconnect"
            );

            let signals = self.signal_tx.clone();
            self.reconnect_timer = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = signals.send(Signal::ReconnectDue { generation });
            }));

            self.pending.push_back(TransportEvent::ReconnectScheduled {
                attempt,
                max_attempts: self.policy.max_attempts,
                delay,
            });
        } else {
            warn!(
                max_attempts = self.policy.max_attempts,
                "giving up on stream reconnection"
            );
            self.last_error = Some(MAX_RECONNECT_ATTEMPTS_REACHED.to_string());
            self.pending.push_back(TransportEvent::ReconnectExhausted);
        }
    }

    fn cancel_reconnect_timer(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
    }
}

impl Drop for TransportManager {
    fn drop(&mut self) {
        self.cancel_reconnect_timer();
        if let Some(task) = self.open_task.take() {
            task.abort();
        }
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}
