//! Subscription lifecycle: connect, read frames, reconnect, cancel.
//!
//! [`subscribe`] spawns one task per profile that owns the connection
//! and the retry schedule. Parsed frames are forwarded in wire order
//! over an unbounded mpsc channel; nothing is buffered across a
//! reconnect, so frames lost with a dropped connection stay lost (the
//! reconciler compensates via the baseline fetch and merge rules).

use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use osprey_core::types::ProfileId;

use crate::backoff::{ReconnectConfig, RetrySchedule};
use crate::client::ChannelClient;
use crate::messages::{parse_frame, WireMessage};

/// Lifecycle state of one subscription's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A connection attempt is in flight.
    Connecting,
    /// The WebSocket is open and delivering frames.
    Open,
    /// No live connection. Either waiting to reconnect, exhausted, or
    /// unsubscribed.
    Closed,
}

impl ConnectionState {
    /// Whether frames can currently arrive.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Handle to one live subscription.
///
/// Dropping the handle unsubscribes. [`unsubscribe`](Self::unsubscribe)
/// is idempotent and also suppresses any pending reconnect.
pub struct SubscriptionHandle {
    profile_id: ProfileId,
    state_rx: watch::Receiver<ConnectionState>,
    events_rx: Option<mpsc::UnboundedReceiver<WireMessage>>,
    cancel: CancellationToken,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Profile id this subscription is scoped to.
    pub fn profile_id(&self) -> ProfileId {
        self.profile_id
    }

    /// Snapshot of the current connection state.
    pub fn is_connected(&self) -> bool {
        self.state_rx.borrow().is_open()
    }

    /// Watch receiver for connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Take the inbound message stream. Yields `None` after the first
    /// call; there is exactly one consumer per subscription.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<WireMessage>> {
        self.events_rx.take()
    }

    /// Token that is cancelled when this subscription ends. Consumers
    /// can use it to guard against frames racing an unsubscribe.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the connection task and any pending reconnect.
    ///
    /// Safe to call multiple times.
    pub fn unsubscribe(&self) {
        self.cancel.cancel();
    }

    /// Whether the connection task has exited (unsubscribed or retry
    /// attempts exhausted).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Unsubscribe and wait for the connection task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = tokio::time::timeout(std::time::Duration::from_secs(5), task).await;
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Open a subscription for one profile.
///
/// Connects immediately and keeps the connection alive per `config`
/// until [`SubscriptionHandle::unsubscribe`] or the retry ceiling.
pub fn subscribe(
    ws_base_url: &str,
    profile_id: ProfileId,
    config: ReconnectConfig,
) -> SubscriptionHandle {
    let client = ChannelClient::new(profile_id, ws_base_url.to_string());
    let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let task_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        run_subscription(client, config, state_tx, events_tx, task_cancel).await;
    });

    SubscriptionHandle {
        profile_id,
        state_rx,
        events_rx: Some(events_rx),
        cancel,
        task: Some(task),
    }
}

/// Core subscription loop: connect -> read frames -> backoff -> retry.
async fn run_subscription(
    client: ChannelClient,
    config: ReconnectConfig,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: mpsc::UnboundedSender<WireMessage>,
    cancel: CancellationToken,
) {
    let profile_id = client.profile_id();
    let mut schedule = RetrySchedule::new();

    loop {
        let _ = state_tx.send(ConnectionState::Connecting);

        let connect_result = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = state_tx.send(ConnectionState::Closed);
                tracing::debug!(profile_id, "Unsubscribed during connect");
                return;
            }
            result = client.connect() => result,
        };

        match connect_result {
            Ok(conn) => {
                schedule.reset();
                let _ = state_tx.send(ConnectionState::Open);

                let mut ws_stream = conn.ws_stream;
                read_frames(&mut ws_stream, profile_id, &events_tx, &cancel).await;

                let _ = state_tx.send(ConnectionState::Closed);
                if cancel.is_cancelled() {
                    tracing::debug!(profile_id, "Unsubscribed, connection released");
                    return;
                }
                tracing::info!(profile_id, "Connection lost");
            }
            Err(e) => {
                let _ = state_tx.send(ConnectionState::Closed);
                tracing::warn!(profile_id, error = %e, "Connection attempt failed");
            }
        }

        let Some(delay) = schedule.next_delay(&config) else {
            tracing::warn!(
                profile_id,
                max_attempts = config.max_attempts,
                "Reconnect attempts exhausted, staying offline",
            );
            return;
        };

        tracing::info!(
            profile_id,
            attempt = schedule.attempt(),
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect",
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(profile_id, "Unsubscribed, pending reconnect cancelled");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Read frames off one live connection until it closes or the
/// subscription is cancelled.
///
/// Text frames are parsed via [`parse_frame`] and forwarded in the
/// exact order received; frames that fail to parse are dropped and
/// logged without closing the connection.
async fn read_frames(
    ws_stream: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    profile_id: ProfileId,
    events_tx: &mpsc::UnboundedSender<WireMessage>,
    cancel: &CancellationToken,
) {
    use futures::StreamExt;

    loop {
        let msg_result = tokio::select! {
            _ = cancel.cancelled() => return,
            msg = ws_stream.next() => match msg {
                Some(result) => result,
                None => {
                    tracing::info!(profile_id, "WebSocket stream exhausted");
                    return;
                }
            },
        };

        match msg_result {
            Ok(Message::Text(text)) => match parse_frame(&text) {
                Ok(frame) => {
                    if events_tx.send(frame).is_err() {
                        // Consumer gone; nothing left to deliver to.
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        profile_id,
                        error = %e,
                        raw_frame = %text,
                        "Dropping malformed frame",
                    );
                }
            },
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Handled automatically by tungstenite.
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(profile_id, ?frame, "Server closed WebSocket");
                return;
            }
            Ok(_) => {
                // Binary / Frame — ignore.
            }
            Err(e) => {
                tracing::error!(profile_id, error = %e, "WebSocket receive error");
                return;
            }
        }
    }
}
