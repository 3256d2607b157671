//! Async WebSocket client for the push channel.
//!
//! The [`PushChannelClient`] owns a background task that reads push events
//! from the WebSocket and writes outbound requests to it. Requests are
//! fire-and-forget: nothing waits for a reply, answers arrive later as
//! ordinary push events.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    PushChannelClient                      │
//! │                                                           │
//! │  ┌──────────────┐        ┌───────────────────────────┐   │
//! │  │ ChannelHandle│        │   Background Task          │   │
//! │  │              │        │                            │   │
//! │  │  send()  ────┼──cmd──▶│  WebSocket read/write loop │   │
//! │  │              │  chan  │                            │   │
//! │  │  events() ◀──┼──evt──◀│  text frame → PushEvent    │   │
//! │  └──────────────┘  chan  └───────────────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use qrlaunch_core::prelude::*;
use qrlaunch_core::{OutboundRequest, PushEvent};

use crate::protocol::{encode_request, parse_push_message, ChannelMessage};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Initial reconnection backoff duration.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Maximum reconnection backoff duration (cap).
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Maximum number of consecutive reconnection attempts before giving up.
const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Capacity of the command channel.
const CMD_CHANNEL_CAPACITY: usize = 32;

/// Capacity of the event channel (QR images rotate every second).
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How much of a malformed frame is quoted in the log.
const LOG_EXCERPT_CHARS: usize = 120;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Current connection state of a [`PushChannelClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Connection lost; background task is retrying.
    Reconnecting {
        /// The current reconnection attempt number (1-indexed).
        attempt: u32,
    },
}

/// Events delivered to the consumer of the channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Push(PushEvent),
    /// The connection came back after a drop
    Reconnected,
    /// The background task gave up or was shut down
    Disconnected,
}

/// Internal messages sent from handles to the background task.
enum ClientCommand {
    Send(OutboundRequest),
    Disconnect,
}

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

// ---------------------------------------------------------------------------
// ChannelHandle
// ---------------------------------------------------------------------------

/// Clonable sender half of the push channel.
///
/// Becomes inoperable once the background task exits; sends then return
/// [`Error::ChannelClosed`].
#[derive(Clone)]
pub struct ChannelHandle {
    cmd_tx: mpsc::Sender<ClientCommand>,
    state: Arc<std::sync::RwLock<ConnectionState>>,
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("connection_state", &self.connection_state())
            .finish()
    }
}

impl ChannelHandle {
    /// Queue a one-way request without waiting.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] if the background task has exited.
    /// - [`Error::ChannelSend`] if the command queue is full.
    pub fn send(&self, request: OutboundRequest) -> Result<()> {
        self.cmd_tx
            .try_send(ClientCommand::Send(request))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Closed(_) => Error::ChannelClosed,
                mpsc::error::TrySendError::Full(_) => {
                    Error::channel_send("push channel command queue is full")
                }
            })
    }

    /// Return the current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Return `true` if the client is currently connected.
    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Gracefully close the WebSocket connection. Every clone of this
    /// handle stops working once the background task exits.
    pub async fn disconnect(&self) {
        let _ = self.cmd_tx.send(ClientCommand::Disconnect).await;
    }

    /// Create a handle whose commands land in the returned receiver.
    ///
    /// Intended for tests that want to observe outbound requests without a
    /// WebSocket.
    pub fn detached() -> (Self, DetachedRequests) {
        let (cmd_tx, cmd_rx) = mpsc::channel(CMD_CHANNEL_CAPACITY);
        let handle = Self {
            cmd_tx,
            state: Arc::new(std::sync::RwLock::new(ConnectionState::Connected)),
        };
        (handle, DetachedRequests { cmd_rx })
    }
}

/// Receiver side of [`ChannelHandle::detached`].
pub struct DetachedRequests {
    cmd_rx: mpsc::Receiver<ClientCommand>,
}

impl DetachedRequests {
    /// Drain every request queued so far.
    pub fn drain(&mut self) -> Vec<OutboundRequest> {
        let mut requests = Vec::new();
        while let Ok(cmd) = self.cmd_rx.try_recv() {
            if let ClientCommand::Send(request) = cmd {
                requests.push(request);
            }
        }
        requests
    }
}

// ---------------------------------------------------------------------------
// PushChannelClient
// ---------------------------------------------------------------------------

/// WebSocket push-channel client.
///
/// Create with [`PushChannelClient::connect`], then split it with
/// [`PushChannelClient::into_parts`] into a [`ChannelHandle`] for sending and
/// the event receiver.
/// Dropping every handle and the client shuts the background task down.
pub struct PushChannelClient {
    handle: ChannelHandle,
    event_rx: mpsc::Receiver<ChannelEvent>,
}

impl PushChannelClient {
    /// Connect to the push channel at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Channel`] if the initial connection cannot be
    /// established.
    pub async fn connect(url: &str) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<ClientCommand>(CMD_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<ChannelEvent>(EVENT_CHANNEL_CAPACITY);
        let state = Arc::new(std::sync::RwLock::new(ConnectionState::Connecting));

        info!("Connecting to push channel at {}", url);
        let ws_stream = connect_ws(url).await?;
        set_state(&state, ConnectionState::Connected);

        tokio::spawn(run_client_task(
            url.to_string(),
            ws_stream,
            cmd_rx,
            event_tx,
            Arc::clone(&state),
        ));

        Ok(Self {
            handle: ChannelHandle { cmd_tx, state },
            event_rx,
        })
    }

    /// Split into the sender handle and the owned stream of push events
    /// and connection changes.
    pub fn into_parts(self) -> (ChannelHandle, mpsc::Receiver<ChannelEvent>) {
        (self.handle, self.event_rx)
    }
}

// ---------------------------------------------------------------------------
// Background task
// ---------------------------------------------------------------------------

async fn run_client_task(
    url: String,
    ws_stream: WsStream,
    mut cmd_rx: mpsc::Receiver<ClientCommand>,
    event_tx: mpsc::Sender<ChannelEvent>,
    state: Arc<std::sync::RwLock<ConnectionState>>,
) {
    let reconnect = run_io_loop(ws_stream, &mut cmd_rx, &event_tx).await;

    if !reconnect {
        set_state(&state, ConnectionState::Disconnected);
        let _ = event_tx.send(ChannelEvent::Disconnected).await;
        return;
    }

    let mut attempt: u32 = 1;
    loop {
        if attempt > MAX_RECONNECT_ATTEMPTS {
            error!(
                "Push channel: exceeded {} reconnection attempts, giving up",
                MAX_RECONNECT_ATTEMPTS
            );
            break;
        }

        set_state(&state, ConnectionState::Reconnecting { attempt });

        let backoff = compute_backoff(attempt);
        warn!(
            "Push channel: connection lost, retrying in {:?} (attempt {}/{})",
            backoff, attempt, MAX_RECONNECT_ATTEMPTS
        );
        tokio::time::sleep(backoff).await;

        if cmd_rx.is_closed() {
            break;
        }

        match connect_ws(&url).await {
            Ok(ws_stream) => {
                info!("Push channel: reconnected (attempt {})", attempt);
                set_state(&state, ConnectionState::Connected);
                let _ = event_tx.send(ChannelEvent::Reconnected).await;
                attempt = 1;

                if !run_io_loop(ws_stream, &mut cmd_rx, &event_tx).await {
                    break;
                }
            }
            Err(err) => {
                warn!("Push channel: reconnection attempt {} failed: {}", attempt, err);
                attempt += 1;
            }
        }
    }

    set_state(&state, ConnectionState::Disconnected);
    let _ = event_tx.send(ChannelEvent::Disconnected).await;
    debug!("Push channel background task exiting");
}

/// Run one connection's read/write loop.
///
/// Returns `true` if the connection was lost unexpectedly (caller should
/// reconnect), or `false` on a Disconnect command or closed command channel.
async fn run_io_loop(
    ws_stream: WsStream,
    cmd_rx: &mut mpsc::Receiver<ClientCommand>,
    event_tx: &mpsc::Sender<ChannelEvent>,
) -> bool {
    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    loop {
        tokio::select! {
            frame = ws_stream.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_ws_text(text.as_str(), event_tx);
                    }
                    Some(Ok(WsMessage::Close(_))) => {
                        debug!("Push channel: received Close frame");
                        return true;
                    }
                    Some(Ok(_)) => {
                        // Ping/Pong/Binary
                    }
                    Some(Err(err)) => {
                        warn!("Push channel: WebSocket read error: {}", err);
                        return true;
                    }
                    None => {
                        debug!("Push channel: WebSocket stream ended");
                        return true;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ClientCommand::Send(request)) => {
                        send_request(&request, &mut ws_sink).await;
                    }
                    Some(ClientCommand::Disconnect) | None => {
                        send_close(&mut ws_sink).await;
                        return false;
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn set_state(state: &std::sync::RwLock<ConnectionState>, next: ConnectionState) {
    let mut guard = state.write().unwrap_or_else(|e| e.into_inner());
    *guard = next;
}

async fn connect_ws(url: &str) -> Result<WsStream> {
    let (ws_stream, _response) = connect_async(url)
        .await
        .map_err(|err| Error::channel(format!("Failed to connect to push channel: {err}")))?;
    Ok(ws_stream)
}

/// Exponential backoff for reconnection attempt `n`: `INITIAL_BACKOFF * 2^(n-1)`,
/// capped at `MAX_BACKOFF`.
fn compute_backoff(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let multiplier: u64 = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
    let secs = INITIAL_BACKOFF.as_secs().saturating_mul(multiplier);
    Duration::from_secs(secs.min(MAX_BACKOFF.as_secs()))
}

/// First `LOG_EXCERPT_CHARS` characters of a frame, cut on a char boundary.
fn log_excerpt(text: &str) -> &str {
    text.char_indices()
        .nth(LOG_EXCERPT_CHARS)
        .map_or(text, |(end, _)| &text[..end])
}

fn handle_ws_text(text: &str, event_tx: &mpsc::Sender<ChannelEvent>) {
    match parse_push_message(text) {
        Ok(ChannelMessage::Event(event)) => {
            debug!("Push channel: received '{}'", event.name());
            if let Err(err) = event_tx.try_send(ChannelEvent::Push(event)) {
                warn!("Push channel: event queue full or closed, dropping event: {}", err);
            }
        }
        Ok(ChannelMessage::Unknown(name)) => {
            debug!("Push channel: ignoring unknown event '{}'", name);
        }
        Err(err) => {
            warn!("Push channel: {} ({})", err, log_excerpt(text));
        }
    }
}

async fn send_request(request: &OutboundRequest, ws_sink: &mut SplitSink<WsStream, WsMessage>) {
    let json = match encode_request(request) {
        Ok(json) => json,
        Err(err) => {
            warn!("Push channel: failed to encode '{}': {}", request.name(), err);
            return;
        }
    };

    if let Err(err) = ws_sink.send(WsMessage::Text(json.into())).await {
        warn!("Push channel: failed to send '{}': {}", request.name(), err);
    } else {
        debug!("Push channel: sent '{}'", request.name());
    }
}

async fn send_close(ws_sink: &mut SplitSink<WsStream, WsMessage>) {
    let _ = ws_sink.send(WsMessage::Close(None)).await;
    let _ = ws_sink.close().await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnection_backoff_doubles() {
        assert_eq!(compute_backoff(1), Duration::from_secs(1));
        assert_eq!(compute_backoff(2), Duration::from_secs(2));
        assert_eq!(compute_backoff(3), Duration::from_secs(4));
        assert_eq!(compute_backoff(5), Duration::from_secs(16));
    }

    #[test]
    fn test_reconnection_backoff_capped_at_max() {
        assert_eq!(compute_backoff(6), MAX_BACKOFF);
        assert_eq!(compute_backoff(100), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn test_detached_handle_collects_requests() {
        let (handle, mut requests) = ChannelHandle::detached();
        handle.send(OutboundRequest::InitialData).unwrap();
        handle.send(OutboundRequest::FreshData).unwrap();

        assert_eq!(
            requests.drain(),
            vec![OutboundRequest::InitialData, OutboundRequest::FreshData]
        );
        assert!(requests.drain().is_empty());
    }

    #[tokio::test]
    async fn test_send_after_close_is_channel_closed() {
        let (handle, requests) = ChannelHandle::detached();
        drop(requests);
        let err = handle.send(OutboundRequest::FreshData).unwrap_err();
        assert!(matches!(err, Error::ChannelClosed));
    }

    #[test]
    fn test_log_excerpt_cuts_on_char_boundary() {
        let frame = format!(r#"{{"event":"session_update","data":{{"x":"{}"}}}}"#, "ä".repeat(80));
        let excerpt = log_excerpt(&frame);
        assert_eq!(excerpt.chars().count(), LOG_EXCERPT_CHARS);
        assert!(frame.starts_with(excerpt));

        assert_eq!(log_excerpt("short"), "short");
    }

    #[test]
    fn test_handle_text_survives_malformed_non_ascii_frame() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_test_writer()
            .finish();
        let (event_tx, mut event_rx) = mpsc::channel(4);
        let frame = format!(r#"{{"event":"session_update","data":{{"x":"{}"}}}}"#, "ä".repeat(80));

        tracing::subscriber::with_default(subscriber, || handle_ws_text(&frame, &event_tx));

        assert!(event_rx.try_recv().is_err());
    }

    #[test]
    fn test_handle_text_forwards_push_events() {
        let (event_tx, mut event_rx) = mpsc::channel(4);
        handle_ws_text(
            r#"{"event":"session_update","data":{"session_id":"S1"}}"#,
            &event_tx,
        );
        handle_ws_text("garbage", &event_tx);
        handle_ws_text(r#"{"event":"ping"}"#, &event_tx);

        match event_rx.try_recv().unwrap() {
            ChannelEvent::Push(PushEvent::SessionId(update)) => {
                assert_eq!(update.session_id, "S1")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnect_reaches_background_task() {
        let (handle, mut requests) = ChannelHandle::detached();
        assert!(handle.is_connected());
        handle.disconnect().await;

        assert!(matches!(
            requests.cmd_rx.try_recv(),
            Ok(ClientCommand::Disconnect)
        ));
    }
}
