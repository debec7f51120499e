//! WebSocket connection manager.
//!
//! Owns one logical subscription to a per-symbol round stream. A session task
//! connects, reads frames, writes queued control frames and heartbeats, and
//! reconnects with exponential backoff until torn down.

use crate::error::{WsError, WsResult};
use crate::heartbeat::HeartbeatManager;
use crate::message::{ControlFrame, InboundFrame};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use roundsync_core::Symbol;
use roundsync_telemetry::Metrics;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Stream endpoint without the `symbol` query parameter.
    pub url: String,
    /// First reconnect delay.
    pub reconnect_base_delay_ms: u64,
    /// Reconnect delay cap.
    pub reconnect_max_delay_ms: u64,
    /// Interval between `{"action":"ping"}` frames.
    pub heartbeat_interval_ms: u64,
    /// Capacity of the outbound control queue.
    pub outbound_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            reconnect_base_delay_ms: 1_000,
            reconnect_max_delay_ms: 30_000,
            heartbeat_interval_ms: 30_000,
            outbound_capacity: 64,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    pub const ALL: [ConnectionState; 4] = [
        Self::Disconnected,
        Self::Connecting,
        Self::Connected,
        Self::Reconnecting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Published connection status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Failed cycles since the last successful open.
    pub attempt_count: u32,
    /// Symbol the subscription is (or will be) scoped to.
    pub symbol: Symbol,
}

impl ConnectionStatus {
    fn disconnected(symbol: Symbol) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempt_count: 0,
            symbol,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Reconnect delay for the given attempt (1-based).
///
/// `min(base * 2^(attempt-1), max)`: 1000, 2000, 4000, ... capped at `max`.
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(20);
    let delay = base_ms.saturating_mul(1u64 << exponent).min(max_ms);
    Duration::from_millis(delay)
}

/// Stream URL scoped to `symbol`.
pub fn session_url(base: &str, symbol: &Symbol) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}symbol={symbol}")
}

/// How a connected session ended without error.
enum SessionEnd {
    Cancelled,
    StreamEnded,
}

/// State shared between the manager and its session task.
struct Shared {
    config: ConnectionConfig,
    status_tx: watch::Sender<ConnectionStatus>,
    symbol: RwLock<Symbol>,
    heartbeat: HeartbeatManager,
    frame_tx: mpsc::Sender<InboundFrame>,
    outbound_rx: TokioMutex<mpsc::Receiver<ControlFrame>>,
}

struct Session {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// WebSocket connection manager.
pub struct ConnectionManager {
    shared: Arc<Shared>,
    status_rx: watch::Receiver<ConnectionStatus>,
    outbound_tx: mpsc::Sender<ControlFrame>,
    shutdown_token: CancellationToken,
    session: Mutex<Option<Session>>,
}

impl ConnectionManager {
    /// Create a manager for `symbol`. Parsed frames are sent to `frame_tx`.
    pub fn new(
        config: ConnectionConfig,
        symbol: Symbol,
        frame_tx: mpsc::Sender<InboundFrame>,
    ) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity.max(1));
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::disconnected(symbol.clone()));
        Self {
            shared: Arc::new(Shared {
                heartbeat: HeartbeatManager::new(config.heartbeat_interval_ms),
                config,
                status_tx,
                symbol: RwLock::new(symbol),
                frame_tx,
                outbound_rx: TokioMutex::new(outbound_rx),
            }),
            status_rx,
            outbound_tx,
            shutdown_token: CancellationToken::new(),
            session: Mutex::new(None),
        }
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status_rx.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.status_rx.borrow().state
    }

    pub fn symbol(&self) -> Symbol {
        self.shared.symbol.read().clone()
    }

    /// Whether a session task is alive (connected, connecting or backing off).
    pub fn is_running(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    /// Open a session scoped to `symbol`.
    ///
    /// No-op while a session is already running. Must be called from within a
    /// tokio runtime.
    pub fn connect(&self, symbol: Symbol) {
        let mut session = self.session.lock();
        if session.as_ref().is_some_and(|s| !s.handle.is_finished()) {
            debug!(%symbol, "Session already running, connect ignored");
            return;
        }

        *self.shared.symbol.write() = symbol.clone();
        let token = self.shutdown_token.child_token();
        let handle = tokio::spawn(self.shared.clone().run(token.clone()));
        *session = Some(Session { token, handle });
        info!(%symbol, url = %self.shared.config.url, "Connection session started");
    }

    /// Move the subscription to `symbol`.
    ///
    /// While connected this is an in-band `switch` frame; otherwise the
    /// current session (and any pending backoff) is torn down and a new one
    /// is opened for `symbol`.
    pub async fn switch_symbol(&self, symbol: Symbol) -> WsResult<()> {
        if self.state() == ConnectionState::Connected && self.is_running() {
            self.outbound_tx
                .send(ControlFrame::switch(symbol.clone()))
                .await
                .map_err(|_| WsError::ChannelClosed)?;
            *self.shared.symbol.write() = symbol.clone();
            self.shared
                .status_tx
                .send_modify(|status| status.symbol = symbol.clone());
            info!(%symbol, "Switched symbol in-band");
            return Ok(());
        }

        info!(%symbol, state = %self.state(), "Switching symbol via reconnect");
        self.teardown().await;
        self.connect(symbol);
        Ok(())
    }

    /// Close the session and cancel its heartbeat and backoff timers.
    ///
    /// Waits for the session task to finish.
    pub async fn teardown(&self) {
        let session = self.session.lock().take();
        if let Some(session) = session {
            session.token.cancel();
            if let Err(e) = session.handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Session task ended abnormally");
                }
            }
            info!("Connection session torn down");
        }
        self.shared.publish(ConnectionState::Disconnected, 0);
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

impl Shared {
    fn publish(&self, state: ConnectionState, attempt_count: u32) {
        let symbol = self.symbol.read().clone();
        self.status_tx.send_modify(|status| {
            status.state = state;
            status.attempt_count = attempt_count;
            status.symbol = symbol;
        });
        if state == ConnectionState::Connected {
            Metrics::ws_connected();
        } else {
            Metrics::ws_disconnected();
        }
        Metrics::ws_state_set(state.as_str());
    }

    /// Connect-read-reconnect loop. Exits only on cancellation.
    async fn run(self: Arc<Self>, token: CancellationToken) {
        let mut attempt = 0u32;

        loop {
            if token.is_cancelled() {
                break;
            }

            let state = if attempt == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting
            };
            self.publish(state, attempt);

            let reason = match self.try_connect(&token, &mut attempt).await {
                Ok(SessionEnd::Cancelled) => break,
                Ok(SessionEnd::StreamEnded) => {
                    info!("WebSocket stream ended");
                    "stream_ended"
                }
                Err(WsError::ConnectionClosed { code, reason }) => {
                    warn!(code, %reason, "WebSocket closed by server");
                    "closed"
                }
                Err(e) => {
                    warn!(error = %e, attempt, "WebSocket session failed");
                    "error"
                }
            };

            if token.is_cancelled() {
                break;
            }

            attempt = attempt.saturating_add(1);
            self.publish(ConnectionState::Reconnecting, attempt);
            Metrics::ws_reconnect(reason);

            let delay = backoff_delay(
                attempt,
                self.config.reconnect_base_delay_ms,
                self.config.reconnect_max_delay_ms,
            );
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = token.cancelled() => {
                    info!("Cancelled during backoff");
                    break;
                }
            }
        }

        self.publish(ConnectionState::Disconnected, 0);
    }

    async fn try_connect(
        &self,
        token: &CancellationToken,
        attempt: &mut u32,
    ) -> WsResult<SessionEnd> {
        let symbol = self.symbol.read().clone();
        let url = session_url(&self.config.url, &symbol);
        info!(%url, "Connecting to WebSocket");

        let connecting = connect_async_tls_with_config(url.as_str(), None, true, None);
        let (ws_stream, _response) = tokio::select! {
            result = connecting => result?,
            () = token.cancelled() => return Ok(SessionEnd::Cancelled),
        };
        let (mut write, mut read) = ws_stream.split();

        *attempt = 0;
        self.publish(ConnectionState::Connected, 0);
        self.heartbeat.reset();
        self.discard_stale_outbound().await;
        info!(%symbol, "WebSocket connected");

        let period = self.heartbeat.interval();
        let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let outbound_recv = async { self.outbound_rx.lock().await.recv().await };

            tokio::select! {
                biased;

                () = token.cancelled() => {
                    info!("Session cancelled, closing WebSocket");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "Failed to send Close frame");
                    }
                    return Ok(SessionEnd::Cancelled);
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Ok(Message::Binary(data))) => {
                            debug!(len = data.len(), "Ignoring binary frame");
                            Metrics::frame_dropped("binary");
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(SessionEnd::StreamEnded),
                    }
                }

                outbound = outbound_recv => {
                    let Some(frame) = outbound else {
                        // Manager dropped.
                        return Ok(SessionEnd::Cancelled);
                    };
                    write.send(Message::Text(frame.to_text()?)).await?;
                    debug!(?frame, "Control frame sent");
                }

                _ = heartbeat.tick() => {
                    write.send(Message::Text(ControlFrame::Ping.to_text()?)).await?;
                    self.heartbeat.record_ping();
                    debug!("Sent heartbeat ping");
                }
            }
        }
    }

    /// Parse and forward one text frame. Malformed frames are dropped.
    async fn handle_text(&self, text: &str) {
        let frame = match serde_json::from_str::<InboundFrame>(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, len = text.len(), "Dropping malformed frame");
                Metrics::frame_dropped("malformed");
                return;
            }
        };
        Metrics::frame_received(frame.kind());

        match &frame {
            InboundFrame::Pong => {
                self.heartbeat.record_pong();
                return;
            }
            InboundFrame::Error { message } => {
                warn!(%message, "Server reported error");
            }
            _ => {}
        }

        if self.frame_tx.send(frame).await.is_err() {
            warn!("Frame receiver dropped");
        }
    }

    /// Frames queued for a previous session are obsolete: the new session URL
    /// already carries the current symbol.
    async fn discard_stale_outbound(&self) {
        let mut rx = self.outbound_rx.lock().await;
        let mut discarded = 0usize;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "Discarded stale control frames");
        }
    }
}
