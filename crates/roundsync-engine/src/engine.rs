//! Engine orchestration.
//!
//! Coordinates:
//! - the WebSocket connection manager (frames in, control frames out)
//! - frame parsing and the round state machine
//! - the local countdown between server ticks
//! - the REST bootstrap poller
//!
//! All state changes happen on the engine task; readers observe
//! `EngineView` snapshots through a `watch` channel.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::state::{EngineState, EngineView};
use roundsync_bootstrap::{BootstrapClient, BootstrapPoller, BootstrapUpdate, RefreshRequest};
use roundsync_core::{Clock, Symbol, SystemClock};
use roundsync_feed::{ApplyOutcome, FrameParser, RoundEvent};
use roundsync_telemetry::Metrics;
use roundsync_ws::{ConnectionManager, ConnectionState, ConnectionStatus, InboundFrame};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Local countdown resolution.
const COUNTDOWN_INTERVAL: Duration = Duration::from_secs(1);

const FRAME_CHANNEL_CAPACITY: usize = 1024;
const COMMAND_CHANNEL_CAPACITY: usize = 16;
const BOOTSTRAP_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    SwitchSymbol(Symbol),
}

/// Cloneable handle for readers and controllers of a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    view_rx: watch::Receiver<EngineView>,
    command_tx: mpsc::Sender<EngineCommand>,
    shutdown: CancellationToken,
}

impl EngineHandle {
    /// Latest published view.
    pub fn view(&self) -> EngineView {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineView> {
        self.view_rx.clone()
    }

    pub async fn switch_symbol(&self, symbol: Symbol) -> AppResult<()> {
        self.command_tx
            .send(EngineCommand::SwitchSymbol(symbol))
            .await
            .map_err(|_| AppError::Stopped)
    }

    /// Ask the engine to tear down and return from `run`.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Wait until a published view satisfies `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> AppResult<EngineView>
    where
        F: FnMut(&EngineView) -> bool,
    {
        let mut rx = self.view_rx.clone();
        let view = rx
            .wait_for(|view| predicate(view))
            .await
            .map_err(|_| AppError::Stopped)?;
        Ok(view.clone())
    }
}

/// Live round synchronization engine.
pub struct Engine {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    view_tx: watch::Sender<EngineView>,
    command_rx: mpsc::Receiver<EngineCommand>,
    shutdown: CancellationToken,
}

impl Engine {
    pub fn new(config: AppConfig) -> (Self, EngineHandle) {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> (Self, EngineHandle) {
        let initial = EngineView::initial(
            config.symbol.clone(),
            ConnectionStatus {
                state: ConnectionState::Disconnected,
                attempt_count: 0,
                symbol: config.symbol.clone(),
            },
        );
        let (view_tx, view_rx) = watch::channel(initial);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let shutdown = CancellationToken::new();

        let handle = EngineHandle {
            view_rx,
            command_tx,
            shutdown: shutdown.clone(),
        };
        let engine = Self {
            config,
            clock,
            view_tx,
            command_rx,
            shutdown,
        };
        (engine, handle)
    }

    /// Run until the handle requests shutdown.
    pub async fn run(mut self) -> AppResult<()> {
        let symbol = self.config.symbol.clone();
        info!(%symbol, ws_url = %self.config.ws_url, "Starting engine");

        let (frame_tx, mut frame_rx) = mpsc::channel::<InboundFrame>(FRAME_CHANNEL_CAPACITY);
        let connection =
            ConnectionManager::new(self.config.connection_config(), symbol.clone(), frame_tx);
        let mut status_rx = connection.subscribe_status();

        let mut state = EngineState::new(
            symbol.clone(),
            self.config.view.clone(),
            self.config.offline_after_attempts,
            connection.status(),
        );
        let parser = FrameParser::default();

        let (update_tx, mut update_rx) =
            mpsc::channel::<BootstrapUpdate>(BOOTSTRAP_CHANNEL_CAPACITY);
        let (refresh_tx, refresh_rx) = mpsc::channel::<RefreshRequest>(COMMAND_CHANNEL_CAPACITY);
        let bootstrap_handle = self.spawn_bootstrap(&symbol, update_tx, refresh_rx)?;

        connection.connect(symbol);
        self.publish(&state);

        let mut countdown = tokio::time::interval(COUNTDOWN_INTERVAL);
        countdown.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Entering engine event loop");
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }

                Some(command) = self.command_rx.recv() => match command {
                    EngineCommand::SwitchSymbol(next) => {
                        if &next == state.symbol() {
                            debug!(symbol = %next, "Already subscribed");
                            continue;
                        }
                        if let Err(e) = connection.switch_symbol(next.clone()).await {
                            warn!(error = %e, symbol = %next, "Symbol switch failed");
                            continue;
                        }
                        state.apply(RoundEvent::SymbolSwitched(next.clone()));
                        request_refresh(&refresh_tx, RefreshRequest::Symbol(next));
                        self.publish(&state);
                    }
                },

                changed = status_rx.changed() => {
                    if changed.is_err() {
                        warn!("Connection status channel closed");
                        break;
                    }
                    let status = status_rx.borrow_and_update().clone();
                    debug!(state = %status.state, attempt = status.attempt_count, "Connection status");
                    state.set_connection(status);
                    self.publish(&state);
                }

                Some(frame) = frame_rx.recv() => {
                    let event = match parser.parse(frame) {
                        Ok(Some(event)) => event,
                        Ok(None) => continue,
                        Err(e) => {
                            warn!(error = %e, "Dropping invalid frame");
                            Metrics::frame_dropped("invalid");
                            continue;
                        }
                    };
                    let outcome = state.apply(event);
                    if outcome.is_replacement() {
                        request_refresh(&refresh_tx, RefreshRequest::NewRound);
                    }
                    if !matches!(outcome, ApplyOutcome::Rejected(_)) {
                        self.publish(&state);
                    }
                }

                Some(update) = update_rx.recv() => {
                    if state.apply_bootstrap(update) {
                        self.publish(&state);
                    }
                }

                _ = countdown.tick() => {
                    let outcome = state.apply(RoundEvent::Countdown { now_ms: self.clock.now_ms() });
                    if outcome.is_change() {
                        self.publish(&state);
                    }
                }
            }
        }

        connection.teardown().await;
        if let Some(handle) = bootstrap_handle {
            handle.abort();
        }
        state.set_connection(connection.status());
        self.publish(&state);
        info!("Engine stopped");
        Ok(())
    }

    fn spawn_bootstrap(
        &self,
        symbol: &Symbol,
        update_tx: mpsc::Sender<BootstrapUpdate>,
        refresh_rx: mpsc::Receiver<RefreshRequest>,
    ) -> AppResult<Option<JoinHandle<()>>> {
        if !self.config.bootstrap.enabled {
            info!("Bootstrap polling disabled");
            return Ok(None);
        }

        let client =
            BootstrapClient::new(self.config.api_url.clone(), self.config.request_timeout())?;
        let poller = BootstrapPoller::new(
            client,
            self.config.bootstrap.clone(),
            symbol.clone(),
            update_tx,
            refresh_rx,
            self.shutdown.child_token(),
        );
        Ok(Some(tokio::spawn(poller.run())))
    }

    fn publish(&self, state: &EngineState) {
        self.view_tx.send_replace(state.view());
    }
}

/// Refreshes are best effort; a full queue means one is already pending.
fn request_refresh(tx: &mpsc::Sender<RefreshRequest>, request: RefreshRequest) {
    if let Err(e) = tx.try_send(request) {
        debug!(error = %e, "Bootstrap refresh not queued");
    }
}
