//! Periodic bootstrap refresh.
//!
//! Runs beside the stream and pushes typed updates to the engine. Every
//! update carries the symbol it was fetched for so the receiver can drop
//! responses that arrive after a symbol switch.

use crate::client::BootstrapClient;
use crate::config::BootstrapConfig;
use crate::error::BootstrapResult;
use crate::types::{CurrentRoundBets, RoundHistoryPage};
use roundsync_core::Symbol;
use roundsync_telemetry::Metrics;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapUpdate {
    CurrentBets {
        symbol: Symbol,
        bets: CurrentRoundBets,
    },
    RoundHistory {
        symbol: Symbol,
        page: RoundHistoryPage,
    },
}

impl BootstrapUpdate {
    pub fn symbol(&self) -> &Symbol {
        match self {
            Self::CurrentBets { symbol, .. } | Self::RoundHistory { symbol, .. } => symbol,
        }
    }
}

/// Out-of-schedule refresh triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshRequest {
    /// Follow a symbol switch.
    Symbol(Symbol),
    /// A new round started on the current symbol.
    NewRound,
}

pub struct BootstrapPoller {
    client: BootstrapClient,
    config: BootstrapConfig,
    symbol: Symbol,
    update_tx: mpsc::Sender<BootstrapUpdate>,
    refresh_rx: mpsc::Receiver<RefreshRequest>,
    token: CancellationToken,
}

impl BootstrapPoller {
    pub fn new(
        client: BootstrapClient,
        config: BootstrapConfig,
        symbol: Symbol,
        update_tx: mpsc::Sender<BootstrapUpdate>,
        refresh_rx: mpsc::Receiver<RefreshRequest>,
        token: CancellationToken,
    ) -> Self {
        Self {
            client,
            config,
            symbol,
            update_tx,
            refresh_rx,
            token,
        }
    }

    /// Poll until cancelled or the engine drops its receiver.
    ///
    /// Both intervals fire immediately on start. Fetch failures are logged
    /// and retried on the next tick.
    pub async fn run(mut self) {
        info!(
            symbol = %self.symbol,
            bets_interval_ms = self.config.bets_interval_ms,
            history_interval_ms = self.config.history_interval_ms,
            "Bootstrap poller started"
        );

        let mut bets_tick = poll_interval(self.config.bets_interval_ms);
        let mut history_tick = poll_interval(self.config.history_interval_ms);

        loop {
            let keep_going = tokio::select! {
                biased;

                _ = self.token.cancelled() => break,

                request = self.refresh_rx.recv() => match request {
                    Some(RefreshRequest::Symbol(symbol)) => {
                        debug!(from = %self.symbol, to = %symbol, "Bootstrap following symbol switch");
                        self.symbol = symbol;
                        bets_tick.reset();
                        history_tick.reset();
                        self.refresh_all().await
                    }
                    Some(RefreshRequest::NewRound) => {
                        bets_tick.reset();
                        self.refresh_all().await
                    }
                    None => break,
                },

                _ = bets_tick.tick() => self.refresh_bets().await,

                _ = history_tick.tick() => self.refresh_history().await,
            };

            if !keep_going {
                break;
            }
        }

        info!("Bootstrap poller stopped");
    }

    async fn refresh_all(&self) -> bool {
        self.refresh_bets().await && self.refresh_history().await
    }

    /// Returns false once the update channel is closed.
    async fn refresh_bets(&self) -> bool {
        let symbol = self.symbol.clone();
        let result = self.client.fetch_current_bets(&symbol).await;
        match record("current_bets", &symbol, result) {
            Some(bets) => self.emit(BootstrapUpdate::CurrentBets { symbol, bets }).await,
            None => true,
        }
    }

    async fn refresh_history(&self) -> bool {
        let symbol = self.symbol.clone();
        let result = self
            .client
            .fetch_round_history(&symbol, 1, self.config.history_limit)
            .await;
        match record("round_history", &symbol, result) {
            Some(page) => self.emit(BootstrapUpdate::RoundHistory { symbol, page }).await,
            None => true,
        }
    }

    async fn emit(&self, update: BootstrapUpdate) -> bool {
        self.update_tx.send(update).await.is_ok()
    }
}

fn poll_interval(period_ms: u64) -> Interval {
    let mut tick = interval(Duration::from_millis(period_ms.max(1)));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tick
}

fn record<T>(endpoint: &str, symbol: &Symbol, result: BootstrapResult<T>) -> Option<T> {
    match result {
        Ok(value) => {
            Metrics::bootstrap_fetch(endpoint, true);
            Some(value)
        }
        Err(e) => {
            Metrics::bootstrap_fetch(endpoint, false);
            warn!(endpoint, %symbol, error = %e, "Bootstrap fetch failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundsync_core::RoundId;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    /// Answers every request, echoing the queried symbol back.
    async fn spawn_backend() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&buf).to_string();
                    let symbol = head
                        .split("symbol=")
                        .nth(1)
                        .and_then(|rest| rest.split(['&', ' ']).next())
                        .unwrap_or("")
                        .to_string();
                    let body = if head.starts_with("GET /bets/round/current") {
                        format!(
                            r#"{{"success":true,"data":{{"round_id":7,"symbol":"{symbol}","long_bets":[],"short_bets":[],"total_long":0,"total_short":0}}}}"#
                        )
                    } else {
                        r#"{"success":true,"data":{"items":[],"total":0,"page":1,"limit":20,"total_pages":0}}"#
                            .to_string()
                    };
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        format!("http://{addr}")
    }

    fn slow_config() -> BootstrapConfig {
        BootstrapConfig {
            bets_interval_ms: 60_000,
            history_interval_ms: 60_000,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_initial_fetch_and_symbol_switch() {
        let base = spawn_backend().await;
        let client = BootstrapClient::new(base, Duration::from_secs(5)).unwrap();
        let (update_tx, mut update_rx) = mpsc::channel(16);
        let (refresh_tx, refresh_rx) = mpsc::channel(4);
        let token = CancellationToken::new();

        let poller = BootstrapPoller::new(
            client,
            slow_config(),
            Symbol::new("BTCUSDT"),
            update_tx,
            refresh_rx,
            token.clone(),
        );
        let handle = tokio::spawn(poller.run());

        let mut saw_bets = false;
        let mut saw_history = false;
        while !(saw_bets && saw_history) {
            let update = timeout(Duration::from_secs(5), update_rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(update.symbol(), &Symbol::new("BTCUSDT"));
            match update {
                BootstrapUpdate::CurrentBets { bets, .. } => {
                    assert_eq!(bets.round_id, RoundId(7));
                    saw_bets = true;
                }
                BootstrapUpdate::RoundHistory { .. } => saw_history = true,
            }
        }

        refresh_tx
            .send(RefreshRequest::Symbol(Symbol::new("ETHUSDT")))
            .await
            .unwrap();
        let update = timeout(Duration::from_secs(5), update_rx.recv())
            .await
            .unwrap()
            .unwrap();
        match update {
            BootstrapUpdate::CurrentBets { symbol, bets } => {
                assert_eq!(symbol, Symbol::new("ETHUSDT"));
                assert_eq!(bets.symbol, Symbol::new("ETHUSDT"));
            }
            other => panic!("expected bets first, got {other:?}"),
        }

        token.cancel();
        timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_fatal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            BootstrapClient::new(format!("http://{addr}"), Duration::from_secs(1)).unwrap();
        let (update_tx, mut update_rx) = mpsc::channel(4);
        let (refresh_tx, refresh_rx) = mpsc::channel(4);
        let token = CancellationToken::new();

        let handle = tokio::spawn(
            BootstrapPoller::new(
                client,
                slow_config(),
                Symbol::new("BTCUSDT"),
                update_tx,
                refresh_rx,
                token.clone(),
            )
            .run(),
        );

        refresh_tx.send(RefreshRequest::NewRound).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!handle.is_finished());
        assert!(update_rx.try_recv().is_err());

        token.cancel();
        timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }
}
