//! Engine state and the published view.
//!
//! `EngineState` is the single writer: it owns the `RoundTracker` and the
//! `ChartDomainStabilizer` and folds stream events, connection changes and
//! bootstrap data into one `EngineView` snapshot.

use crate::config::ViewConfig;
use roundsync_bootstrap::{BootstrapUpdate, CurrentRoundBets, RoundHistoryPage};
use roundsync_core::{Round, ScoringSnapshot, Symbol};
use roundsync_feed::{ApplyOutcome, LifecycleState, RoundEvent, RoundTracker};
use roundsync_telemetry::Metrics;
use roundsync_view::{
    reconcile, score_table, ChartDomain, ChartDomainStabilizer, DisplaySeries, ReconcilerConfig,
    ScoreTableRow, SeriesInput,
};
use roundsync_ws::{ConnectionState, ConnectionStatus};
use serde::Serialize;
use tracing::{debug, info};

/// Read-only snapshot for renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineView {
    pub symbol: Symbol,
    pub lifecycle: LifecycleState,
    pub round: Option<Round>,
    pub connection: ConnectionStatus,
    /// Empty when no round is held.
    pub series: DisplaySeries,
    pub scoring: Option<ScoringSnapshot>,
    /// Per-minute estimates for explanation panels; fixed by config.
    pub score_table: Vec<ScoreTableRow>,
    pub chart_domain: Option<ChartDomain>,
    /// Server message while no round is active.
    pub empty_message: Option<String>,
    pub current_bets: Option<CurrentRoundBets>,
    pub round_history: Option<RoundHistoryPage>,
    /// Latest `bets_update` payload, forwarded untouched.
    pub last_bets_update: Option<serde_json::Value>,
    /// Reconnects keep failing.
    pub offline: bool,
}

impl EngineView {
    pub fn initial(symbol: Symbol, connection: ConnectionStatus) -> Self {
        Self {
            symbol,
            lifecycle: LifecycleState::Idle,
            round: None,
            connection,
            series: empty_series(),
            scoring: None,
            score_table: Vec::new(),
            chart_domain: None,
            empty_message: None,
            current_bets: None,
            round_history: None,
            last_bets_update: None,
            offline: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }
}

fn empty_series() -> DisplaySeries {
    DisplaySeries {
        points: Vec::new(),
        current_index: 0,
    }
}

/// Whether a connection status counts as offline.
pub fn is_offline(status: &ConnectionStatus, offline_after_attempts: u32) -> bool {
    status.state != ConnectionState::Connected && status.attempt_count >= offline_after_attempts
}

pub struct EngineState {
    tracker: RoundTracker,
    stabilizer: ChartDomainStabilizer,
    reconciler: ReconcilerConfig,
    score_table: Vec<ScoreTableRow>,
    offline_after_attempts: u32,
    connection: ConnectionStatus,
    series: DisplaySeries,
    chart_domain: Option<ChartDomain>,
    current_bets: Option<CurrentRoundBets>,
    round_history: Option<RoundHistoryPage>,
    last_bets_update: Option<serde_json::Value>,
}

impl EngineState {
    pub fn new(
        symbol: Symbol,
        view: ViewConfig,
        offline_after_attempts: u32,
        connection: ConnectionStatus,
    ) -> Self {
        Self {
            score_table: score_table(&view.scoring),
            tracker: RoundTracker::new(symbol, view.scoring)
                .with_stale_grace_ms(view.reconciler.forward_grace_ms),
            stabilizer: ChartDomainStabilizer::new(view.domain),
            reconciler: view.reconciler,
            offline_after_attempts,
            connection,
            series: empty_series(),
            chart_domain: None,
            current_bets: None,
            round_history: None,
            last_bets_update: None,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        self.tracker.symbol()
    }

    pub fn round(&self) -> Option<&Round> {
        self.tracker.round()
    }

    /// Fold one stream (or local) event.
    ///
    /// `bets_update` payloads are kept for collaborators and never reach the
    /// tracker's round.
    pub fn apply(&mut self, event: RoundEvent) -> ApplyOutcome {
        if let RoundEvent::BetsUpdate(payload) = event {
            self.last_bets_update = Some(payload);
            return ApplyOutcome::Unchanged;
        }

        let outcome = self.tracker.apply(event);
        match &outcome {
            ApplyOutcome::Rejected(reason) => {
                Metrics::tick_rejected(reason.as_str());
            }
            ApplyOutcome::RoundReplaced { previous, current } => {
                Metrics::round_replaced();
                info!(previous = ?previous, current = %current, "Round replaced, derived state reset");
                self.stabilizer.reset();
                self.current_bets = None;
                self.last_bets_update = None;
            }
            ApplyOutcome::SymbolSwitched => {
                self.stabilizer.reset();
                self.current_bets = None;
                self.round_history = None;
                self.last_bets_update = None;
            }
            ApplyOutcome::Cleared => {
                self.stabilizer.reset();
            }
            _ => {}
        }

        if outcome.is_change() {
            self.refresh_derived();
        }
        outcome
    }

    /// Accept a bootstrap response unless it belongs to another symbol or,
    /// for bets, another round. Returns whether the view changed.
    pub fn apply_bootstrap(&mut self, update: BootstrapUpdate) -> bool {
        if update.symbol() != self.tracker.symbol() {
            debug!(
                got = %update.symbol(),
                expected = %self.tracker.symbol(),
                "Discarding bootstrap data for another symbol"
            );
            return false;
        }

        match update {
            BootstrapUpdate::CurrentBets { bets, .. } => {
                if let Some(round) = self.tracker.round() {
                    if bets.round_id != round.id {
                        debug!(
                            got = %bets.round_id,
                            current = %round.id,
                            "Discarding bets for another round"
                        );
                        return false;
                    }
                }
                self.current_bets = Some(bets);
            }
            BootstrapUpdate::RoundHistory { page, .. } => {
                self.round_history = Some(page);
            }
        }
        true
    }

    pub fn set_connection(&mut self, status: ConnectionStatus) {
        self.connection = status;
    }

    pub fn is_offline(&self) -> bool {
        is_offline(&self.connection, self.offline_after_attempts)
    }

    fn refresh_derived(&mut self) {
        match self.tracker.round() {
            Some(round) => {
                let series = reconcile(&SeriesInput::from(round), &self.reconciler);
                self.chart_domain = Some(self.stabilizer.update(&series, round.open_price));
                self.series = series;
            }
            None => {
                self.series = empty_series();
                self.chart_domain = None;
            }
        }
    }

    pub fn view(&self) -> EngineView {
        let round = self.tracker.round().cloned();
        EngineView {
            symbol: self.tracker.symbol().clone(),
            lifecycle: self.tracker.state(),
            scoring: round.as_ref().and_then(|r| r.scoring),
            round,
            score_table: self.score_table.clone(),
            connection: self.connection.clone(),
            series: self.series.clone(),
            chart_domain: self.chart_domain,
            empty_message: self.tracker.empty_message().map(str::to_string),
            current_bets: self.current_bets.clone(),
            round_history: self.round_history.clone(),
            last_bets_update: self.last_bets_update.clone(),
            offline: self.is_offline(),
        }
    }
}
