//! Round lifecycle state machine.
//!
//! `RoundTracker` holds the single live `Round` for the subscribed symbol
//! and is the only place that decides whether an event belongs to it.
//!
//! | Current | Event           | Next    |
//! |---------|-----------------|---------|
//! | any     | lifecycle-start | Active  |
//! | Active  | price-tick      | Active  |
//! | Active  | lifecycle-end   | Settled |
//! | any     | no-active-round | Idle    |
//!
//! Anything else leaves the state unchanged and is reported as rejected.

use crate::parser::{PriceTick, RoundEnd, RoundEvent, RoundStart};
use roundsync_core::{Round, RoundId, RoundOutcome, RoundStatus, Symbol};
use roundsync_view::scoring::{betting_open, estimate_for_round};
use roundsync_view::ScoringConfig;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Ticks stamped this far before the held round's start are treated as
/// leftovers of the previous round. Smaller offsets are clock skew and get
/// clamped to the start.
pub const DEFAULT_STALE_TICK_GRACE_MS: i64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Idle,
    Active,
    Settled,
}

/// Why an event was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No round is held.
    NoRound,
    /// The round already settled.
    Settled,
    /// The event names a different round id.
    StaleRound,
    /// The event names a different symbol than the subscription.
    WrongSymbol,
    /// The tick is older than the last retained snapshot.
    OutOfOrder,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoRound => "no_round",
            Self::Settled => "settled",
            Self::StaleRound => "stale_round",
            Self::WrongSymbol => "wrong_symbol",
            Self::OutOfOrder => "out_of_order",
        }
    }
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// A different round took over; derived state must be reset.
    RoundReplaced {
        previous: Option<RoundId>,
        current: RoundId,
    },
    /// Lifecycle-start for the held round: fields refreshed.
    RoundRefreshed { appended: usize },
    TickApplied,
    Settled { outcome: RoundOutcome },
    /// No active round; the round was dropped.
    Cleared,
    /// Local countdown lowered the remaining time.
    CountdownUpdated,
    /// The expected symbol changed and the round was dropped.
    SymbolSwitched,
    /// Accepted, but nothing about the round changed.
    Unchanged,
    Rejected(RejectReason),
}

impl ApplyOutcome {
    /// Whether the round entity (or its absence) changed.
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged | Self::Rejected(_))
    }

    pub fn is_replacement(&self) -> bool {
        matches!(self, Self::RoundReplaced { .. })
    }
}

/// Owner of the live round.
#[derive(Debug)]
pub struct RoundTracker {
    symbol: Symbol,
    round: Option<Round>,
    empty_message: Option<String>,
    scoring: ScoringConfig,
    stale_grace_ms: i64,
}

impl RoundTracker {
    pub fn new(symbol: Symbol, scoring: ScoringConfig) -> Self {
        Self {
            symbol,
            round: None,
            empty_message: None,
            scoring,
            stale_grace_ms: DEFAULT_STALE_TICK_GRACE_MS,
        }
    }

    /// Override the pre-start skew tolerance for untagged ticks.
    pub fn with_stale_grace_ms(mut self, grace_ms: i64) -> Self {
        self.stale_grace_ms = grace_ms.max(0);
        self
    }

    /// Symbol the tracker accepts events for.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// Server message from the last no-active-round signal.
    pub fn empty_message(&self) -> Option<&str> {
        self.empty_message.as_deref()
    }

    pub fn state(&self) -> LifecycleState {
        match &self.round {
            None => LifecycleState::Idle,
            Some(r) if r.status == RoundStatus::Settled => LifecycleState::Settled,
            Some(_) => LifecycleState::Active,
        }
    }

    /// Fold one event into the held round.
    pub fn apply(&mut self, event: RoundEvent) -> ApplyOutcome {
        let outcome = match event {
            RoundEvent::LifecycleStart(start) => self.apply_start(start),
            RoundEvent::PriceTick(tick) => self.apply_tick(tick),
            RoundEvent::LifecycleEnd(end) => self.apply_end(end),
            RoundEvent::NoActiveRound { message } => self.apply_no_round(message),
            RoundEvent::Countdown { now_ms } => self.apply_countdown(now_ms),
            RoundEvent::SymbolSwitched(symbol) => self.apply_switch(symbol),
            RoundEvent::BetsUpdate(_) | RoundEvent::ServerError { .. } => ApplyOutcome::Unchanged,
        };

        if let ApplyOutcome::Rejected(reason) = outcome {
            debug!(reason = reason.as_str(), "Event rejected");
        }
        outcome
    }

    fn apply_start(&mut self, start: RoundStart) -> ApplyOutcome {
        if start.symbol != self.symbol {
            warn!(
                expected = %self.symbol,
                got = %start.symbol,
                id = %start.id,
                "Discarding round_start for another symbol"
            );
            return ApplyOutcome::Rejected(RejectReason::WrongSymbol);
        }

        self.empty_message = None;

        if let Some(round) = self
            .round
            .as_mut()
            .filter(|r| r.is_same_round(&start.symbol, start.id))
        {
            let appended = refresh_round(round, start, &self.scoring);
            debug!(id = %round.id, appended, "Round refreshed");
            return ApplyOutcome::RoundRefreshed { appended };
        }

        let previous = self.round.as_ref().map(|r| r.id);
        let round = build_round(start, &self.scoring);
        info!(
            previous = ?previous,
            id = %round.id,
            symbol = %round.symbol,
            open = %round.open_price,
            seed = round.price_history().len(),
            "Round replaced"
        );
        let current = round.id;
        self.round = Some(round);
        ApplyOutcome::RoundReplaced { previous, current }
    }

    fn apply_tick(&mut self, tick: PriceTick) -> ApplyOutcome {
        let Some(round) = self.round.as_mut() else {
            return ApplyOutcome::Rejected(RejectReason::NoRound);
        };
        if tick.symbol.as_ref().is_some_and(|s| s != &round.symbol) {
            return ApplyOutcome::Rejected(RejectReason::WrongSymbol);
        }
        if tick.round_id.is_some_and(|id| id != round.id) {
            return ApplyOutcome::Rejected(RejectReason::StaleRound);
        }
        // The stream does not tag ticks; a late one from the previous round
        // is recognised by its timestamp.
        if tick.timestamp_ms < round.start_time_ms - self.stale_grace_ms {
            debug!(
                id = %round.id,
                ts = tick.timestamp_ms,
                start = round.start_time_ms,
                "Tick predates the held round"
            );
            return ApplyOutcome::Rejected(RejectReason::StaleRound);
        }
        if !round.status.accepts_ticks() {
            return ApplyOutcome::Rejected(RejectReason::Settled);
        }
        if !round.append_snapshot(tick.snapshot()) {
            return ApplyOutcome::Rejected(RejectReason::OutOfOrder);
        }

        round.current_price = tick.price;
        round.remaining_seconds = tick.remaining_seconds.min(round.total_duration_seconds);
        match tick.change_percent {
            Some(pct) => round.price_change_percent = pct,
            None => round.refresh_change_percent(),
        }
        rescore(round, &self.scoring);
        ApplyOutcome::TickApplied
    }

    fn apply_end(&mut self, end: RoundEnd) -> ApplyOutcome {
        let Some(round) = self.round.as_mut() else {
            return ApplyOutcome::Rejected(RejectReason::NoRound);
        };
        if end.symbol.as_ref().is_some_and(|s| s != &round.symbol) {
            return ApplyOutcome::Rejected(RejectReason::WrongSymbol);
        }
        if end.id != round.id {
            warn!(held = %round.id, got = %end.id, "Discarding round_end for another round");
            return ApplyOutcome::Rejected(RejectReason::StaleRound);
        }
        if round.status == RoundStatus::Settled {
            // Redelivery.
            return ApplyOutcome::Unchanged;
        }

        round.status = RoundStatus::Settled;
        round.outcome = Some(end.outcome);
        round.close_price = Some(end.close_price);
        round.current_price = end.close_price;
        round.remaining_seconds = 0;
        match end.price_change_percent {
            Some(pct) => round.price_change_percent = pct,
            None => round.refresh_change_percent(),
        }
        rescore(round, &self.scoring);
        info!(id = %round.id, outcome = ?end.outcome, close = %end.close_price, "Round settled");
        ApplyOutcome::Settled {
            outcome: end.outcome,
        }
    }

    fn apply_no_round(&mut self, message: String) -> ApplyOutcome {
        if let Some(round) = self.round.take() {
            info!(id = %round.id, "No active round, dropping held round");
        }
        self.empty_message = Some(message);
        ApplyOutcome::Cleared
    }

    fn apply_countdown(&mut self, now_ms: i64) -> ApplyOutcome {
        let Some(round) = self.round.as_mut() else {
            return ApplyOutcome::Unchanged;
        };
        if !round.status.accepts_ticks() {
            return ApplyOutcome::Unchanged;
        }

        let left_ms = (round.end_time_ms - now_ms).max(0);
        let remaining = (left_ms + 999) / 1000;
        if remaining >= round.remaining_seconds {
            return ApplyOutcome::Unchanged;
        }

        round.remaining_seconds = remaining;
        rescore(round, &self.scoring);
        ApplyOutcome::CountdownUpdated
    }

    fn apply_switch(&mut self, symbol: Symbol) -> ApplyOutcome {
        if symbol == self.symbol {
            return ApplyOutcome::Unchanged;
        }
        info!(from = %self.symbol, to = %symbol, "Tracker switched symbol");
        self.symbol = symbol;
        self.round = None;
        self.empty_message = None;
        ApplyOutcome::SymbolSwitched
    }
}

fn build_round(start: RoundStart, scoring: &ScoringConfig) -> Round {
    let mut round = Round::new(
        start.id,
        start.symbol,
        start.open_price,
        start.start_time_ms,
        start.total_duration_seconds,
    );
    round.end_time_ms = start.end_time_ms;
    round.display_name = start.display_name;
    round.extend_history(start.history);
    round.current_price = start.current_price;
    round.remaining_seconds = start.remaining_seconds;
    round.status = start.status;
    round.bet_count = start.bet_count;
    match start.price_change_percent {
        Some(pct) => round.price_change_percent = pct,
        None => round.refresh_change_percent(),
    }
    rescore(&mut round, scoring);
    round
}

/// Same-id lifecycle-start: refresh fields, append only newer snapshots.
///
/// A settled round stays settled; redelivered starts never reopen it.
fn refresh_round(round: &mut Round, start: RoundStart, scoring: &ScoringConfig) -> usize {
    let appended = round.extend_history(start.history);
    if start.display_name.is_some() {
        round.display_name = start.display_name;
    }
    round.bet_count = start.bet_count;

    if round.status != RoundStatus::Settled {
        round.current_price = start.current_price;
        round.remaining_seconds = start.remaining_seconds;
        round.status = start.status;
        match start.price_change_percent {
            Some(pct) => round.price_change_percent = pct,
            None => round.refresh_change_percent(),
        }
    }
    rescore(round, scoring);
    appended
}

/// Recompute betting flag and scoring from the remaining time.
fn rescore(round: &mut Round, scoring: &ScoringConfig) {
    if round.status.accepts_ticks() {
        round.betting_open = betting_open(round.remaining_seconds, scoring);
        round.scoring = estimate_for_round(
            round.remaining_seconds,
            round.total_duration_seconds,
            scoring,
        );
    } else {
        round.betting_open = false;
        round.scoring = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundsync_core::{Price, PriceSnapshot};
    use rust_decimal_macros::dec;

    const START: i64 = 1_700_000_000_000;

    fn px(v: rust_decimal::Decimal) -> Price {
        Price::new(v)
    }

    fn btc() -> Symbol {
        Symbol::new("BTCUSDT")
    }

    fn tracker() -> RoundTracker {
        RoundTracker::new(btc(), ScoringConfig::default())
    }

    fn start(id: i64, history: Vec<PriceSnapshot>) -> RoundEvent {
        RoundEvent::LifecycleStart(RoundStart {
            id: RoundId(id),
            symbol: btc(),
            display_name: Some("Bitcoin".into()),
            open_price: px(dec!(100)),
            current_price: px(dec!(100)),
            price_change_percent: None,
            start_time_ms: START,
            end_time_ms: START + 600_000,
            total_duration_seconds: 600,
            remaining_seconds: 600,
            status: RoundStatus::Active,
            bet_count: 0,
            history,
        })
    }

    fn tick(price: rust_decimal::Decimal, offset_ms: i64, remaining: i64) -> PriceTick {
        PriceTick {
            price: px(price),
            timestamp_ms: START + offset_ms,
            change_percent: None,
            remaining_seconds: remaining,
            round_id: None,
            symbol: None,
        }
    }

    #[test]
    fn test_start_replaces_and_tick_updates() {
        let mut t = tracker();
        assert_eq!(t.state(), LifecycleState::Idle);

        assert_eq!(
            t.apply(start(42, vec![])),
            ApplyOutcome::RoundReplaced {
                previous: None,
                current: RoundId(42)
            }
        );
        assert_eq!(t.state(), LifecycleState::Active);

        assert_eq!(
            t.apply(RoundEvent::PriceTick(tick(dec!(101), 10_000, 590))),
            ApplyOutcome::TickApplied
        );
        let r = t.round().unwrap();
        assert_eq!(r.current_price, px(dec!(101)));
        assert_eq!(r.remaining_seconds, 590);
        assert_eq!(r.price_change_percent, 1.0);
        assert_eq!(r.price_history().len(), 1);
        assert!(r.betting_open);
        assert!(r.scoring.is_some());
    }

    #[test]
    fn test_stale_round_tick_is_discarded() {
        let mut t = tracker();
        t.apply(start(41, vec![]));
        t.apply(start(42, vec![]));

        let mut stale = tick(dec!(90), 5_000, 595);
        stale.round_id = Some(RoundId(41));
        assert_eq!(
            t.apply(RoundEvent::PriceTick(stale)),
            ApplyOutcome::Rejected(RejectReason::StaleRound)
        );

        let r = t.round().unwrap();
        assert_eq!(r.id, RoundId(42));
        assert!(r.price_history().is_empty());
        assert_eq!(r.current_price, px(dec!(100)));
    }

    #[test]
    fn test_untagged_late_tick_from_previous_round() {
        let mut t = tracker();
        t.apply(start(41, vec![]));
        t.apply(start(42, vec![PriceSnapshot::new(START, px(dec!(100)))]));

        // No id on the wire; the timestamp belongs to round 41.
        let late = tick(dec!(90), -1_000 - DEFAULT_STALE_TICK_GRACE_MS, 1);
        assert_eq!(
            t.apply(RoundEvent::PriceTick(late)),
            ApplyOutcome::Rejected(RejectReason::StaleRound)
        );

        let r = t.round().unwrap();
        assert_eq!(r.id, RoundId(42));
        assert_eq!(r.price_history().len(), 1);
        assert_eq!(r.current_price, px(dec!(100)));
        assert_eq!(r.remaining_seconds, 600);
        assert!(r.scoring.is_some());
    }

    #[test]
    fn test_stale_grace_is_configurable() {
        let mut t = tracker().with_stale_grace_ms(0);
        t.apply(start(42, vec![]));
        assert_eq!(
            t.apply(RoundEvent::PriceTick(tick(dec!(99), -1, 600))),
            ApplyOutcome::Rejected(RejectReason::StaleRound)
        );
        assert_eq!(
            t.apply(RoundEvent::PriceTick(tick(dec!(101), 0, 600))),
            ApplyOutcome::TickApplied
        );
    }

    #[test]
    fn test_redelivered_start_keeps_settlement() {
        let mut t = tracker();
        t.apply(start(42, vec![]));
        t.apply(RoundEvent::LifecycleEnd(RoundEnd {
            id: RoundId(42),
            outcome: RoundOutcome::Down,
            close_price: px(dec!(99)),
            price_change_percent: None,
            symbol: None,
        }));

        assert!(matches!(
            t.apply(start(42, vec![])),
            ApplyOutcome::RoundRefreshed { .. }
        ));
        assert_eq!(t.state(), LifecycleState::Settled);
        assert_eq!(t.round().unwrap().current_price, px(dec!(99)));
    }

    #[test]
    fn test_replacement_discards_previous_history() {
        let mut t = tracker();
        t.apply(start(41, vec![]));
        t.apply(RoundEvent::PriceTick(tick(dec!(105), 1_000, 599)));
        assert_eq!(t.round().unwrap().price_history().len(), 1);

        let outcome = t.apply(start(42, vec![]));
        assert_eq!(
            outcome,
            ApplyOutcome::RoundReplaced {
                previous: Some(RoundId(41)),
                current: RoundId(42)
            }
        );
        assert!(outcome.is_replacement());
        assert!(t.round().unwrap().price_history().is_empty());
    }

    #[test]
    fn test_tick_before_any_round() {
        let mut t = tracker();
        assert_eq!(
            t.apply(RoundEvent::PriceTick(tick(dec!(101), 0, 600))),
            ApplyOutcome::Rejected(RejectReason::NoRound)
        );
    }

    #[test]
    fn test_out_of_order_tick_keeps_history() {
        let mut t = tracker();
        t.apply(start(42, vec![]));
        t.apply(RoundEvent::PriceTick(tick(dec!(101), 20_000, 580)));

        assert_eq!(
            t.apply(RoundEvent::PriceTick(tick(dec!(99), 10_000, 590))),
            ApplyOutcome::Rejected(RejectReason::OutOfOrder)
        );
        let r = t.round().unwrap();
        assert_eq!(r.price_history().len(), 1);
        assert_eq!(r.current_price, px(dec!(101)));
        assert_eq!(r.remaining_seconds, 580);
    }

    #[test]
    fn test_early_timestamp_is_clamped() {
        let mut t = tracker();
        t.apply(start(42, vec![]));
        t.apply(RoundEvent::PriceTick(tick(dec!(101), -3_000, 600)));
        assert_eq!(t.round().unwrap().price_history()[0].timestamp_ms, START);
    }

    #[test]
    fn test_zero_remaining_has_no_scoring() {
        let mut t = tracker();
        t.apply(start(42, vec![]));
        t.apply(RoundEvent::PriceTick(tick(dec!(101), 600_000, 0)));
        let r = t.round().unwrap();
        assert!(r.scoring.is_none());
        assert!(!r.betting_open);
    }

    #[test]
    fn test_settlement_blocks_further_ticks() {
        let mut t = tracker();
        t.apply(start(42, vec![]));
        let end = RoundEnd {
            id: RoundId(42),
            outcome: RoundOutcome::Up,
            close_price: px(dec!(102)),
            price_change_percent: Some(2.0),
            symbol: None,
        };
        assert_eq!(
            t.apply(RoundEvent::LifecycleEnd(end.clone())),
            ApplyOutcome::Settled {
                outcome: RoundOutcome::Up
            }
        );
        assert_eq!(t.state(), LifecycleState::Settled);
        assert_eq!(t.round().unwrap().close_price, Some(px(dec!(102))));
        assert!(t.round().unwrap().scoring.is_none());

        assert_eq!(
            t.apply(RoundEvent::PriceTick(tick(dec!(103), 610_000, 0))),
            ApplyOutcome::Rejected(RejectReason::Settled)
        );
        assert_eq!(t.apply(RoundEvent::LifecycleEnd(end)), ApplyOutcome::Unchanged);
    }

    #[test]
    fn test_end_for_other_round_is_discarded() {
        let mut t = tracker();
        t.apply(start(42, vec![]));
        let end = RoundEnd {
            id: RoundId(41),
            outcome: RoundOutcome::Down,
            close_price: px(dec!(98)),
            price_change_percent: None,
            symbol: None,
        };
        assert_eq!(
            t.apply(RoundEvent::LifecycleEnd(end)),
            ApplyOutcome::Rejected(RejectReason::StaleRound)
        );
        assert_eq!(t.state(), LifecycleState::Active);
    }

    #[test]
    fn test_same_id_start_appends_only_newer() {
        let mut t = tracker();
        let seed = vec![
            PriceSnapshot::new(START + 1_000, px(dec!(100.5))),
            PriceSnapshot::new(START + 2_000, px(dec!(101))),
        ];
        t.apply(start(42, seed.clone()));
        assert_eq!(t.round().unwrap().price_history().len(), 2);

        let mut resent = seed;
        resent.push(PriceSnapshot::new(START + 3_000, px(dec!(101.5))));
        assert_eq!(
            t.apply(start(42, resent)),
            ApplyOutcome::RoundRefreshed { appended: 1 }
        );
        let history = t.round().unwrap().price_history();
        assert_eq!(history.len(), 3);
        assert!(history.windows(2).all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
    }

    #[test]
    fn test_seed_history_is_sorted() {
        let mut t = tracker();
        t.apply(start(
            42,
            vec![
                PriceSnapshot::new(START + 3_000, px(dec!(103))),
                PriceSnapshot::new(START + 1_000, px(dec!(101))),
            ],
        ));
        let history = t.round().unwrap().price_history();
        assert_eq!(history[0].price, px(dec!(101)));
        assert_eq!(history[1].price, px(dec!(103)));
    }

    #[test]
    fn test_no_round_clears() {
        let mut t = tracker();
        t.apply(start(42, vec![]));
        assert_eq!(
            t.apply(RoundEvent::NoActiveRound {
                message: "Waiting for next round".into()
            }),
            ApplyOutcome::Cleared
        );
        assert_eq!(t.state(), LifecycleState::Idle);
        assert_eq!(t.empty_message(), Some("Waiting for next round"));

        t.apply(start(43, vec![]));
        assert!(t.empty_message().is_none());
    }

    #[test]
    fn test_symbol_switch_rejects_old_frames() {
        let mut t = tracker();
        t.apply(start(42, vec![]));
        assert_eq!(
            t.apply(RoundEvent::SymbolSwitched(Symbol::new("ETHUSDT"))),
            ApplyOutcome::SymbolSwitched
        );
        assert_eq!(t.state(), LifecycleState::Idle);

        // Late frame from the BTC subscription.
        assert_eq!(
            t.apply(start(43, vec![])),
            ApplyOutcome::Rejected(RejectReason::WrongSymbol)
        );
        assert_eq!(
            t.apply(RoundEvent::SymbolSwitched(Symbol::new("ETHUSDT"))),
            ApplyOutcome::Unchanged
        );
    }

    #[test]
    fn test_tagged_tick_for_other_symbol() {
        let mut t = tracker();
        t.apply(start(42, vec![]));
        let mut other = tick(dec!(3000), 1_000, 599);
        other.symbol = Some(Symbol::new("ETHUSDT"));
        assert_eq!(
            t.apply(RoundEvent::PriceTick(other)),
            ApplyOutcome::Rejected(RejectReason::WrongSymbol)
        );
    }

    #[test]
    fn test_countdown_only_decreases() {
        let mut t = tracker();
        t.apply(start(42, vec![]));
        t.apply(RoundEvent::PriceTick(tick(dec!(101), 10_000, 590)));

        assert_eq!(
            t.apply(RoundEvent::Countdown {
                now_ms: START + 12_500
            }),
            ApplyOutcome::CountdownUpdated
        );
        assert_eq!(t.round().unwrap().remaining_seconds, 588);

        // Clock behind the server: no increase.
        assert_eq!(
            t.apply(RoundEvent::Countdown { now_ms: START }),
            ApplyOutcome::Unchanged
        );
        assert_eq!(t.round().unwrap().remaining_seconds, 588);

        t.apply(RoundEvent::Countdown {
            now_ms: START + 700_000,
        });
        let r = t.round().unwrap();
        assert_eq!(r.remaining_seconds, 0);
        assert!(r.scoring.is_none());
    }

    #[test]
    fn test_betting_closes_at_cutoff() {
        let mut t = tracker();
        t.apply(start(42, vec![]));
        t.apply(RoundEvent::PriceTick(tick(dec!(101), 419_000, 181)));
        let r = t.round().unwrap();
        assert!(r.betting_open);
        assert!(r.scoring.is_some());

        // Betting flag and estimate close together.
        t.apply(RoundEvent::PriceTick(tick(dec!(101), 420_000, 180)));
        let r = t.round().unwrap();
        assert!(!r.betting_open);
        assert!(r.scoring.is_none());
    }

    #[test]
    fn test_passthrough_events() {
        let mut t = tracker();
        assert_eq!(
            t.apply(RoundEvent::BetsUpdate(serde_json::json!({"total_long": 1}))),
            ApplyOutcome::Unchanged
        );
        assert_eq!(
            t.apply(RoundEvent::ServerError {
                message: "Invalid JSON".into()
            }),
            ApplyOutcome::Unchanged
        );
    }
}
