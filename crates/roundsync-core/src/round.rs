//! Round entity and the raw snapshot history it owns.
//!
//! A `Round` is one timed prediction cycle on a symbol. It is created from a
//! lifecycle-start frame, mutated in place by ticks carrying the same id, and
//! replaced wholesale when a different id starts.

use crate::Price;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Round identifier supplied by the stream (monotonic per symbol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundId(pub i64);

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instrument symbol a stream is scoped to (e.g. "BTCUSDT").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Round status as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Pending,
    #[default]
    Active,
    Settling,
    Settled,
}

impl RoundStatus {
    /// Whether price ticks may still be applied.
    pub fn accepts_ticks(&self) -> bool {
        matches!(self, Self::Pending | Self::Active | Self::Settling)
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Settling => write!(f, "settling"),
            Self::Settled => write!(f, "settled"),
        }
    }
}

/// Settlement result of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundOutcome {
    Up,
    Down,
    Draw,
}

/// A single `(timestamp, price)` observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    pub price: Price,
}

impl PriceSnapshot {
    pub fn new(timestamp_ms: i64, price: Price) -> Self {
        Self {
            timestamp_ms,
            price,
        }
    }
}

/// Advisory score estimate for a bet placed now.
///
/// The scoring authority is the server; these numbers are projections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringSnapshot {
    /// Progress through the betting window, 0.0 (start) to 1.0 (closed).
    pub time_progress: f64,
    pub estimated_win_score: i64,
    pub estimated_lose_score: i64,
    /// Decay factor, 1.0 at window start.
    pub early_bonus_remaining: f64,
}

/// The single authoritative live round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Round {
    pub id: RoundId,
    pub symbol: Symbol,
    pub display_name: Option<String>,
    pub open_price: Price,
    pub current_price: Price,
    /// Percentage change of `current_price` against `open_price`.
    pub price_change_percent: f64,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub total_duration_seconds: i64,
    pub remaining_seconds: i64,
    pub status: RoundStatus,
    pub betting_open: bool,
    pub bet_count: u32,
    pub scoring: Option<ScoringSnapshot>,
    pub outcome: Option<RoundOutcome>,
    pub close_price: Option<Price>,
    /// Append-only, non-decreasing by timestamp.
    price_history: Vec<PriceSnapshot>,
}

impl Round {
    /// Create a round with an empty history.
    ///
    /// `current_price` starts at `open_price` and `remaining_seconds` at the
    /// full duration until the first tick says otherwise.
    pub fn new(
        id: RoundId,
        symbol: Symbol,
        open_price: Price,
        start_time_ms: i64,
        total_duration_seconds: i64,
    ) -> Self {
        Self {
            id,
            symbol,
            display_name: None,
            open_price,
            current_price: open_price,
            price_change_percent: 0.0,
            start_time_ms,
            end_time_ms: start_time_ms + total_duration_seconds * 1000,
            total_duration_seconds,
            remaining_seconds: total_duration_seconds,
            status: RoundStatus::Active,
            betting_open: true,
            bet_count: 0,
            scoring: None,
            outcome: None,
            close_price: None,
            price_history: Vec::new(),
        }
    }

    /// Whether this entity is the round identified by `(symbol, id)`.
    pub fn is_same_round(&self, symbol: &Symbol, id: RoundId) -> bool {
        self.id == id && &self.symbol == symbol
    }

    pub fn price_history(&self) -> &[PriceSnapshot] {
        &self.price_history
    }

    pub fn last_snapshot_ms(&self) -> Option<i64> {
        self.price_history.last().map(|s| s.timestamp_ms)
    }

    /// Seconds elapsed since round start, derived from remaining time.
    pub fn elapsed_seconds(&self) -> i64 {
        (self.total_duration_seconds - self.remaining_seconds).max(0)
    }

    /// Timestamps before round start are pinned to the start.
    pub fn clamp_timestamp(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms.max(self.start_time_ms)
    }

    /// Append a snapshot, keeping the history non-decreasing.
    ///
    /// Returns `false` (and leaves the history untouched) when the snapshot
    /// is older than the last retained one.
    pub fn append_snapshot(&mut self, snapshot: PriceSnapshot) -> bool {
        let snapshot = PriceSnapshot::new(self.clamp_timestamp(snapshot.timestamp_ms), snapshot.price);
        if let Some(last) = self.last_snapshot_ms() {
            if snapshot.timestamp_ms < last {
                return false;
            }
        }
        self.price_history.push(snapshot);
        true
    }

    /// Append every snapshot newer than the retained history, in timestamp order.
    ///
    /// Returns the number of snapshots appended.
    pub fn extend_history(&mut self, snapshots: impl IntoIterator<Item = PriceSnapshot>) -> usize {
        let mut incoming: Vec<PriceSnapshot> = snapshots.into_iter().collect();
        incoming.sort_by_key(|s| s.timestamp_ms);

        let floor = self.last_snapshot_ms();
        let mut appended = 0;
        for snapshot in incoming {
            let ts = self.clamp_timestamp(snapshot.timestamp_ms);
            // Strictly newer only: a resent seed must not duplicate entries.
            if floor.is_some_and(|f| ts <= f) {
                continue;
            }
            if self.append_snapshot(snapshot) {
                appended += 1;
            }
        }
        appended
    }

    /// Recompute the percentage change against the open price.
    pub fn refresh_change_percent(&mut self) {
        if let Some(pct) = self.current_price.pct_from(self.open_price) {
            self.price_change_percent = Price::new(pct).to_f64();
        }
    }
}
