//! WebSocket message types.
//!
//! Inbound frames are discriminated by `type` and carry their payload under
//! `data` (`no_round` and `error` carry a top-level `message` instead).
//! Outbound control frames are discriminated by `action`.

use roundsync_core::{Price, PriceSnapshot, RoundId, RoundOutcome, RoundStatus, Symbol};
use serde::{Deserialize, Serialize};

// ============================================================================
// Inbound
// ============================================================================

/// A frame received from the round stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// A round began, or the server (re)sent the current round.
    RoundStart { data: RoundStartPayload },
    /// Live price update for the current round.
    PriceTick { data: PriceTickPayload },
    /// The round settled.
    RoundEnd { data: RoundEndPayload },
    /// No active round for the subscribed symbol.
    NoRound {
        #[serde(default)]
        message: String,
    },
    /// Bet list changed. Opaque to the engine.
    BetsUpdate {
        #[serde(default)]
        data: serde_json::Value,
    },
    /// Reply to `{"action":"ping"}`.
    Pong,
    /// Server-side error report. Non-fatal.
    Error {
        #[serde(default)]
        message: String,
    },
}

impl InboundFrame {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RoundStart { .. } => "round_start",
            Self::PriceTick { .. } => "price_tick",
            Self::RoundEnd { .. } => "round_end",
            Self::NoRound { .. } => "no_round",
            Self::BetsUpdate { .. } => "bets_update",
            Self::Pong => "pong",
            Self::Error { .. } => "error",
        }
    }
}

/// Full round description sent on `round_start`.
///
/// The server's `scoring` hint is not read; scores are estimated locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundStartPayload {
    pub id: RoundId,
    pub symbol: Symbol,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    /// ISO-8601, e.g. `2024-05-01T12:00:00Z`.
    pub start_time: String,
    pub end_time: String,
    pub open_price: Price,
    #[serde(default)]
    pub current_price: Option<Price>,
    #[serde(default)]
    pub price_change_percent: Option<f64>,
    #[serde(default)]
    pub status: RoundStatus,
    #[serde(default)]
    pub remaining_seconds: Option<i64>,
    #[serde(default)]
    pub betting_open: Option<bool>,
    #[serde(default)]
    pub bet_count: Option<u32>,
    #[serde(default)]
    pub price_history: Vec<WireSnapshot>,
}

/// History entry as sent by the server (`timestamp` in epoch ms).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireSnapshot {
    pub timestamp: i64,
    pub price: Price,
}

impl From<WireSnapshot> for PriceSnapshot {
    fn from(s: WireSnapshot) -> Self {
        PriceSnapshot::new(s.timestamp, s.price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTickPayload {
    pub price: Price,
    /// Epoch ms.
    pub timestamp: i64,
    #[serde(default)]
    pub change_percent: Option<f64>,
    pub remaining_seconds: i64,
    /// Present when the server tags ticks with their round.
    #[serde(default)]
    pub round_id: Option<RoundId>,
    #[serde(default)]
    pub symbol: Option<Symbol>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundEndPayload {
    pub id: RoundId,
    pub result: RoundOutcome,
    pub close_price: Price,
    #[serde(default)]
    pub price_change_percent: Option<f64>,
    #[serde(default)]
    pub symbol: Option<Symbol>,
}

// ============================================================================
// Outbound
// ============================================================================

/// Client-to-server control frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ControlFrame {
    /// Move the subscription to another symbol without reconnecting.
    Switch { symbol: Symbol },
    /// Keep-alive.
    Ping,
}

impl ControlFrame {
    pub fn switch(symbol: Symbol) -> Self {
        Self::Switch { symbol }
    }

    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
