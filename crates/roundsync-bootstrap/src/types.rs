//! REST response types.

use crate::error::{BootstrapError, BootstrapResult};
use roundsync_core::{Price, RoundId, Symbol};
use serde::{Deserialize, Serialize};

/// Backend response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the payload, turning `success: false` into an error.
    pub fn into_result(self) -> BootstrapResult<T> {
        if !self.success {
            return Err(BootstrapError::Api {
                error: self.error.unwrap_or_else(|| "UNKNOWN".to_string()),
                hint: self.hint.unwrap_or_default(),
            });
        }
        self.data.ok_or(BootstrapError::MissingData)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetDirection {
    Long,
    Short,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentRoundBet {
    pub id: i64,
    pub bot_id: String,
    pub bot_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub direction: BetDirection,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    pub created_at: String,
}

/// `GET /bets/round/current`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentRoundBets {
    /// `0` when there is no active round.
    pub round_id: RoundId,
    pub symbol: Symbol,
    #[serde(default)]
    pub long_bets: Vec<CurrentRoundBet>,
    #[serde(default)]
    pub short_bets: Vec<CurrentRoundBet>,
    #[serde(default)]
    pub total_long: u32,
    #[serde(default)]
    pub total_short: u32,
}

impl CurrentRoundBets {
    pub fn has_round(&self) -> bool {
        self.round_id.0 != 0
    }

    /// Whether these bets belong to `(symbol, id)`.
    pub fn belongs_to(&self, symbol: &Symbol, id: RoundId) -> bool {
        &self.symbol == symbol && self.round_id == id
    }

    pub fn total(&self) -> u32 {
        self.total_long + self.total_short
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundHistoryItem {
    pub id: RoundId,
    pub symbol: Symbol,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub open_price: Option<Price>,
    #[serde(default)]
    pub close_price: Option<Price>,
    pub status: String,
    /// `up`, `down` or `draw` once settled.
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub price_change_percent: Option<f64>,
    #[serde(default)]
    pub bet_count: u32,
}

/// `GET /rounds/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundHistoryPage {
    #[serde(default)]
    pub items: Vec<RoundHistoryItem>,
    pub total: u32,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}
