//! Tuning parameters for the derived views.
//!
//! Defaults mirror the values the round server and the scoring authority use;
//! all of them can be overridden from the `[view]` section of the app config.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Display series reconciliation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Number of slots after index 0 (one per second of a 10-minute round).
    #[serde(default = "default_points_count")]
    pub points_count: usize,

    /// A snapshot may be up to this far after its slot's target time (ms).
    /// Tolerates clock and delivery skew.
    #[serde(default = "default_forward_grace_ms")]
    pub forward_grace_ms: i64,

    /// Maximum distance between a slot and its matched snapshot (ms).
    #[serde(default = "default_match_tolerance_ms")]
    pub match_tolerance_ms: i64,

    /// The "now" index never sits left of this share of the series,
    /// expressed in hundredths (2 = 2%).
    #[serde(default = "default_min_progress_pct")]
    pub min_progress_pct: i64,
}

fn default_points_count() -> usize {
    600
}

fn default_forward_grace_ms() -> i64 {
    5_000
}

fn default_match_tolerance_ms() -> i64 {
    60_000
}

fn default_min_progress_pct() -> i64 {
    2
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            points_count: default_points_count(),
            forward_grace_ms: default_forward_grace_ms(),
            match_tolerance_ms: default_match_tolerance_ms(),
            min_progress_pct: default_min_progress_pct(),
        }
    }
}

/// Scoring estimate constants.
///
/// These are shared with the scoring authority and must match it; the client
/// result is only ever an estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_win_base")]
    pub win_base: f64,
    #[serde(default = "default_lose_base")]
    pub lose_base: f64,
    #[serde(default = "default_early_bonus")]
    pub early_bonus: f64,
    #[serde(default = "default_late_penalty")]
    pub late_penalty: f64,
    /// Decay speed K in `exp(-K * t)`.
    #[serde(default = "default_decay_k")]
    pub decay_k: f64,
    /// Betting window measured from round start (seconds).
    #[serde(default = "default_betting_window_seconds")]
    pub betting_window_seconds: i64,
    /// Betting closes once no more than this many round seconds remain.
    #[serde(default = "default_betting_cutoff_remaining")]
    pub betting_cutoff_remaining: i64,
}

fn default_win_base() -> f64 {
    10.0
}

fn default_lose_base() -> f64 {
    -5.0
}

fn default_early_bonus() -> f64 {
    1.0
}

fn default_late_penalty() -> f64 {
    0.6
}

fn default_decay_k() -> f64 {
    3.0
}

fn default_betting_window_seconds() -> i64 {
    420
}

fn default_betting_cutoff_remaining() -> i64 {
    180
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            win_base: default_win_base(),
            lose_base: default_lose_base(),
            early_bonus: default_early_bonus(),
            late_penalty: default_late_penalty(),
            decay_k: default_decay_k(),
            betting_window_seconds: default_betting_window_seconds(),
            betting_cutoff_remaining: default_betting_cutoff_remaining(),
        }
    }
}

/// Chart domain stabilization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Absolute lower bound on the half-height of the domain.
    #[serde(default = "default_fixed_floor")]
    pub fixed_floor: Decimal,
    /// Relative lower bound on the half-height (share of open price).
    #[serde(default = "default_min_relative_deviation")]
    pub min_relative_deviation: Decimal,
    /// Multiplier applied to the widest deviation.
    #[serde(default = "default_padding")]
    pub padding: Decimal,
    /// Relative center drift that forces a fresh domain.
    #[serde(default = "default_center_drift")]
    pub center_drift: Decimal,
    /// Relative growth of the candidate deviation needed to widen the domain.
    #[serde(default = "default_growth_threshold")]
    pub growth_threshold: Decimal,
}

fn default_fixed_floor() -> Decimal {
    dec!(0.00000001)
}

fn default_min_relative_deviation() -> Decimal {
    dec!(0.002)
}

fn default_padding() -> Decimal {
    dec!(1.3)
}

fn default_center_drift() -> Decimal {
    dec!(0.001)
}

fn default_growth_threshold() -> Decimal {
    dec!(0.10)
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            fixed_floor: default_fixed_floor(),
            min_relative_deviation: default_min_relative_deviation(),
            padding: default_padding(),
            center_drift: default_center_drift(),
            growth_threshold: default_growth_threshold(),
        }
    }
}
