//! Time-decayed scoring estimate.
//!
//! Early bets win more, late bets lose more:
//!
//! ```text
//! t     = clamp(elapsed / window, 0, 1)
//! decay = exp(-K * t)
//! win   = round(WIN_BASE  * (1 + EARLY_BONUS  * decay))
//! lose  = round(LOSE_BASE * (1 + LATE_PENALTY * (1 - decay)))
//! ```
//!
//! The server settles scores; this is only the projection shown before a bet.

use crate::config::ScoringConfig;
use roundsync_core::ScoringSnapshot;
use serde::Serialize;

/// Estimate scores for a bet placed with `remaining_seconds` left in the
/// betting window.
///
/// Returns `None` once the window is closed (`remaining_seconds <= 0`).
pub fn estimate_scoring(
    remaining_seconds: i64,
    betting_window_seconds: i64,
    config: &ScoringConfig,
) -> Option<ScoringSnapshot> {
    if remaining_seconds <= 0 || betting_window_seconds <= 0 {
        return None;
    }

    let elapsed = betting_window_seconds - remaining_seconds;
    let t = (elapsed as f64 / betting_window_seconds as f64).clamp(0.0, 1.0);
    Some(snapshot_at(t, config))
}

/// Estimate for a round, given the round's own remaining time.
///
/// The betting window is the leading part of the round, so the window's
/// remaining time is the round's remaining time minus the settlement tail.
/// Scoring is absent once betting has closed.
pub fn estimate_for_round(
    round_remaining_seconds: i64,
    total_duration_seconds: i64,
    config: &ScoringConfig,
) -> Option<ScoringSnapshot> {
    if round_remaining_seconds <= 0 || !betting_open(round_remaining_seconds, config) {
        return None;
    }
    let window = config.betting_window_seconds.min(total_duration_seconds);
    let tail = total_duration_seconds - window;
    estimate_scoring(round_remaining_seconds - tail, window, config)
}

/// Whether bets are still accepted with this much round time left.
///
/// Closes together with the estimate: at the cutoff the window has no time
/// left.
pub fn betting_open(round_remaining_seconds: i64, config: &ScoringConfig) -> bool {
    round_remaining_seconds > config.betting_cutoff_remaining
}

fn snapshot_at(t: f64, config: &ScoringConfig) -> ScoringSnapshot {
    let decay = (-config.decay_k * t).exp();
    let win = config.win_base * (1.0 + config.early_bonus * decay);
    let lose = config.lose_base * (1.0 + config.late_penalty * (1.0 - decay));

    ScoringSnapshot {
        time_progress: t,
        estimated_win_score: win.round() as i64,
        estimated_lose_score: lose.round() as i64,
        early_bonus_remaining: decay,
    }
}

/// One row of the per-minute score table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreTableRow {
    pub minute: i64,
    pub time_progress: f64,
    pub win_score: i64,
    pub lose_score: i64,
}

/// Scores at each whole minute of the betting window, for explanation panels.
pub fn score_table(config: &ScoringConfig) -> Vec<ScoreTableRow> {
    let window = config.betting_window_seconds.max(60);
    let minutes = window / 60;
    (0..=minutes)
        .map(|minute| {
            let t = ((minute * 60) as f64 / window as f64).min(1.0);
            let s = snapshot_at(t, config);
            ScoreTableRow {
                minute,
                time_progress: t,
                win_score: s.estimated_win_score,
                lose_score: s.estimated_lose_score,
            }
        })
        .collect()
}
