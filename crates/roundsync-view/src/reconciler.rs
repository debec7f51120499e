//! Price history reconciliation.
//!
//! Maps the round's raw, irregularly spaced snapshots onto a fixed number of
//! slots aligned to wall-clock round progress. The output is a pure function
//! of its input: the same history, prices, start time, duration and
//! remaining time always produce the same series.
//!
//! Slot rules:
//! - index 0 is the open price
//! - index `current_index` is the live current price
//! - slots in between take the nearest snapshot (at most `forward_grace_ms`
//!   after the slot time, within `match_tolerance_ms`), otherwise the last
//!   known price is carried forward
//! - slots after `current_index` are `None` (not yet happened)

use crate::config::ReconcilerConfig;
use roundsync_core::{Price, PriceSnapshot, Round};
use serde::Serialize;

/// One slot of the display series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayPoint {
    pub index: usize,
    pub value: Option<Price>,
}

/// Fixed-length, gap-filled series of `points_count + 1` slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplaySeries {
    pub points: Vec<DisplayPoint>,
    /// Index of the live "now" slot.
    pub current_index: usize,
}

impl DisplaySeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn value_at(&self, index: usize) -> Option<Price> {
        self.points.get(index).and_then(|p| p.value)
    }

    /// Iterate over the known (non-future) values.
    pub fn values(&self) -> impl Iterator<Item = Price> + '_ {
        self.points.iter().filter_map(|p| p.value)
    }
}

/// Inputs of the reconciliation.
#[derive(Debug, Clone, Copy)]
pub struct SeriesInput<'a> {
    /// Sorted by timestamp, non-decreasing.
    pub history: &'a [PriceSnapshot],
    pub open_price: Price,
    pub current_price: Price,
    pub start_time_ms: i64,
    pub total_duration_seconds: i64,
    pub remaining_seconds: i64,
}

impl<'a> From<&'a Round> for SeriesInput<'a> {
    fn from(round: &'a Round) -> Self {
        Self {
            history: round.price_history(),
            open_price: round.open_price,
            current_price: round.current_price,
            start_time_ms: round.start_time_ms,
            total_duration_seconds: round.total_duration_seconds,
            remaining_seconds: round.remaining_seconds,
        }
    }
}

/// Index of the live slot.
///
/// `floor(points * clamp(elapsed / total, min_progress, 1))`, computed in
/// integers so slot boundaries are exact.
pub fn current_point_index(
    points_count: usize,
    elapsed_seconds: i64,
    total_duration_seconds: i64,
    min_progress_pct: i64,
) -> usize {
    let points = points_count as i64;
    if total_duration_seconds <= 0 {
        return points_count;
    }
    let elapsed = elapsed_seconds.clamp(0, total_duration_seconds);

    // elapsed / total < min_pct / 100
    if elapsed * 100 < min_progress_pct * total_duration_seconds {
        return (points * min_progress_pct / 100) as usize;
    }
    (points * elapsed / total_duration_seconds) as usize
}

/// Wall-clock target of slot `index`.
fn slot_time_ms(start_time_ms: i64, index: usize, points_count: usize, total_ms: i64) -> i64 {
    start_time_ms + (index as i64 * total_ms) / points_count as i64
}

/// Find the snapshot nearest to `target_ms` among those no later than
/// `target_ms + grace_ms`. Returns `None` if none lies within `tolerance_ms`.
fn match_snapshot(
    history: &[PriceSnapshot],
    target_ms: i64,
    grace_ms: i64,
    tolerance_ms: i64,
) -> Option<Price> {
    let limit = target_ms + grace_ms;
    let end = history.partition_point(|s| s.timestamp_ms <= limit);
    let candidates = &history[..end];
    if candidates.is_empty() {
        return None;
    }

    // First candidate at or after the target.
    let split = candidates.partition_point(|s| s.timestamp_ms < target_ms);

    let after = if split < candidates.len() {
        // Latest snapshot sharing that timestamp.
        let ts = candidates[split].timestamp_ms;
        let last_same = candidates.partition_point(|s| s.timestamp_ms <= ts) - 1;
        Some(candidates[last_same])
    } else {
        None
    };
    let before = split.checked_sub(1).map(|i| candidates[i]);

    let best = match (before, after) {
        (Some(b), Some(a)) => {
            if (target_ms - b.timestamp_ms) <= (a.timestamp_ms - target_ms) {
                b
            } else {
                a
            }
        }
        (Some(b), None) => b,
        (None, Some(a)) => a,
        (None, None) => return None,
    };

    if (target_ms - best.timestamp_ms).abs() < tolerance_ms {
        Some(best.price)
    } else {
        None
    }
}

/// Reconcile the raw history into a display series.
pub fn reconcile(input: &SeriesInput<'_>, config: &ReconcilerConfig) -> DisplaySeries {
    let points_count = config.points_count.max(1);
    let elapsed = input.total_duration_seconds - input.remaining_seconds;
    let current_index = current_point_index(
        points_count,
        elapsed,
        input.total_duration_seconds,
        config.min_progress_pct,
    );
    let total_ms = input.total_duration_seconds.max(0) * 1000;

    let mut points = Vec::with_capacity(points_count + 1);
    points.push(DisplayPoint {
        index: 0,
        value: Some(input.open_price),
    });

    let mut last_known = input.open_price;
    for index in 1..=points_count {
        let value = if index > current_index {
            None
        } else if index == current_index {
            Some(input.current_price)
        } else {
            let target = slot_time_ms(input.start_time_ms, index, points_count, total_ms);
            if let Some(price) = match_snapshot(
                input.history,
                target,
                config.forward_grace_ms,
                config.match_tolerance_ms,
            ) {
                last_known = price;
            }
            Some(last_known)
        };
        points.push(DisplayPoint { index, value });
    }

    if current_index == 0 {
        points[0].value = Some(input.current_price);
    }

    DisplaySeries {
        points,
        current_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundsync_core::{RoundId, Symbol};
    use rust_decimal_macros::dec;

    const START: i64 = 1_700_000_000_000;

    fn px(v: rust_decimal::Decimal) -> Price {
        Price::new(v)
    }

    fn input<'a>(history: &'a [PriceSnapshot], current: Price, remaining: i64) -> SeriesInput<'a> {
        SeriesInput {
            history,
            open_price: px(dec!(100)),
            current_price: current,
            start_time_ms: START,
            total_duration_seconds: 600,
            remaining_seconds: remaining,
        }
    }

    #[test]
    fn test_current_point_index_clamps_to_minimum() {
        assert_eq!(current_point_index(600, 0, 600, 2), 12);
        assert_eq!(current_point_index(600, 10, 600, 2), 12);
        assert_eq!(current_point_index(600, 12, 600, 2), 12);
        assert_eq!(current_point_index(600, 13, 600, 2), 13);
        assert_eq!(current_point_index(600, 300, 600, 2), 300);
        assert_eq!(current_point_index(600, 900, 600, 2), 600);
        assert_eq!(current_point_index(50, 25, 600, 2), 2);
    }

    #[test]
    fn test_live_point_is_current_price_and_future_is_null() {
        // open 100, total 600, tick 101 with 590s remaining
        let history = [PriceSnapshot::new(START + 10_000, px(dec!(101)))];
        let series = reconcile(&input(&history, px(dec!(101)), 590), &ReconcilerConfig::default());

        assert_eq!(series.len(), 601);
        assert_eq!(series.current_index, 12);
        assert_eq!(series.value_at(12), Some(px(dec!(101))));
        assert_eq!(series.value_at(0), Some(px(dec!(100))));
        assert!(series.points[13..].iter().all(|p| p.value.is_none()));
    }

    #[test]
    fn test_gaps_carry_last_known_price() {
        let history = [
            PriceSnapshot::new(START + 5_000, px(dec!(101))),
            PriceSnapshot::new(START + 200_000, px(dec!(105))),
        ];
        let series = reconcile(&input(&history, px(dec!(106)), 300), &ReconcilerConfig::default());

        assert_eq!(series.current_index, 300);
        assert_eq!(series.value_at(5), Some(px(dec!(101))));
        // 5s..200s gap: slots near 5s take 101, far slots carry it forward
        assert_eq!(series.value_at(100), Some(px(dec!(101))));
        assert_eq!(series.value_at(200), Some(px(dec!(105))));
        assert_eq!(series.value_at(299), Some(px(dec!(105))));
        assert_eq!(series.value_at(300), Some(px(dec!(106))));
        assert_eq!(series.value_at(301), None);
    }

    #[test]
    fn test_unmatched_leading_slots_use_open_price() {
        // Only data at 100s: it becomes eligible 5s ahead of its own slot.
        let history = [PriceSnapshot::new(START + 100_000, px(dec!(110)))];
        let series = reconcile(&input(&history, px(dec!(111)), 450), &ReconcilerConfig::default());

        assert_eq!(series.value_at(10), Some(px(dec!(100))));
        assert_eq!(series.value_at(94), Some(px(dec!(100))));
        assert_eq!(series.value_at(95), Some(px(dec!(110))));
        assert_eq!(series.value_at(149), Some(px(dec!(110))));
    }

    #[test]
    fn test_forward_grace_window() {
        // Snapshot 4s after slot 10 is eligible; one 6s after is not.
        let history = [PriceSnapshot::new(START + 14_000, px(dec!(102)))];
        let series = reconcile(&input(&history, px(dec!(103)), 500), &ReconcilerConfig::default());
        assert_eq!(series.value_at(10), Some(px(dec!(102))));
        assert_eq!(series.value_at(8), Some(px(dec!(100))));
    }

    #[test]
    fn test_nearest_snapshot_wins() {
        let history = [
            PriceSnapshot::new(START + 48_000, px(dec!(101))),
            PriceSnapshot::new(START + 51_000, px(dec!(102))),
        ];
        let series = reconcile(&input(&history, px(dec!(103)), 400), &ReconcilerConfig::default());
        assert_eq!(series.value_at(49), Some(px(dec!(101))));
        assert_eq!(series.value_at(50), Some(px(dec!(102))));
    }

    #[test]
    fn test_stale_match_does_not_override_live_point() {
        let history = [PriceSnapshot::new(START + 300_000, px(dec!(90)))];
        let series = reconcile(&input(&history, px(dec!(95)), 300), &ReconcilerConfig::default());
        assert_eq!(series.value_at(300), Some(px(dec!(95))));
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let history: Vec<PriceSnapshot> = (0..120)
            .map(|i| PriceSnapshot::new(START + i * 2_700, px(dec!(100) + rust_decimal::Decimal::from(i % 7))))
            .collect();
        let a = reconcile(&input(&history, px(dec!(104)), 280), &ReconcilerConfig::default());
        let b = reconcile(&input(&history, px(dec!(104)), 280), &ReconcilerConfig::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_round() {
        let mut round = Round::new(RoundId(1), Symbol::new("ETHUSDT"), px(dec!(100)), START, 600);
        round.append_snapshot(PriceSnapshot::new(START + 30_000, px(dec!(99))));
        round.current_price = px(dec!(98));
        round.remaining_seconds = 540;

        let series = reconcile(&SeriesInput::from(&round), &ReconcilerConfig::default());
        assert_eq!(series.current_index, 60);
        assert_eq!(series.value_at(30), Some(px(dec!(99))));
        assert_eq!(series.value_at(60), Some(px(dec!(98))));
    }
}
