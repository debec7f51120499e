//! Chart domain stabilization.
//!
//! Produces a value range centered on the open price. The range only widens
//! within a round (by more than `growth_threshold` at a time) and is rebuilt
//! from scratch when the center moves or the round is replaced, so the chart
//! does not rescale on every small move.

use crate::config::DomainConfig;
use crate::reconciler::DisplaySeries;
use roundsync_core::Price;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

/// Render bounds `[lower, upper]` around `center`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChartDomain {
    pub lower: Price,
    pub upper: Price,
    pub center: Price,
    /// Half-height of the domain.
    pub deviation: Decimal,
}

impl ChartDomain {
    fn around(center: Price, deviation: Decimal) -> Self {
        Self {
            lower: Price::new(center.inner() - deviation),
            upper: Price::new(center.inner() + deviation),
            center,
            deviation,
        }
    }

    pub fn height(&self) -> Decimal {
        self.upper.inner() - self.lower.inner()
    }

    pub fn contains(&self, price: Price) -> bool {
        self.lower <= price && price <= self.upper
    }
}

/// Compute the padded half-height the series needs around `open_price`.
pub fn candidate_deviation(
    series: &DisplaySeries,
    open_price: Price,
    config: &DomainConfig,
) -> Decimal {
    let open = open_price.inner();
    let (min, max) = series
        .values()
        .fold((open, open), |(lo, hi), v| (lo.min(v.inner()), hi.max(v.inner())));

    let deviation_up = (max - open).max(Decimal::ZERO);
    let deviation_down = (open - min).max(Decimal::ZERO);
    let min_deviation = config
        .fixed_floor
        .max(open * config.min_relative_deviation);

    deviation_up.max(deviation_down).max(min_deviation) * config.padding
}

/// Stateful stabilizer holding the domain of the current round.
#[derive(Debug, Default)]
pub struct ChartDomainStabilizer {
    config: DomainConfig,
    current: Option<ChartDomain>,
}

impl ChartDomainStabilizer {
    pub fn new(config: DomainConfig) -> Self {
        Self {
            config,
            current: None,
        }
    }

    pub fn current(&self) -> Option<ChartDomain> {
        self.current
    }

    /// Drop the retained domain (round replacement).
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Recompute the domain for `series`, keeping the previous one unless the
    /// center drifted or the series needs meaningfully more room.
    pub fn update(&mut self, series: &DisplaySeries, open_price: Price) -> ChartDomain {
        let candidate = candidate_deviation(series, open_price, &self.config);

        let next = match self.current {
            None => ChartDomain::around(open_price, candidate),
            Some(prev) => {
                if self.center_drifted(&prev, open_price) {
                    debug!(
                        prev_center = %prev.center,
                        open = %open_price,
                        "Chart center drifted, rebuilding domain"
                    );
                    ChartDomain::around(open_price, candidate)
                } else if candidate > prev.deviation * (Decimal::ONE + self.config.growth_threshold)
                {
                    debug!(
                        prev = %prev.deviation,
                        candidate = %candidate,
                        "Chart domain widened"
                    );
                    ChartDomain::around(prev.center, candidate)
                } else {
                    prev
                }
            }
        };

        self.current = Some(next);
        next
    }

    fn center_drifted(&self, prev: &ChartDomain, open_price: Price) -> bool {
        if open_price.is_zero() {
            return true;
        }
        prev.center.abs_diff(open_price) / open_price.inner().abs() > self.config.center_drift
    }
}
