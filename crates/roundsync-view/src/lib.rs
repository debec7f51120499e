//! Derived render views for the live round.
//!
//! Everything here is computed from a `Round` and never mutates it:
//! - `reconciler`: fixed-cardinality display series from irregular snapshots
//! - `scoring`: advisory time-decayed win/lose score estimate
//! - `chart_domain`: hysteresis-stabilized value range for rendering

pub mod chart_domain;
pub mod config;
pub mod reconciler;
pub mod scoring;

pub use chart_domain::{ChartDomain, ChartDomainStabilizer};
pub use config::{DomainConfig, ReconcilerConfig, ScoringConfig};
pub use reconciler::{reconcile, DisplayPoint, DisplaySeries, SeriesInput};
pub use scoring::{estimate_scoring, score_table, ScoreTableRow};
