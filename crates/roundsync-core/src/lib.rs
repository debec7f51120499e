//! Core domain types for the live round synchronization engine.
//!
//! This crate provides the types shared by every layer of the engine:
//! - `Price`: Precision-safe decimal price
//! - `RoundId`, `Symbol`: Identity of a round on a symbol stream
//! - `Round`, `PriceSnapshot`: The authoritative round entity and its raw history
//! - `ScoringSnapshot`: Advisory time-decayed score estimate
//! - `Clock`: Wall-clock abstraction for deterministic tests

pub mod clock;
pub mod decimal;
pub mod error;
pub mod round;

pub use clock::{Clock, FixedClock, SystemClock};
pub use decimal::Price;
pub use error::{CoreError, Result};
pub use round::{
    PriceSnapshot, Round, RoundId, RoundOutcome, RoundStatus, ScoringSnapshot, Symbol,
};
