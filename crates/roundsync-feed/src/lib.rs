//! Round lifecycle state machine.
//!
//! Turns inbound stream frames into typed `RoundEvent`s and folds them into
//! the single authoritative `Round` held by `RoundTracker`.

pub mod error;
pub mod parser;
pub mod round_state;

pub use error::{FeedError, FeedResult};
pub use parser::{parse_iso_ms, FrameParser, PriceTick, RoundEnd, RoundEvent, RoundStart};
pub use round_state::{
    ApplyOutcome, LifecycleState, RejectReason, RoundTracker, DEFAULT_STALE_TICK_GRACE_MS,
};
