//! REST bootstrap data for the arena view.
//!
//! Thin typed boundary over the backend's REST API: the bets placed on the
//! current round and the settled round history. Fetches run off the stream's
//! hot path and never touch the live round.

pub mod client;
pub mod config;
pub mod error;
pub mod poller;
pub mod types;

pub use client::BootstrapClient;
pub use config::BootstrapConfig;
pub use error::{BootstrapError, BootstrapResult};
pub use poller::{BootstrapPoller, BootstrapUpdate, RefreshRequest};
pub use types::{
    ApiEnvelope, BetDirection, CurrentRoundBet, CurrentRoundBets, RoundHistoryItem,
    RoundHistoryPage,
};
