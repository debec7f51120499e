//! Bootstrap polling configuration (`[bootstrap]` section).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Disable to run stream-only.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_bets_interval_ms")]
    pub bets_interval_ms: u64,

    #[serde(default = "default_history_interval_ms")]
    pub history_interval_ms: u64,

    /// Page size for round history.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_bets_interval_ms() -> u64 {
    5_000
}

fn default_history_interval_ms() -> u64 {
    30_000
}

fn default_history_limit() -> u32 {
    20
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            bets_interval_ms: default_bets_interval_ms(),
            history_interval_ms: default_history_interval_ms(),
            history_limit: default_history_limit(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}
