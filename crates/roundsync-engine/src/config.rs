//! Application configuration.

use crate::error::{AppError, AppResult};
use roundsync_bootstrap::BootstrapConfig;
use roundsync_core::Symbol;
use roundsync_view::{DomainConfig, ReconcilerConfig, ScoringConfig};
use roundsync_ws::ConnectionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config path used when neither `--config` nor `ROUNDSYNC_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "ROUNDSYNC_CONFIG";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Round stream endpoint; `?symbol=` is appended per session.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// REST base URL for bootstrap data.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Initial subscription.
    #[serde(default = "default_symbol")]
    pub symbol: Symbol,
    /// Failed reconnect cycles before the view reports offline.
    #[serde(default = "default_offline_after_attempts")]
    pub offline_after_attempts: u32,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

fn default_ws_url() -> String {
    "ws://localhost:8000/ws/arena".to_string()
}

fn default_api_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_symbol() -> Symbol {
    Symbol::new("BTCUSDT")
}

fn default_offline_after_attempts() -> u32 {
    3
}

/// WebSocket configuration subset (`[websocket]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSocketConfig {
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_max_delay_ms() -> u64 {
    30_000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_outbound_capacity() -> usize {
    64
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            outbound_capacity: default_outbound_capacity(),
        }
    }
}

impl From<WebSocketConfig> for ConnectionConfig {
    fn from(cfg: WebSocketConfig) -> Self {
        Self {
            url: String::new(), // Set separately
            reconnect_base_delay_ms: cfg.reconnect_base_delay_ms,
            reconnect_max_delay_ms: cfg.reconnect_max_delay_ms,
            heartbeat_interval_ms: cfg.heartbeat_interval_ms,
            outbound_capacity: cfg.outbound_capacity,
        }
    }
}

/// Derived view tuning (`[view.reconciler]`, `[view.scoring]`, `[view.domain]`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub domain: DomainConfig,
}

impl AppConfig {
    /// Resolve the config path (explicit > `ROUNDSYNC_CONFIG` > default) and
    /// load it. A missing default file falls back to built-in defaults.
    pub fn load(explicit: Option<&str>) -> AppResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(&path);
        }

        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::from_file(DEFAULT_CONFIG_PATH)
        } else {
            tracing::warn!(path = DEFAULT_CONFIG_PATH, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.symbol.as_str().is_empty() {
            return Err(AppError::Config("symbol must not be empty".to_string()));
        }
        if self.view.reconciler.points_count == 0 {
            return Err(AppError::Config(
                "view.reconciler.points_count must be positive".to_string(),
            ));
        }
        if self.websocket.reconnect_base_delay_ms == 0 {
            return Err(AppError::Config(
                "websocket.reconnect_base_delay_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Connection settings with the stream URL filled in.
    pub fn connection_config(&self) -> ConnectionConfig {
        let mut cfg: ConnectionConfig = self.websocket.clone().into();
        cfg.url = self.ws_url.clone();
        cfg
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.bootstrap.request_timeout_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            api_url: default_api_url(),
            symbol: default_symbol(),
            offline_after_attempts: default_offline_after_attempts(),
            websocket: WebSocketConfig::default(),
            view: ViewConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}
