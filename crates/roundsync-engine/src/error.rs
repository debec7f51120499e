//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] roundsync_ws::WsError),

    #[error("Feed error: {0}")]
    Feed(#[from] roundsync_feed::FeedError),

    #[error("Bootstrap error: {0}")]
    Bootstrap(#[from] roundsync_bootstrap::BootstrapError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] roundsync_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine stopped")]
    Stopped,
}

pub type AppResult<T> = Result<T, AppError>;
