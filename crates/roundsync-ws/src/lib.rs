//! WebSocket client for per-symbol round streams.
//!
//! Provides:
//! - Automatic reconnection with exact exponential backoff (no jitter)
//! - Application-level heartbeat (`{"action":"ping"}`), pong RTT logging
//! - In-band symbol switching and teardown
//! - Typed inbound frames delivered over an mpsc channel
//! - Connection status published over a watch channel

pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod message;

pub use connection::{
    backoff_delay, session_url, ConnectionConfig, ConnectionManager, ConnectionState,
    ConnectionStatus,
};
pub use error::{WsError, WsResult};
pub use heartbeat::HeartbeatManager;
pub use message::{
    ControlFrame, InboundFrame, PriceTickPayload, RoundEndPayload, RoundStartPayload, WireSnapshot,
};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any `wss://` connection is made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
