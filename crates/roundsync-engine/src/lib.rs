//! Live round synchronization engine.
//!
//! Wires the connection manager, the round state machine, the derived views
//! and the REST bootstrap poller into one single-writer event loop:
//! - `Engine`: owns all mutable state and runs the loop
//! - `EngineHandle`: read-only `EngineView` snapshots plus symbol switching
//! - `AppConfig`: TOML configuration

pub mod config;
pub mod engine;
pub mod error;
pub mod state;

pub use config::{AppConfig, ViewConfig, WebSocketConfig};
pub use engine::{Engine, EngineCommand, EngineHandle};
pub use error::{AppError, AppResult};
pub use state::{EngineState, EngineView};
