//! Integration tests for roundsync-engine.
//!
//! These tests run the connection manager and the engine against a local
//! mock round server.

pub mod common;
