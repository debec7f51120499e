//! Prometheus metrics for roundsync.
//!
//! Covers:
//! - Connection state and reconnects
//! - Inbound frame flow and drops
//! - Rejected ticks and round replacements
//! - Bootstrap (REST) fetch results
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means duplicate metric
//! names, a startup configuration error, and only happens during static
//! initialization.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_int_counter, CounterVec,
    Encoder, Gauge, GaugeVec, IntCounter, TextEncoder,
};

/// WebSocket connection state (1 = connected, 0 = otherwise).
pub static WS_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "roundsync_ws_connected",
        "WebSocket connection state (1=connected)"
    )
    .unwrap()
});

/// Labels: state (disconnected/connecting/connected/reconnecting)
pub static WS_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "roundsync_ws_state",
        "WebSocket connection state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Labels: reason (closed/stream_ended/error)
pub static WS_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "roundsync_ws_reconnect_total",
        "Total WebSocket reconnection attempts",
        &["reason"]
    )
    .unwrap()
});

/// Labels: kind (round_start/price_tick/round_end/no_round/bets_update/pong/error)
pub static FRAMES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "roundsync_frames_total",
        "Total inbound frames parsed",
        &["kind"]
    )
    .unwrap()
});

/// Labels: reason (malformed/binary/invalid)
pub static FRAMES_DROPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "roundsync_frames_dropped_total",
        "Total inbound frames dropped before dispatch",
        &["reason"]
    )
    .unwrap()
});

/// Labels: reason (no_round/settled/stale_round/wrong_symbol/out_of_order)
pub static TICKS_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "roundsync_ticks_rejected_total",
        "Total events rejected by the round state machine",
        &["reason"]
    )
    .unwrap()
});

pub static ROUND_REPLACED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "roundsync_round_replaced_total",
        "Total round replacements"
    )
    .unwrap()
});

/// Labels: endpoint (current_bets/round_history), status (ok/error)
pub static BOOTSTRAP_FETCH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "roundsync_bootstrap_fetch_total",
        "Total bootstrap REST fetches",
        &["endpoint", "status"]
    )
    .unwrap()
});

const WS_STATES: [&str; 4] = ["disconnected", "connecting", "connected", "reconnecting"];

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    pub fn ws_connected() {
        WS_CONNECTED.set(1.0);
    }

    pub fn ws_disconnected() {
        WS_CONNECTED.set(0.0);
    }

    /// Only the active state is set to 1.
    pub fn ws_state_set(state: &str) {
        for s in WS_STATES {
            WS_STATE.with_label_values(&[s]).set(0.0);
        }
        WS_STATE.with_label_values(&[state]).set(1.0);
    }

    pub fn ws_reconnect(reason: &str) {
        WS_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn frame_received(kind: &str) {
        FRAMES_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn frame_dropped(reason: &str) {
        FRAMES_DROPPED_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn tick_rejected(reason: &str) {
        TICKS_REJECTED_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn round_replaced() {
        ROUND_REPLACED_TOTAL.inc();
    }

    pub fn bootstrap_fetch(endpoint: &str, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        BOOTSTRAP_FETCH_TOTAL
            .with_label_values(&[endpoint, status])
            .inc();
    }

    /// Render the default registry in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let families = prometheus::gather();
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buf)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
