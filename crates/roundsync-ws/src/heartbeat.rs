//! Application-level heartbeat.
//!
//! Pings go out on a fixed interval while connected. A missing pong is not a
//! failure: only a transport close ends a session. Pongs are used for RTT
//! logging.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::time::Duration;
use tracing::debug;

/// Heartbeat bookkeeping for one connection manager.
pub struct HeartbeatManager {
    interval_ms: u64,
    last_ping: RwLock<Option<DateTime<Utc>>>,
    /// Pings sent since the last pong.
    outstanding: RwLock<u32>,
}

impl HeartbeatManager {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ping: RwLock::new(None),
            outstanding: RwLock::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    /// Reset state on a fresh connection.
    pub fn reset(&self) {
        *self.last_ping.write() = None;
        *self.outstanding.write() = 0;
    }

    pub fn record_ping(&self) {
        let now = Utc::now();
        *self.last_ping.write() = Some(now);
        let mut outstanding = self.outstanding.write();
        *outstanding = outstanding.saturating_add(1);
        if *outstanding > 1 {
            debug!(outstanding = *outstanding, "Ping sent with previous pong outstanding");
        }
    }

    /// Record a pong and return the round-trip time to the last ping.
    pub fn record_pong(&self) -> Option<i64> {
        *self.outstanding.write() = 0;

        let rtt_ms = (*self.last_ping.read()).map(|ping| (Utc::now() - ping).num_milliseconds());
        if let Some(rtt_ms) = rtt_ms {
            debug!(rtt_ms, "Received pong");
        }
        rtt_ms
    }

    #[cfg(test)]
    fn outstanding(&self) -> u32 {
        *self.outstanding.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let hb = HeartbeatManager::new(30_000);
        assert_eq!(hb.outstanding(), 0);
        assert!(hb.record_pong().is_none());
        assert_eq!(hb.interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_ping_pong_rtt() {
        let hb = HeartbeatManager::new(30_000);
        hb.record_ping();
        hb.record_ping();
        assert_eq!(hb.outstanding(), 2);

        let rtt = hb.record_pong();
        assert!(rtt.is_some_and(|ms| ms >= 0));
        assert_eq!(hb.outstanding(), 0);
    }

    #[test]
    fn test_pong_without_ping_has_no_rtt() {
        let hb = HeartbeatManager::new(30_000);
        assert!(hb.record_pong().is_none());
    }

    #[test]
    fn test_reset() {
        let hb = HeartbeatManager::new(30_000);
        hb.record_ping();
        hb.reset();
        assert_eq!(hb.outstanding(), 0);
        assert!(hb.record_pong().is_none());
    }
}
