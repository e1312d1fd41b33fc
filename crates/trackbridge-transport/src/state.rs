//! Listener state and transport metrics

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// State of the DIS receive loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ListenerState {
    /// No socket is open
    #[default]
    Stopped,
    /// A receive loop owns a bound socket
    Listening,
}

impl std::fmt::Display for ListenerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerState::Stopped => write!(f, "Stopped"),
            ListenerState::Listening => write!(f, "Listening"),
        }
    }
}

/// Counters shared by the receiver and the sender.
///
/// Cloning is cheap; all clones update the same counters.
#[derive(Debug, Clone, Default)]
pub struct TransportMetrics {
    datagrams_received: Arc<AtomicU64>,
    bytes_received: Arc<AtomicU64>,
    decode_failures: Arc<AtomicU64>,
    tracks_emitted: Arc<AtomicU64>,
    messages_sent: Arc<AtomicU64>,
    bytes_sent: Arc<AtomicU64>,
    send_failures: Arc<AtomicU64>,
}

impl TransportMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an inbound datagram of `bytes` length
    pub fn record_datagram(&self, bytes: u64) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_track(&self) {
        self.tracks_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful send of `bytes` length
    pub fn record_sent(&self, bytes: u64) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            tracks_emitted: self.tracks_emitted.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        for counter in [
            &self.datagrams_received,
            &self.bytes_received,
            &self.decode_failures,
            &self.tracks_emitted,
            &self.messages_sent,
            &self.bytes_sent,
            &self.send_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Snapshot of transport metrics at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub datagrams_received: u64,
    pub bytes_received: u64,
    pub decode_failures: u64,
    pub tracks_emitted: u64,
    pub messages_sent: u64,
    pub bytes_sent: u64,
    pub send_failures: u64,
}

impl MetricsSnapshot {
    /// Fraction of received datagrams that failed to decode
    pub fn decode_failure_rate(&self) -> f64 {
        if self.datagrams_received > 0 {
            self.decode_failures as f64 / self.datagrams_received as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_state_display() {
        assert_eq!(ListenerState::Listening.to_string(), "Listening");
        assert_eq!(ListenerState::default(), ListenerState::Stopped);
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = TransportMetrics::new();
        let shared = metrics.clone();

        shared.record_datagram(144);
        shared.record_datagram(20);
        shared.record_decode_failure();
        shared.record_track();
        shared.record_sent(512);
        shared.record_send_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.datagrams_received, 2);
        assert_eq!(snapshot.bytes_received, 164);
        assert_eq!(snapshot.decode_failures, 1);
        assert_eq!(snapshot.tracks_emitted, 1);
        assert_eq!(snapshot.messages_sent, 1);
        assert_eq!(snapshot.bytes_sent, 512);
        assert_eq!(snapshot.send_failures, 1);
        assert_eq!(snapshot.decode_failure_rate(), 0.5);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = TransportMetrics::new();
        metrics.record_sent(100);
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }
}
