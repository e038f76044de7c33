use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Running counters for one relay.
#[derive(Debug, Default)]
pub struct RelayStats {
    packets_sent: AtomicU64,
    bytes_sent: AtomicU64,
    packets_received: AtomicU64,
    bytes_received: AtomicU64,
    overflows: AtomicU64,
    overwritten: AtomicU64,
    truncated_bytes: AtomicU64,
    dropped_transmits: AtomicU64,
    transport_faults: AtomicU64,
}

/// Point-in-time copy of [`RelayStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub packets_received: u64,
    pub bytes_received: u64,
    /// Inbound reads dropped because the packet would exceed the maximum length.
    pub overflows: u64,
    /// Unread mailbox buffers replaced by a newer one, either direction.
    pub overwritten: u64,
    /// Received bytes cut off because the reader asked for fewer.
    pub truncated_bytes: u64,
    /// Transmits discarded while the transport was down.
    pub dropped_transmits: u64,
    pub transport_faults: u64,
}

impl RelayStats {
    pub(crate) fn record_sent(&self, bytes: usize) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self, bytes: usize) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_overflow(&self) {
        self.overflows.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overwritten(&self) {
        self.overwritten.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_truncated(&self, bytes: usize) {
        self.truncated_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_transmit(&self) {
        self.dropped_transmits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fault(&self) {
        self.transport_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            overflows: self.overflows.load(Ordering::Relaxed),
            overwritten: self.overwritten.load(Ordering::Relaxed),
            truncated_bytes: self.truncated_bytes.load(Ordering::Relaxed),
            dropped_transmits: self.dropped_transmits.load(Ordering::Relaxed),
            transport_faults: self.transport_faults.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let stats = RelayStats::default();
        stats.record_sent(3);
        stats.record_sent(4);
        stats.record_received(10);
        stats.record_overflow();
        stats.record_fault();
        stats.record_truncated(16);

        let snap = stats.snapshot();
        assert_eq!(snap.packets_sent, 2);
        assert_eq!(snap.bytes_sent, 7);
        assert_eq!(snap.packets_received, 1);
        assert_eq!(snap.bytes_received, 10);
        assert_eq!(snap.overflows, 1);
        assert_eq!(snap.transport_faults, 1);
        assert_eq!(snap.overwritten, 0);
        assert_eq!(snap.truncated_bytes, 16);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let stats = RelayStats::default();
        stats.record_dropped_transmit();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["dropped_transmits"], 1);
        assert_eq!(json["packets_sent"], 0);
    }
}
