//! Monotonic traffic counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Bytes sent and received by one endpoint.
///
/// Received bytes are counted when a datagram comes off the socket, before
/// the inbound channel. Packets the channel could not take are counted
/// separately in `dropped`.
#[derive(Debug, Default)]
pub struct ByteCounters {
    up: AtomicU64,
    down: AtomicU64,
    dropped: AtomicU64,
}

impl ByteCounters {
    /// Record `bytes` handed to the network.
    pub fn add_up(&self, bytes: usize) {
        self.up.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record `bytes` received.
    pub fn add_down(&self, bytes: usize) {
        self.down.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record `packets` received but never handed to processing.
    pub fn add_dropped(&self, packets: usize) {
        self.dropped.fetch_add(packets as u64, Ordering::Relaxed);
    }

    /// Total bytes sent.
    pub fn total_up(&self) -> u64 {
        self.up.load(Ordering::Relaxed)
    }

    /// Total bytes received.
    pub fn total_down(&self) -> u64 {
        self.down.load(Ordering::Relaxed)
    }

    /// Received packets dropped before processing.
    pub fn total_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
