//! Handoff from I/O tasks to the processing context
//!
//! Every endpoint delivers received datagrams through one bounded channel.
//! It is the only place data crosses from the socket side to the
//! single-threaded processing side.
//!
//! Async receive tasks wait for room. Host and tunnel callbacks cannot wait,
//! so when the channel is full their batch is dropped whole and its packets
//! are counted in [`ByteCounters::total_dropped`].

use crate::counters::ByteCounters;
use crate::tunnel;
use murmur_core::Candidate;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Datagrams received in one wake, with their senders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundBatch {
    /// Sender and packet, tunnel prefix already stripped
    pub packets: Vec<(Candidate, Vec<u8>)>,
}

impl InboundBatch {
    /// Attribute raw datagrams to candidates, stripping tunnel framing, and
    /// count their full size as received.
    pub fn from_datagrams(datagrams: Vec<(SocketAddr, Vec<u8>)>, counters: &ByteCounters) -> Self {
        counters.add_down(datagrams.iter().map(|(_, data)| data.len()).sum());
        let packets = datagrams
            .into_iter()
            .map(|(address, data)| {
                let (tunneled, packet) = tunnel::strip(data);
                (Candidate::new(address, tunneled), packet)
            })
            .collect();
        Self { packets }
    }

    /// Number of packets.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}

/// Sending half of the inbound channel.
#[derive(Debug, Clone)]
pub struct InboundSink {
    sender: mpsc::Sender<InboundBatch>,
}

/// Receiving half of the inbound channel, owned by the processing context.
pub type InboundReceiver = mpsc::Receiver<InboundBatch>;

/// Bounded inbound channel holding at most `capacity` batches.
pub fn inbound_channel(capacity: usize) -> (InboundSink, InboundReceiver) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (InboundSink { sender }, receiver)
}

impl InboundSink {
    /// Deliver from an async context, waiting for room.
    pub async fn deliver(&self, batch: InboundBatch, counters: &ByteCounters) -> bool {
        if batch.is_empty() {
            return true;
        }
        match self.sender.send(batch).await {
            Ok(()) => true,
            Err(mpsc::error::SendError(batch)) => {
                tracing::debug!("Inbound receiver closed, dropping batch");
                counters.add_dropped(batch.len());
                false
            }
        }
    }

    /// Deliver from a host callback without blocking; a full channel drops
    /// the batch.
    pub fn try_deliver(&self, batch: InboundBatch, counters: &ByteCounters) -> bool {
        if batch.is_empty() {
            return true;
        }
        match self.sender.try_send(batch) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(batch)) => {
                tracing::warn!(packets = batch.len(), "Inbound queue full, dropping batch");
                counters.add_dropped(batch.len());
                false
            }
            Err(mpsc::error::TrySendError::Closed(batch)) => {
                tracing::debug!("Inbound receiver closed, dropping batch");
                counters.add_dropped(batch.len());
                false
            }
        }
    }
}
