//! Endpoint variants
//!
//! All variants share one contract: `send` hands every packet to every
//! candidate and reports `true` when there was something to send and no
//! transmission failed; counters only ever grow.

mod direct;
mod discard;
mod host;
mod tunneled;

pub use direct::DirectEndpoint;
pub use discard::DiscardEndpoint;
pub use host::{DatagramReceiver, HostEndpoint, HostSocket, TransportHost};
pub use tunneled::{TunnelEndpoint, TunnelTransport};

use murmur_core::effects::CandidateResolver;
use murmur_core::Candidate;
use std::net::SocketAddr;

/// Outbound/inbound datagram transport.
pub trait Endpoint: Send + Sync {
    /// Local address the endpoint is reachable at.
    fn address(&self) -> SocketAddr;

    /// Send every packet to every candidate.
    fn send(&self, candidates: &[Candidate], packets: &[Vec<u8>]) -> bool;

    /// Bytes sent so far.
    fn total_up(&self) -> u64;

    /// Bytes received so far.
    fn total_down(&self) -> u64;

    /// Received packets dropped because the processing side had no room.
    fn total_dropped(&self) -> u64 {
        0
    }
}

/// Resolve `candidate`, skipping addresses the resolver rejects.
pub(crate) fn resolve(resolver: &dyn CandidateResolver, candidate: &Candidate) -> Option<SocketAddr> {
    let address = resolver.destination_address(candidate);
    if resolver.is_valid_remote_address(address) {
        Some(address)
    } else {
        tracing::warn!(%candidate, %address, "Skipping invalid remote address");
        None
    }
}
