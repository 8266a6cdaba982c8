//! Endpoint that throws everything away

use super::Endpoint;
use murmur_core::Candidate;
use std::net::{Ipv4Addr, SocketAddr};

/// Placeholder used before a real endpoint exists. Performs no I/O and no
/// accounting.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardEndpoint;

impl Endpoint for DiscardEndpoint {
    fn address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
    }

    fn send(&self, candidates: &[Candidate], packets: &[Vec<u8>]) -> bool {
        let bytes: usize = packets.iter().map(Vec::len).sum();
        tracing::warn!(
            bytes,
            candidates = candidates.len(),
            "Discarding outgoing data, no endpoint available"
        );
        !candidates.is_empty() && !packets.is_empty()
    }

    fn total_up(&self) -> u64 {
        0
    }

    fn total_down(&self) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discards_without_accounting() {
        let endpoint = DiscardEndpoint;
        let candidate = Candidate::new("10.0.0.1:6421".parse().unwrap(), false);

        assert!(endpoint.send(&[candidate], &[vec![1; 10]]));
        assert!(!endpoint.send(&[], &[vec![1; 10]]));
        assert_eq!(endpoint.total_up(), 0);
        assert_eq!(endpoint.address().port(), 0);
    }
}
