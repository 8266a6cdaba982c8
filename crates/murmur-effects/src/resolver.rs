//! Candidate resolution from the local node's addresses

use murmur_core::effects::CandidateResolver;
use murmur_core::Candidate;
use parking_lot::RwLock;
use std::net::SocketAddr;

/// Resolves candidates against the local LAN and (learned) WAN address.
///
/// The WAN address starts out equal to the LAN address and is updated as
/// peers report how they see us.
#[derive(Debug)]
pub struct StaticResolver {
    lan_address: SocketAddr,
    wan_address: RwLock<SocketAddr>,
}

impl StaticResolver {
    /// Resolver for a node bound at `lan_address`.
    pub fn new(lan_address: SocketAddr) -> Self {
        Self {
            lan_address,
            wan_address: RwLock::new(lan_address),
        }
    }

    /// Record the address peers observe us at.
    pub fn set_wan_address(&self, address: SocketAddr) {
        let mut wan = self.wan_address.write();
        if *wan != address {
            tracing::debug!(old = %*wan, new = %address, "WAN address changed");
            *wan = address;
        }
    }

    /// Current WAN address.
    pub fn wan_address(&self) -> SocketAddr {
        *self.wan_address.read()
    }
}

impl CandidateResolver for StaticResolver {
    fn destination_address(&self, candidate: &Candidate) -> SocketAddr {
        candidate.destination_address(self.wan_address())
    }

    fn is_valid_remote_address(&self, address: SocketAddr) -> bool {
        !address.ip().is_unspecified()
            && !address.ip().is_multicast()
            && address.port() != 0
            && address != self.lan_address
            && address != self.wan_address()
    }
}
