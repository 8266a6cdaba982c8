//! Addressable remote peers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// A remote peer as seen by the transport layer.
///
/// Candidates are owned by the overlay (discovery is out of scope here) and
/// only referenced by messages and endpoints. A tunneled candidate is reached
/// through the tunnel framing prefix instead of plain UDP.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    wan_address: SocketAddr,
    lan_address: Option<SocketAddr>,
    tunnel: bool,
}

impl Candidate {
    /// Candidate reachable at a single address.
    pub fn new(address: SocketAddr, tunnel: bool) -> Self {
        Self {
            wan_address: address,
            lan_address: None,
            tunnel,
        }
    }

    /// Candidate with distinct LAN and WAN addresses.
    pub fn with_lan_address(wan_address: SocketAddr, lan_address: SocketAddr, tunnel: bool) -> Self {
        Self {
            wan_address,
            lan_address: Some(lan_address),
            tunnel,
        }
    }

    /// Address the candidate was observed at from the outside.
    pub fn wan_address(&self) -> SocketAddr {
        self.wan_address
    }

    /// Address the candidate reports on its own network, if known.
    pub fn lan_address(&self) -> Option<SocketAddr> {
        self.lan_address
    }

    /// Whether packets to this candidate use tunnel framing.
    pub fn is_tunneled(&self) -> bool {
        self.tunnel
    }

    /// Pick the address to send to from the perspective of a node whose
    /// public address is `local_wan_address`.
    ///
    /// Peers behind the same NAT must be reached on their LAN address.
    pub fn destination_address(&self, local_wan_address: SocketAddr) -> SocketAddr {
        match self.lan_address {
            Some(lan) if self.wan_address.ip() == local_wan_address.ip() => lan,
            _ => self.wan_address,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tunnel {
            write!(f, "{}(tunnel)", self.wan_address)
        } else {
            write!(f, "{}", self.wan_address)
        }
    }
}
