//! Candidate resolution interface

use crate::candidate::Candidate;
use std::net::SocketAddr;
use std::sync::Arc;

/// Maps candidates to socket addresses from the local node's point of view.
pub trait CandidateResolver: Send + Sync {
    /// Address packets for `candidate` must be sent to.
    fn destination_address(&self, candidate: &Candidate) -> SocketAddr;

    /// Whether `address` may be sent to at all.
    ///
    /// Endpoints skip candidates that fail this check.
    fn is_valid_remote_address(&self, address: SocketAddr) -> bool;
}

impl<T: CandidateResolver + ?Sized> CandidateResolver for Arc<T> {
    fn destination_address(&self, candidate: &Candidate) -> SocketAddr {
        (**self).destination_address(candidate)
    }

    fn is_valid_remote_address(&self, address: SocketAddr) -> bool {
        (**self).is_valid_remote_address(address)
    }
}
