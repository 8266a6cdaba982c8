//! Common identities, candidates and a ready-made community
//!
//! The test community speaks one binary conversion with these type bytes:
//!
//! | name | byte |
//! |---|---|
//! | `vote` | 1 |
//! | `vote2` | 2 |
//! | `identity` | 3 |
//! | `proposal` | 4 |
//! | `range` | 5 |

use murmur_core::effects::CandidateResolver;
use murmur_core::{
    Authentication, Candidate, CommunityId, Destination, Distribution, MemberId, PolicySet,
    Resolution,
};
use murmur_messages::{
    AuthenticationValue, BinaryConversion, Community, DestinationValue, DistributionValue,
    MessageCallbacks, MessageDefinition, MessageInstance, PolicyValues, ResolutionValue, Verdict,
};
use std::net::SocketAddr;
use std::sync::Arc;

/// Type bytes registered by [`test_community`].
pub const TEST_TYPES: [(&str, u8); 5] = [
    ("vote", 1),
    ("vote2", 2),
    ("identity", 3),
    ("proposal", 4),
    ("range", 5),
];

/// Community id used by every fixture.
pub fn community_id() -> CommunityId {
    CommunityId::new(1, [0x42; 20])
}

/// Deterministic member `n`.
pub fn member(n: u8) -> MemberId {
    MemberId([n; 20])
}

/// Plain UDP candidate at `10.0.0.n:6421`.
pub fn candidate(n: u8) -> Candidate {
    Candidate::new(SocketAddr::from(([10, 0, 0, n], 6421)), false)
}

/// Tunneled candidate at `10.0.1.n:6421`.
pub fn tunneled_candidate(n: u8) -> Candidate {
    Candidate::new(SocketAddr::from(([10, 0, 1, n], 6421)), true)
}

/// Community over `store` with the default conversion from [`TEST_TYPES`].
pub fn test_community(store: Arc<dyn murmur_core::effects::MessageStore>) -> Arc<Community> {
    let id = community_id();
    let community = Community::new(id, store);
    let mut conversion = BinaryConversion::new(id, 0, 1);
    for (name, byte) in TEST_TYPES {
        conversion.define(name, byte).unwrap();
    }
    community.add_conversion(Arc::new(conversion), true);
    Arc::new(community)
}

/// The classic vote type: signed, linear, last-sync of one, to everyone.
pub fn vote_policies() -> PolicySet {
    PolicySet::new(
        Authentication::SingleMember,
        Resolution::Linear,
        Distribution::LastSync { history_size: 1 },
        Destination::Community,
    )
}

/// Callbacks accepting everything and doing nothing.
pub fn accept_all() -> MessageCallbacks {
    MessageCallbacks::new(|_| Verdict::Proceed, |_| {})
}

/// `vote` registered on `community` with `callbacks`.
pub fn vote_definition(
    community: &Community,
    callbacks: MessageCallbacks,
) -> Arc<MessageDefinition> {
    MessageDefinition::new(community, "vote", vote_policies(), callbacks, None).unwrap()
}

/// Values matching [`vote_policies`] authored by `author`.
pub fn vote_values(author: MemberId, global_time: u64) -> PolicyValues {
    PolicyValues::new(
        AuthenticationValue::single(author),
        ResolutionValue::Linear,
        DistributionValue::LastSync { global_time },
        DestinationValue::Community,
    )
}

/// A vote from member 7 received from candidate 2.
pub fn vote_message(
    community: &Community,
    vote: &Arc<MessageDefinition>,
    global_time: u64,
) -> MessageInstance {
    MessageInstance::from_values(
        community,
        vote.clone(),
        vote_values(member(7), global_time),
        b"candidate-a".to_vec(),
        None,
    )
    .unwrap()
    .with_candidate(candidate(2))
}

/// Resolver that sends to the WAN address and accepts any routable port.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenResolver;

impl CandidateResolver for OpenResolver {
    fn destination_address(&self, candidate: &Candidate) -> SocketAddr {
        candidate.wan_address()
    }

    fn is_valid_remote_address(&self, address: SocketAddr) -> bool {
        address.port() != 0 && !address.ip().is_unspecified()
    }
}
