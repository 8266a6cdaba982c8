//! Shared fixtures for unit tests in this crate
//!
//! Integration tests use `murmur-testkit` instead; unit tests cannot, since
//! the testkit links its own copy of this crate.

use crate::community::Community;
use crate::conversion::BinaryConversion;
use crate::definition::{MessageCallbacks, MessageDefinition};
use crate::instance::MessageInstance;
use crate::suspension::Verdict;
use crate::values::{AuthenticationValue, DestinationValue, DistributionValue, PolicyValues, ResolutionValue};
use murmur_core::effects::{MessageStore, StoreError};
use murmur_core::{
    Authentication, Candidate, CommunityId, Destination, Distribution, MemberId, PolicySet,
    Resolution,
};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
pub struct CountingStore {
    inserts: AtomicU32,
    positions: AtomicU64,
    failing: AtomicBool,
}

impl CountingStore {
    pub fn inserts(&self) -> u32 {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn positions(&self) -> u64 {
        self.positions.load(Ordering::SeqCst)
    }

    pub fn fail_inserts(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

impl MessageStore for CountingStore {
    fn insert_meta_message(&self, _: CommunityId, name: &str) -> Result<u32, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::InsertFailed {
                reason: format!("refusing {name}"),
            });
        }
        Ok(self.inserts.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn assign_sequence_position(&self, _: CommunityId, _: u32, _: &[u8]) -> Result<u64, StoreError> {
        Ok(self.positions.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

pub fn community(store: Arc<CountingStore>) -> Community {
    let id = CommunityId::new(1, [0x42; 20]);
    let community = Community::new(id, store);
    let conversion = BinaryConversion::new(id, 0, 1)
        .with_type("vote", 1)
        .and_then(|c| c.with_type("dyn", 2))
        .unwrap();
    community.add_conversion(Arc::new(conversion), true);
    community
}

pub fn vote_policies() -> PolicySet {
    PolicySet::new(
        Authentication::SingleMember,
        Resolution::Linear,
        Distribution::LastSync { history_size: 1 },
        Destination::Community,
    )
}

pub fn accept_all() -> MessageCallbacks {
    MessageCallbacks::new(|_| Verdict::Proceed, |_| {})
}

pub fn community_with_vote() -> (Community, Arc<MessageDefinition>) {
    let community = community(Arc::new(CountingStore::default()));
    let vote = MessageDefinition::new(&community, "vote", vote_policies(), accept_all(), None).unwrap();
    (community, vote)
}

pub fn vote_values(global_time: u64) -> PolicyValues {
    PolicyValues::new(
        AuthenticationValue::single(MemberId([7; 20])),
        ResolutionValue::Linear,
        DistributionValue::LastSync { global_time },
        DestinationValue::Community,
    )
}

pub fn vote_message(
    community: &Community,
    vote: &Arc<MessageDefinition>,
    global_time: u64,
) -> MessageInstance {
    MessageInstance::from_values(
        community,
        vote.clone(),
        vote_values(global_time),
        b"candidate-a".to_vec(),
        None,
    )
    .unwrap()
    .with_candidate(Candidate::new("10.0.0.2:6421".parse().unwrap(), false))
}
