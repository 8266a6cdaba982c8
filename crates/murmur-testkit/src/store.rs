//! In-memory message store

use murmur_core::effects::{MessageStore, StoreError};
use murmur_core::CommunityId;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
struct State {
    meta_messages: HashMap<(CommunityId, String), u32>,
    inserts: usize,
    positions: HashMap<CommunityId, u64>,
    stored: Vec<(CommunityId, u32, Vec<u8>)>,
    failing: bool,
}

/// Message store keeping everything in memory and counting calls.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call fail.
    pub fn fail(&self) {
        self.state.lock().failing = true;
    }

    /// Number of `insert_meta_message` calls that succeeded.
    pub fn inserts(&self) -> usize {
        self.state.lock().inserts
    }

    /// Packets persisted so far, in order.
    pub fn stored(&self) -> Vec<(CommunityId, u32, Vec<u8>)> {
        self.state.lock().stored.clone()
    }
}

impl MessageStore for MemoryStore {
    fn insert_meta_message(&self, community: CommunityId, name: &str) -> Result<u32, StoreError> {
        let mut state = self.state.lock();
        if state.failing {
            return Err(StoreError::Unavailable {
                reason: "memory store set to fail".into(),
            });
        }
        state.inserts += 1;
        let next = state.meta_messages.len() as u32 + 1;
        Ok(*state
            .meta_messages
            .entry((community, name.to_string()))
            .or_insert(next))
    }

    fn assign_sequence_position(
        &self,
        community: CommunityId,
        meta_message_id: u32,
        packet: &[u8],
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock();
        if state.failing {
            return Err(StoreError::InsertFailed {
                reason: "memory store set to fail".into(),
            });
        }
        let position = state.positions.entry(community).or_insert(0);
        *position += 1;
        let assigned = *position;
        state.stored.push((community, meta_message_id, packet.to_vec()));
        Ok(assigned)
    }
}
