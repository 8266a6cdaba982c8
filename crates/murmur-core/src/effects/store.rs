//! Persistence collaborator interface
//!
//! Schema and queries are out of scope. The message layer only needs two
//! one-shot operations from storage.

use crate::identifiers::CommunityId;
use std::sync::Arc;

/// Persistence failures surfaced to the message layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing store rejected the write
    #[error("Insert failed: {reason}")]
    InsertFailed {
        /// Reason reported by the store
        reason: String,
    },
    /// The backing store is unavailable
    #[error("Store unavailable: {reason}")]
    Unavailable {
        /// Reason reported by the store
        reason: String,
    },
}

impl From<StoreError> for crate::MurmurError {
    fn from(err: StoreError) -> Self {
        Self::storage(err.to_string())
    }
}

/// Storage operations consumed by message definitions and instances.
pub trait MessageStore: Send + Sync {
    /// Persist a message type name for `community` and return its id.
    ///
    /// Called at most once per `(community, name)`; callers cache the result.
    fn insert_meta_message(&self, community: CommunityId, name: &str) -> Result<u32, StoreError>;

    /// Persist a packet of message type `meta_message_id` and return its
    /// monotonically assigned, non-negative position.
    fn assign_sequence_position(
        &self,
        community: CommunityId,
        meta_message_id: u32,
        packet: &[u8],
    ) -> Result<u64, StoreError>;
}

impl<T: MessageStore + ?Sized> MessageStore for Arc<T> {
    fn insert_meta_message(&self, community: CommunityId, name: &str) -> Result<u32, StoreError> {
        (**self).insert_meta_message(community, name)
    }

    fn assign_sequence_position(
        &self,
        community: CommunityId,
        meta_message_id: u32,
        packet: &[u8],
    ) -> Result<u64, StoreError> {
        (**self).assign_sequence_position(community, meta_message_id, packet)
    }
}
