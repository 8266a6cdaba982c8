//! Book-keeping for outstanding delays

use super::{Delay, DependencyKind};
use murmur_core::{MurmurError, SuspensionConfig};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

/// Handle of one suspended item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DelayId(u64);

impl fmt::Display for DelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delay#{}", self.0)
    }
}

/// Suspension protocol failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SuspensionError {
    /// The delay was already resumed or expired
    #[error("{id} was already resumed")]
    AlreadyResumed {
        /// Delay handle
        id: DelayId,
    },

    /// No delay was ever issued with this id
    #[error("{id} is unknown")]
    UnknownDelay {
        /// Delay handle
        id: DelayId,
    },

    /// Sequence ranges need `0 < low <= high`
    #[error("Invalid sequence range {low}..={high}")]
    InvalidSequenceRange {
        /// First missing number
        low: u32,
        /// Last missing number
        high: u32,
    },

    /// Packet-level dependency on a message or the other way round
    #[error("{kind} cannot suspend this kind of item")]
    WrongSuspendedItem {
        /// Dependency kind
        kind: DependencyKind,
    },

    /// The suspended item lacks the data a request needs
    #[error("Cannot build request: {reason}")]
    Unrequestable {
        /// What is missing
        reason: String,
    },
}

impl From<SuspensionError> for MurmurError {
    fn from(err: SuspensionError) -> Self {
        match err {
            SuspensionError::UnknownDelay { .. } => Self::not_found(err.to_string()),
            _ => Self::invalid(err.to_string()),
        }
    }
}

struct Pending {
    delay: Delay,
    deadline: Instant,
}

/// Outstanding delays, keyed by issued id.
///
/// Ids are issued sequentially, so an id below the next one that is no
/// longer pending has been resumed or expired.
pub struct SuspensionRegistry {
    config: SuspensionConfig,
    next_id: u64,
    pending: BTreeMap<DelayId, Pending>,
}

impl SuspensionRegistry {
    /// Empty registry using `config` for per-kind timeouts.
    pub fn new(config: SuspensionConfig) -> Self {
        Self {
            config,
            next_id: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Timeout table in use.
    pub fn config(&self) -> &SuspensionConfig {
        &self.config
    }

    /// Record `delay`, which times out one kind-specific timeout after `now`.
    pub fn insert(&mut self, delay: Delay, now: Instant) -> DelayId {
        let id = DelayId(self.next_id);
        self.next_id += 1;
        let deadline = now + delay.dependency().kind().timeout(&self.config);
        self.pending.insert(id, Pending { delay, deadline });
        id
    }

    /// Remove `id` so it can be resumed. Succeeds at most once per id.
    pub fn take(&mut self, id: DelayId) -> Result<Delay, SuspensionError> {
        match self.pending.remove(&id) {
            Some(pending) => Ok(pending.delay),
            None if id.0 < self.next_id => Err(SuspensionError::AlreadyResumed { id }),
            None => Err(SuspensionError::UnknownDelay { id }),
        }
    }

    /// Whether `id` is still waiting.
    pub fn is_pending(&self, id: DelayId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Number of waiting delays.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Resume every delay past its deadline as a timeout and return their ids.
    pub fn expire(&mut self, now: Instant) -> Vec<DelayId> {
        let overdue: Vec<DelayId> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in &overdue {
            if let Some(pending) = self.pending.remove(id) {
                tracing::debug!(delay = %id, "Delay expired");
                pending.delay.time_out();
            }
        }
        overdue
    }
}
