//! Suspend/resume protocol for messages with missing dependencies
//!
//! A validate callback returns a [`Verdict`]. `Drop` is terminal. `Delay`
//! names the missing [`Dependency`]; the processor wraps the item in a
//! [`Delay`], asks the registry for an id, and emits exactly one
//! [`DependencyRequest`]. A delay is resumed at most once: with a response
//! the suspended item re-enters the pipeline, with a timeout it vanishes.
//!
//! The first three dependency kinds are detected before a message can be
//! trusted and suspend the raw packet; the last three suspend the decoded
//! message.

mod registry;

pub use registry::{DelayId, SuspensionError, SuspensionRegistry};

use crate::instance::MessageInstance;
use crate::packet::RawPacket;
use murmur_core::{Candidate, CommunityId, MemberId, SuspensionConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Outcome of validating one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Accept and apply
    Proceed,
    /// Reject permanently
    Drop(String),
    /// Suspend until a dependency arrives
    Delay(Dependency),
}

impl Verdict {
    /// Reject with `reason`.
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Drop(reason.into())
    }
}

/// Data a suspended item waits for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dependency {
    /// Identity of a signer
    MissingMember {
        /// Unknown signer
        member: MemberId,
    },
    /// The last `count` messages of `definition` authored by `member`
    MissingLastMessage {
        /// Author
        member: MemberId,
        /// Definition name
        definition: String,
        /// Number of messages requested
        count: u16,
    },
    /// The message `member` authored at `global_time`
    MissingMessage {
        /// Author
        member: MemberId,
        /// Global time of the missing message
        global_time: u64,
    },
    /// Proof that the signer held the required permission
    MissingProof,
    /// Sequence numbers `low..=high` of the signer
    MissingSequence {
        /// First missing sequence number
        low: u32,
        /// Last missing sequence number
        high: u32,
    },
    /// Subjective set of the signer for `cluster`
    MissingSubjectiveSet {
        /// Subjective set cluster
        cluster: u8,
    },
}

impl Dependency {
    /// Sequence range dependency; requires `0 < low <= high`.
    pub fn missing_sequence(low: u32, high: u32) -> Result<Self, SuspensionError> {
        if low == 0 || low > high {
            return Err(SuspensionError::InvalidSequenceRange { low, high });
        }
        Ok(Self::MissingSequence { low, high })
    }

    /// Kind of this dependency.
    pub fn kind(&self) -> DependencyKind {
        match self {
            Self::MissingMember { .. } => DependencyKind::MissingMember,
            Self::MissingLastMessage { .. } => DependencyKind::MissingLastMessage,
            Self::MissingMessage { .. } => DependencyKind::MissingMessage,
            Self::MissingProof => DependencyKind::MissingProof,
            Self::MissingSequence { .. } => DependencyKind::MissingSequence,
            Self::MissingSubjectiveSet { .. } => DependencyKind::MissingSubjectiveSet,
        }
    }
}

/// Parameter-free dependency discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    /// Missing signer identity
    MissingMember,
    /// Missing last messages of a member
    MissingLastMessage,
    /// Missing message at a global time
    MissingMessage,
    /// Missing authorization proof
    MissingProof,
    /// Missing sequence range
    MissingSequence,
    /// Missing subjective set
    MissingSubjectiveSet,
}

impl DependencyKind {
    /// Whether this kind suspends the raw packet rather than the decoded
    /// message.
    pub fn suspends_packet(self) -> bool {
        matches!(
            self,
            Self::MissingMember | Self::MissingLastMessage | Self::MissingMessage
        )
    }

    /// How long a delay of this kind waits before timing out.
    pub fn timeout(self, config: &SuspensionConfig) -> Duration {
        match self {
            Self::MissingMember => config.missing_member_timeout,
            Self::MissingLastMessage => config.missing_last_message_timeout,
            Self::MissingMessage => config.missing_message_timeout,
            Self::MissingProof => config.missing_proof_timeout,
            Self::MissingSequence => config.missing_sequence_timeout,
            Self::MissingSubjectiveSet => config.missing_subjective_set_timeout,
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingMember => "missing-member",
            Self::MissingLastMessage => "missing-last-message",
            Self::MissingMessage => "missing-message",
            Self::MissingProof => "missing-proof",
            Self::MissingSequence => "missing-sequence",
            Self::MissingSubjectiveSet => "missing-subjective-set",
        };
        f.write_str(name)
    }
}

/// An item waiting on a delay.
#[derive(Debug)]
pub enum Suspended {
    /// Not yet trusted; re-parsed on resume
    Packet(RawPacket),
    /// Decoded; re-validated on resume
    Message(MessageInstance),
}

impl Suspended {
    /// Name of the suspended item's definition.
    pub fn name(&self) -> &str {
        match self {
            Self::Packet(packet) => packet.name(),
            Self::Message(message) => message.name(),
        }
    }

    /// Community of the suspended item.
    pub fn community(&self) -> CommunityId {
        match self {
            Self::Packet(packet) => packet.definition().community(),
            Self::Message(message) => message.definition().community(),
        }
    }
}

/// Outbound request for a missing dependency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRequest {
    /// Peer to ask
    pub candidate: Candidate,
    /// Community the request belongs to
    pub community: CommunityId,
    /// What to ask for
    pub body: RequestBody,
}

/// The six request shapes, one per dependency kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum RequestBody {
    MissingIdentity {
        member: MemberId,
    },
    MissingLastMessage {
        member: MemberId,
        definition: String,
        count: u16,
    },
    MissingMessage {
        member: MemberId,
        global_time: u64,
    },
    MissingProof {
        member: MemberId,
        global_time: u64,
    },
    MissingSequence {
        member: MemberId,
        definition: String,
        low: u32,
        high: u32,
    },
    MissingSubjectiveSet {
        member: MemberId,
        cluster: u8,
    },
}

impl RequestBody {
    /// Kind of dependency this request resolves.
    pub fn kind(&self) -> DependencyKind {
        match self {
            Self::MissingIdentity { .. } => DependencyKind::MissingMember,
            Self::MissingLastMessage { .. } => DependencyKind::MissingLastMessage,
            Self::MissingMessage { .. } => DependencyKind::MissingMessage,
            Self::MissingProof { .. } => DependencyKind::MissingProof,
            Self::MissingSequence { .. } => DependencyKind::MissingSequence,
            Self::MissingSubjectiveSet { .. } => DependencyKind::MissingSubjectiveSet,
        }
    }
}

/// A suspended item together with what it waits for.
#[derive(Debug)]
pub struct Delay {
    dependency: Dependency,
    suspended: Suspended,
    candidate: Candidate,
}

impl Delay {
    /// Suspend `suspended`, which came from `candidate`.
    ///
    /// Packet-level dependencies must suspend a packet and message-level
    /// ones a message.
    pub fn new(
        dependency: Dependency,
        suspended: Suspended,
        candidate: Candidate,
    ) -> Result<Self, SuspensionError> {
        let kind = dependency.kind();
        if kind.suspends_packet() != matches!(suspended, Suspended::Packet(_)) {
            return Err(SuspensionError::WrongSuspendedItem { kind });
        }
        Ok(Self {
            dependency,
            suspended,
            candidate,
        })
    }

    /// Missing dependency.
    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    /// Peer the suspended item came from; requests go back to it.
    pub fn candidate(&self) -> Candidate {
        self.candidate
    }

    /// Suspended item.
    pub fn suspended(&self) -> &Suspended {
        &self.suspended
    }

    /// Build the one outbound request for this delay.
    pub fn build_request(&self) -> Result<DependencyRequest, SuspensionError> {
        let body = match &self.dependency {
            Dependency::MissingMember { member } => RequestBody::MissingIdentity { member: *member },
            Dependency::MissingLastMessage {
                member,
                definition,
                count,
            } => RequestBody::MissingLastMessage {
                member: *member,
                definition: definition.clone(),
                count: *count,
            },
            Dependency::MissingMessage {
                member,
                global_time,
            } => RequestBody::MissingMessage {
                member: *member,
                global_time: *global_time,
            },
            Dependency::MissingProof => {
                let message = self.message()?;
                RequestBody::MissingProof {
                    member: signer(message)?,
                    global_time: message.distribution().global_time().ok_or_else(|| {
                        SuspensionError::Unrequestable {
                            reason: format!("{} carries no global time", message.name()),
                        }
                    })?,
                }
            }
            Dependency::MissingSequence { low, high } => {
                let message = self.message()?;
                RequestBody::MissingSequence {
                    member: signer(message)?,
                    definition: message.name().to_string(),
                    low: *low,
                    high: *high,
                }
            }
            Dependency::MissingSubjectiveSet { cluster } => RequestBody::MissingSubjectiveSet {
                member: signer(self.message()?)?,
                cluster: *cluster,
            },
        };

        Ok(DependencyRequest {
            candidate: self.candidate,
            community: self.suspended.community(),
            body,
        })
    }

    /// Consume the delay with the dependency's response, or `None` on
    /// timeout. Only a response hands the suspended item back.
    pub fn resume(self, response: Option<&MessageInstance>) -> Option<(Candidate, Suspended)> {
        match response {
            Some(response) => {
                tracing::debug!(
                    dependency = %self.dependency.kind(),
                    response = response.name(),
                    suspended = self.suspended.name(),
                    "Dependency answered, resubmitting"
                );
                Some((self.candidate, self.suspended))
            }
            None => {
                self.time_out();
                None
            }
        }
    }

    /// Consume the delay without a response, discarding the suspended item.
    pub fn time_out(self) {
        tracing::debug!(
            dependency = %self.dependency.kind(),
            suspended = self.suspended.name(),
            "Dependency timed out, discarding"
        );
    }

    fn message(&self) -> Result<&MessageInstance, SuspensionError> {
        match &self.suspended {
            Suspended::Message(message) => Ok(message),
            Suspended::Packet(_) => Err(SuspensionError::WrongSuspendedItem {
                kind: self.dependency.kind(),
            }),
        }
    }
}

fn signer(message: &MessageInstance) -> Result<MemberId, SuspensionError> {
    message
        .authentication()
        .members()
        .first()
        .copied()
        .ok_or_else(|| SuspensionError::Unrequestable {
            reason: format!("{} has no signer", message.name()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_range_bounds() {
        assert!(Dependency::missing_sequence(1, 1).is_ok());
        assert!(Dependency::missing_sequence(3, 9).is_ok());
        assert_eq!(
            Dependency::missing_sequence(0, 4),
            Err(SuspensionError::InvalidSequenceRange { low: 0, high: 4 })
        );
        assert!(Dependency::missing_sequence(5, 4).is_err());
    }

    #[test]
    fn test_kind_timeouts_follow_config() {
        let config = SuspensionConfig::default();
        assert_eq!(
            DependencyKind::MissingMember.timeout(&config),
            Duration::from_secs(10)
        );
        assert_eq!(
            DependencyKind::MissingProof.timeout(&config),
            Duration::from_secs(20)
        );
        assert!(DependencyKind::MissingMessage.suspends_packet());
        assert!(!DependencyKind::MissingSubjectiveSet.suspends_packet());
    }
}
