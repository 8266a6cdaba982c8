//! Per-instance policy values
//!
//! A definition fixes a policy on each axis; every instance carries the
//! matching value (who signed it, at what global time, to whom it goes).
//! [`PolicyValues::check`] is the single place a value is matched against
//! its definition.

use crate::error::MessageError;
use murmur_core::{
    Authentication, Candidate, Destination, Distribution, MemberId, PolicyAxis, PolicyKind,
    PolicySet, Resolution,
};
use serde::{Deserialize, Serialize};

/// Signers of one message and their signatures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthenticationValue {
    /// Unsigned
    None,
    /// One signer
    SingleMember {
        /// Signer
        member: MemberId,
        /// Signature, once attached
        signature: Option<Vec<u8>>,
    },
    /// Several signers, one signature slot each
    MultiMember {
        /// Signers in signing order
        members: Vec<MemberId>,
        /// Signature slots, aligned with `members`
        signatures: Vec<Option<Vec<u8>>>,
    },
}

impl AuthenticationValue {
    /// Unsigned value for a single signer.
    pub fn single(member: MemberId) -> Self {
        Self::SingleMember {
            member,
            signature: None,
        }
    }

    /// Value for several signers with every signature slot empty.
    pub fn multi(members: Vec<MemberId>) -> Self {
        let signatures = vec![None; members.len()];
        Self::MultiMember {
            members,
            signatures,
        }
    }

    /// Kind of the policy this value belongs to.
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::None => PolicyKind::NoAuthentication,
            Self::SingleMember { .. } => PolicyKind::MemberAuthentication,
            Self::MultiMember { .. } => PolicyKind::MultiMemberAuthentication,
        }
    }

    /// Signers of this message.
    pub fn members(&self) -> Vec<MemberId> {
        match self {
            Self::None => Vec::new(),
            Self::SingleMember { member, .. } => vec![*member],
            Self::MultiMember { members, .. } => members.clone(),
        }
    }

    /// Whether every signature slot is filled.
    pub fn is_signed(&self) -> bool {
        match self {
            Self::None => true,
            Self::SingleMember { signature, .. } => signature.is_some(),
            Self::MultiMember { signatures, .. } => signatures.iter().all(Option::is_some),
        }
    }

    /// Fill the signature slot of `member`.
    pub fn attach_signature(
        &mut self,
        member: MemberId,
        signature: Vec<u8>,
    ) -> Result<(), MessageError> {
        match self {
            Self::SingleMember {
                member: signer,
                signature: slot,
            } if *signer == member => {
                *slot = Some(signature);
                Ok(())
            }
            Self::MultiMember {
                members,
                signatures,
            } => {
                let index = members
                    .iter()
                    .position(|m| *m == member)
                    .ok_or_else(|| unknown_signer(member))?;
                match signatures.get_mut(index) {
                    Some(slot) => {
                        *slot = Some(signature);
                        Ok(())
                    }
                    None => Err(unknown_signer(member)),
                }
            }
            _ => Err(unknown_signer(member)),
        }
    }

    fn check(&self, policy: &Authentication) -> Result<(), MessageError> {
        expect_kind(PolicyAxis::Authentication, policy.kind(), self.kind())?;
        if let Self::MultiMember {
            members,
            signatures,
        } = self
        {
            let expected = policy.signature_count();
            if members.len() != expected {
                return Err(MessageError::SignerCount {
                    expected,
                    found: members.len(),
                });
            }
            if signatures.len() != expected {
                return Err(MessageError::SignerCount {
                    expected,
                    found: signatures.len(),
                });
            }
        }
        Ok(())
    }
}

fn unknown_signer(member: MemberId) -> MessageError {
    MessageError::UnknownSigner {
        member: member.to_string(),
    }
}

/// Resolution in force for a dynamically resolved message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectiveResolution {
    /// No permission required at the message's global time
    Public,
    /// A granted permission was required at the message's global time
    Linear,
}

/// Resolution bound to one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionValue {
    /// No permission required
    Public,
    /// Permission required
    Linear,
    /// Whichever resolution was in force when the message was authored
    Dynamic {
        /// Resolution in force
        effective: EffectiveResolution,
    },
}

impl ResolutionValue {
    /// Kind of the policy this value belongs to.
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Public => PolicyKind::PublicResolution,
            Self::Linear => PolicyKind::LinearResolution,
            Self::Dynamic { .. } => PolicyKind::DynamicResolution,
        }
    }

    fn check(&self, policy: &Resolution) -> Result<(), MessageError> {
        expect_kind(PolicyAxis::Resolution, policy.kind(), self.kind())
    }
}

/// Distribution data bound to one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionValue {
    /// Forwarded once
    Relay,
    /// Sent directly
    Direct {
        /// Lamport-style community clock at authoring
        global_time: u64,
    },
    /// Stored and synchronized in full
    FullSync {
        /// Community clock at authoring
        global_time: u64,
        /// Per-sender sequence number, when the definition enables them
        sequence_number: Option<u32>,
    },
    /// Stored and synchronized, last messages only
    LastSync {
        /// Community clock at authoring
        global_time: u64,
    },
}

impl DistributionValue {
    /// Kind of the policy this value belongs to.
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Relay => PolicyKind::RelayDistribution,
            Self::Direct { .. } => PolicyKind::DirectDistribution,
            Self::FullSync { .. } => PolicyKind::FullSyncDistribution,
            Self::LastSync { .. } => PolicyKind::LastSyncDistribution,
        }
    }

    /// Global time, if this distribution carries one.
    pub fn global_time(&self) -> Option<u64> {
        match self {
            Self::Relay => None,
            Self::Direct { global_time }
            | Self::FullSync { global_time, .. }
            | Self::LastSync { global_time } => Some(*global_time),
        }
    }

    fn check(&self, policy: &Distribution) -> Result<(), MessageError> {
        expect_kind(PolicyAxis::Distribution, policy.kind(), self.kind())?;
        if let Self::FullSync {
            sequence_number, ..
        } = self
        {
            let required = policy.has_sequence_numbers();
            if sequence_number.is_some() != required {
                return Err(MessageError::SequenceNumber { required });
            }
        }
        Ok(())
    }
}

/// Recipients bound to one message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestinationValue {
    /// Explicit candidates
    Candidate {
        /// Recipients
        candidates: Vec<Candidate>,
    },
    /// Explicit members
    Member {
        /// Recipients
        members: Vec<MemberId>,
    },
    /// Whole community
    Community,
    /// Subjective-set members
    Subjective,
}

impl DestinationValue {
    /// Kind of the policy this value belongs to.
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Candidate { .. } => PolicyKind::CandidateDestination,
            Self::Member { .. } => PolicyKind::MemberDestination,
            Self::Community => PolicyKind::CommunityDestination,
            Self::Subjective => PolicyKind::SubjectiveDestination,
        }
    }

    fn check(&self, policy: &Destination) -> Result<(), MessageError> {
        expect_kind(PolicyAxis::Destination, policy.kind(), self.kind())
    }
}

fn expect_kind(axis: PolicyAxis, expected: PolicyKind, found: PolicyKind) -> Result<(), MessageError> {
    if expected == found {
        Ok(())
    } else {
        Err(MessageError::PolicyMismatch {
            axis,
            expected,
            found,
        })
    }
}

/// One value per policy axis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyValues {
    /// Signers and signatures
    pub authentication: AuthenticationValue,
    /// Resolution in force
    pub resolution: ResolutionValue,
    /// Distribution data
    pub distribution: DistributionValue,
    /// Recipients
    pub destination: DestinationValue,
}

impl PolicyValues {
    /// Bundle four values.
    pub fn new(
        authentication: AuthenticationValue,
        resolution: ResolutionValue,
        distribution: DistributionValue,
        destination: DestinationValue,
    ) -> Self {
        Self {
            authentication,
            resolution,
            distribution,
            destination,
        }
    }

    /// Check every value against the definition's policies, axis by axis.
    pub fn check(&self, policies: &PolicySet) -> Result<(), MessageError> {
        self.authentication.check(&policies.authentication)?;
        self.resolution.check(&policies.resolution)?;
        self.distribution.check(&policies.distribution)?;
        self.destination.check(&policies.destination)
    }
}
