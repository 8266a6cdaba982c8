//! Message policy axes
//!
//! A message type chooses exactly one policy on each of four independent
//! axes. The chosen policies decide who may sign a message, whether a granted
//! permission is required to author it, how it is persisted and retransmitted,
//! and who receives it.
//!
//! The axes are plain sum types. Whether a particular combination may
//! co-occur is decided by [`validate`], which every message definition runs
//! once at construction.

mod compatibility;

pub use compatibility::{tolerated, validate, ConflictRule, PolicyConflict, PolicyViolation};

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many signatures a message carries and who may have produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Authentication {
    /// Unsigned; anyone may have produced the message
    None,
    /// Signed by exactly one member
    SingleMember,
    /// Signed by a fixed number of members
    MultiMember {
        /// Number of signers every message of this type carries
        count: u8,
    },
}

/// Whether authoring a message also requires a granted permission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// No permission required
    Public,
    /// A permission granted through the permission chain is required
    Linear,
    /// The required permission can itself change at runtime
    Dynamic,
}

/// Whether the message is persisted, retransmitted and ordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Distribution {
    /// Forwarded once, never stored
    Relay,
    /// Sent directly to its destination, never stored
    Direct,
    /// Stored and synchronized in full
    FullSync {
        /// Enforce a strict per-sender sequence number
        sequence_numbers: bool,
    },
    /// Stored and synchronized, keeping only the most recent messages per sender
    LastSync {
        /// Number of messages retained per sender
        history_size: u16,
    },
}

/// Fan-out set of recipients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    /// Explicitly listed candidates
    Candidate,
    /// Explicitly listed members
    Member,
    /// Every member of the community
    Community,
    /// Members whose subjective set for `cluster` includes the author
    Subjective {
        /// Subjective set cluster the recipients are drawn from
        cluster: u8,
    },
}

/// The four policy axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PolicyAxis {
    /// Signature requirements
    Authentication,
    /// Permission requirements
    Resolution,
    /// Persistence and propagation
    Distribution,
    /// Recipient set
    Destination,
}

impl fmt::Display for PolicyAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authentication => "authentication",
            Self::Resolution => "resolution",
            Self::Distribution => "distribution",
            Self::Destination => "destination",
        };
        f.write_str(name)
    }
}

/// Parameter-free discriminant of a policy on any axis.
///
/// Compatibility is decided per kind; parameters such as the signer count
/// or history size never make a combination legal or illegal, with the one
/// exception of FullSync sequence numbers (see [`validate`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum PolicyKind {
    NoAuthentication,
    MemberAuthentication,
    MultiMemberAuthentication,
    PublicResolution,
    LinearResolution,
    DynamicResolution,
    RelayDistribution,
    DirectDistribution,
    FullSyncDistribution,
    LastSyncDistribution,
    CandidateDestination,
    MemberDestination,
    CommunityDestination,
    SubjectiveDestination,
}

impl PolicyKind {
    /// Every kind, grouped by axis.
    pub const ALL: [PolicyKind; 14] = [
        Self::NoAuthentication,
        Self::MemberAuthentication,
        Self::MultiMemberAuthentication,
        Self::PublicResolution,
        Self::LinearResolution,
        Self::DynamicResolution,
        Self::RelayDistribution,
        Self::DirectDistribution,
        Self::FullSyncDistribution,
        Self::LastSyncDistribution,
        Self::CandidateDestination,
        Self::MemberDestination,
        Self::CommunityDestination,
        Self::SubjectiveDestination,
    ];

    /// Axis this kind belongs to.
    pub fn axis(self) -> PolicyAxis {
        match self {
            Self::NoAuthentication | Self::MemberAuthentication | Self::MultiMemberAuthentication => {
                PolicyAxis::Authentication
            }
            Self::PublicResolution | Self::LinearResolution | Self::DynamicResolution => {
                PolicyAxis::Resolution
            }
            Self::RelayDistribution
            | Self::DirectDistribution
            | Self::FullSyncDistribution
            | Self::LastSyncDistribution => PolicyAxis::Distribution,
            Self::CandidateDestination
            | Self::MemberDestination
            | Self::CommunityDestination
            | Self::SubjectiveDestination => PolicyAxis::Destination,
        }
    }

    /// Kinds on a single axis.
    pub fn on_axis(axis: PolicyAxis) -> impl Iterator<Item = PolicyKind> {
        Self::ALL.into_iter().filter(move |kind| kind.axis() == axis)
    }

    /// Stable display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::NoAuthentication => "NoAuthentication",
            Self::MemberAuthentication => "MemberAuthentication",
            Self::MultiMemberAuthentication => "MultiMemberAuthentication",
            Self::PublicResolution => "PublicResolution",
            Self::LinearResolution => "LinearResolution",
            Self::DynamicResolution => "DynamicResolution",
            Self::RelayDistribution => "RelayDistribution",
            Self::DirectDistribution => "DirectDistribution",
            Self::FullSyncDistribution => "FullSyncDistribution",
            Self::LastSyncDistribution => "LastSyncDistribution",
            Self::CandidateDestination => "CandidateDestination",
            Self::MemberDestination => "MemberDestination",
            Self::CommunityDestination => "CommunityDestination",
            Self::SubjectiveDestination => "SubjectiveDestination",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Authentication {
    /// Kind of this policy.
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::None => PolicyKind::NoAuthentication,
            Self::SingleMember => PolicyKind::MemberAuthentication,
            Self::MultiMember { .. } => PolicyKind::MultiMemberAuthentication,
        }
    }

    /// Number of signatures a message of this type carries.
    pub fn signature_count(&self) -> usize {
        match self {
            Self::None => 0,
            Self::SingleMember => 1,
            Self::MultiMember { count } => usize::from(*count),
        }
    }
}

impl Resolution {
    /// Kind of this policy.
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Public => PolicyKind::PublicResolution,
            Self::Linear => PolicyKind::LinearResolution,
            Self::Dynamic => PolicyKind::DynamicResolution,
        }
    }
}

impl Distribution {
    /// Kind of this policy.
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Relay => PolicyKind::RelayDistribution,
            Self::Direct => PolicyKind::DirectDistribution,
            Self::FullSync { .. } => PolicyKind::FullSyncDistribution,
            Self::LastSync { .. } => PolicyKind::LastSyncDistribution,
        }
    }

    /// Whether messages of this type are stored and synchronized.
    pub fn is_synchronized(&self) -> bool {
        matches!(self, Self::FullSync { .. } | Self::LastSync { .. })
    }

    /// Whether messages of this type carry a per-sender sequence number.
    pub fn has_sequence_numbers(&self) -> bool {
        matches!(
            self,
            Self::FullSync {
                sequence_numbers: true
            }
        )
    }
}

impl Destination {
    /// Kind of this policy.
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Candidate => PolicyKind::CandidateDestination,
            Self::Member => PolicyKind::MemberDestination,
            Self::Community => PolicyKind::CommunityDestination,
            Self::Subjective { .. } => PolicyKind::SubjectiveDestination,
        }
    }
}

/// One policy per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicySet {
    /// Signature requirements
    pub authentication: Authentication,
    /// Permission requirements
    pub resolution: Resolution,
    /// Persistence and propagation
    pub distribution: Distribution,
    /// Recipient set
    pub destination: Destination,
}

impl PolicySet {
    /// Bundle four policies without validating them.
    pub fn new(
        authentication: Authentication,
        resolution: Resolution,
        distribution: Distribution,
        destination: Destination,
    ) -> Self {
        Self {
            authentication,
            resolution,
            distribution,
            destination,
        }
    }

    /// Kinds in axis order.
    pub fn kinds(&self) -> [PolicyKind; 4] {
        [
            self.authentication.kind(),
            self.resolution.kind(),
            self.distribution.kind(),
            self.destination.kind(),
        ]
    }

    /// Kind chosen on `axis`.
    pub fn kind_on(&self, axis: PolicyAxis) -> PolicyKind {
        match axis {
            PolicyAxis::Authentication => self.authentication.kind(),
            PolicyAxis::Resolution => self.resolution.kind(),
            PolicyAxis::Distribution => self.distribution.kind(),
            PolicyAxis::Destination => self.destination.kind(),
        }
    }

    /// Check that the four policies may legally co-occur.
    pub fn validate(&self) -> Result<(), PolicyViolation> {
        validate(
            self.authentication,
            self.resolution,
            self.distribution,
            self.destination,
        )
    }
}

impl fmt::Display for PolicySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, r, di, de] = self.kinds();
        write!(f, "{a}/{r}/{di}/{de}")
    }
}
