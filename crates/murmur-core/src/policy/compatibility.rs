//! Policy compatibility matrix
//!
//! Each policy kind declares, for every other axis, which kinds it tolerates.
//! A combination is legal only if every one of the twelve one-directional
//! checks passes. All failing checks are collected so the caller sees every
//! conflict at once.

use super::{Authentication, Destination, Distribution, PolicyAxis, PolicyKind, Resolution};
use serde::{Deserialize, Serialize};
use std::fmt;

use PolicyKind::*;

const ANY_AUTHENTICATION: &[PolicyKind] = &[
    NoAuthentication,
    MemberAuthentication,
    MultiMemberAuthentication,
];
const SIGNED: &[PolicyKind] = &[MemberAuthentication, MultiMemberAuthentication];
const ANY_RESOLUTION: &[PolicyKind] = &[PublicResolution, LinearResolution, DynamicResolution];
const ANY_DISTRIBUTION: &[PolicyKind] = &[
    RelayDistribution,
    DirectDistribution,
    FullSyncDistribution,
    LastSyncDistribution,
];
const UNSTORED: &[PolicyKind] = &[RelayDistribution, DirectDistribution];
const SYNCHRONIZED: &[PolicyKind] = &[FullSyncDistribution, LastSyncDistribution];
const ANY_DESTINATION: &[PolicyKind] = &[
    CandidateDestination,
    MemberDestination,
    CommunityDestination,
    SubjectiveDestination,
];
const ADDRESSED: &[PolicyKind] = &[CandidateDestination, MemberDestination];
const BROADCAST: &[PolicyKind] = &[CommunityDestination, SubjectiveDestination];

fn any(axis: PolicyAxis) -> &'static [PolicyKind] {
    match axis {
        PolicyAxis::Authentication => ANY_AUTHENTICATION,
        PolicyAxis::Resolution => ANY_RESOLUTION,
        PolicyAxis::Distribution => ANY_DISTRIBUTION,
        PolicyAxis::Destination => ANY_DESTINATION,
    }
}

/// Kinds on `partner` axis that `kind` tolerates.
///
/// Asking a kind about its own axis returns every kind on that axis.
pub fn tolerated(kind: PolicyKind, partner: PolicyAxis) -> &'static [PolicyKind] {
    use PolicyAxis::{Authentication as A, Destination as De, Distribution as Di, Resolution as R};

    match (kind, partner) {
        (NoAuthentication, R) => &[PublicResolution],
        (NoAuthentication, Di) => UNSTORED,
        (NoAuthentication, De) => &[CandidateDestination, MemberDestination, CommunityDestination],

        (LinearResolution, A) => SIGNED,

        (RelayDistribution, De) => ADDRESSED,
        (DirectDistribution, De) => &[CandidateDestination, MemberDestination, CommunityDestination],
        (FullSyncDistribution | LastSyncDistribution, A) => SIGNED,
        (FullSyncDistribution | LastSyncDistribution, De) => BROADCAST,

        (CandidateDestination | MemberDestination, Di) => UNSTORED,
        (CommunityDestination, Di) => &[DirectDistribution, FullSyncDistribution, LastSyncDistribution],
        (SubjectiveDestination, A) => SIGNED,
        (SubjectiveDestination, Di) => SYNCHRONIZED,

        (_, axis) => any(axis),
    }
}

/// Which rule a conflict breaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictRule {
    /// A matrix entry does not list the rejected kind
    Matrix,
    /// Sequence numbers need exactly one signer per message
    SequenceNumbers,
}

/// One failed one-directional check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConflict {
    /// Kind whose constraint failed
    pub declared_by: PolicyKind,
    /// Kind on the partner axis that was rejected
    pub rejected: PolicyKind,
    /// Legal alternatives for the rejected kind
    pub allowed: Vec<PolicyKind>,
    /// Rule that failed
    pub rule: ConflictRule,
}

impl PolicyConflict {
    /// Axis pair `(declaring, rejected)` this conflict concerns.
    pub fn axes(&self) -> (PolicyAxis, PolicyAxis) {
        (self.declared_by.axis(), self.rejected.axis())
    }
}

impl fmt::Display for PolicyConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let allowed = self
            .allowed
            .iter()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(", ");
        match self.rule {
            ConflictRule::Matrix => write!(
                f,
                "{} does not support {}. Allowed options are: {allowed}",
                self.declared_by, self.rejected
            ),
            ConflictRule::SequenceNumbers => write!(
                f,
                "{} may not be used with {} when sequence numbers are enabled. Allowed options are: {allowed}",
                self.declared_by, self.rejected
            ),
        }
    }
}

/// Illegal policy combination, listing every conflict found.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyViolation {
    /// Every failed check, in axis order of the declaring kind
    pub conflicts: Vec<PolicyConflict>,
}

impl PolicyViolation {
    /// Distinct axes on which a rejected kind sits.
    pub fn violated_axes(&self) -> Vec<PolicyAxis> {
        let mut axes: Vec<_> = self.conflicts.iter().map(|c| c.rejected.axis()).collect();
        axes.sort();
        axes.dedup();
        axes
    }

    /// Whether `kind` was rejected by any check.
    pub fn rejects(&self, kind: PolicyKind) -> bool {
        self.conflicts.iter().any(|c| c.rejected == kind)
    }
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .conflicts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&rendered)
    }
}

impl std::error::Error for PolicyViolation {}

/// Check that one policy from each axis may legally co-occur.
pub fn validate(
    authentication: Authentication,
    resolution: Resolution,
    distribution: Distribution,
    destination: Destination,
) -> Result<(), PolicyViolation> {
    let kinds = [
        authentication.kind(),
        resolution.kind(),
        distribution.kind(),
        destination.kind(),
    ];

    let mut conflicts = Vec::new();
    for declared_by in kinds {
        for partner in kinds {
            if partner.axis() == declared_by.axis() {
                continue;
            }
            let allowed = tolerated(declared_by, partner.axis());
            if !allowed.contains(&partner) {
                conflicts.push(PolicyConflict {
                    declared_by,
                    rejected: partner,
                    allowed: allowed.to_vec(),
                    rule: ConflictRule::Matrix,
                });
            }
        }
    }

    if distribution.has_sequence_numbers()
        && matches!(authentication, Authentication::MultiMember { .. })
    {
        conflicts.push(PolicyConflict {
            declared_by: distribution.kind(),
            rejected: authentication.kind(),
            allowed: vec![MemberAuthentication],
            rule: ConflictRule::SequenceNumbers,
        });
    }

    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(PolicyViolation { conflicts })
    }
}
