//! Exhaustive and property checks for the policy compatibility matrix

use murmur_core::policy::{tolerated, ConflictRule};
use murmur_core::{
    validate, Authentication, Destination, Distribution, PolicyAxis, PolicyKind, PolicySet,
    Resolution,
};
use proptest::prelude::*;

fn authentications() -> Vec<Authentication> {
    vec![
        Authentication::None,
        Authentication::SingleMember,
        Authentication::MultiMember { count: 2 },
    ]
}

fn resolutions() -> Vec<Resolution> {
    vec![Resolution::Public, Resolution::Linear, Resolution::Dynamic]
}

fn distributions() -> Vec<Distribution> {
    vec![
        Distribution::Relay,
        Distribution::Direct,
        Distribution::FullSync {
            sequence_numbers: false,
        },
        Distribution::FullSync {
            sequence_numbers: true,
        },
        Distribution::LastSync { history_size: 1 },
    ]
}

fn destinations() -> Vec<Destination> {
    vec![
        Destination::Candidate,
        Destination::Member,
        Destination::Community,
        Destination::Subjective { cluster: 1 },
    ]
}

/// Legality written out as plain rules, independent of the matrix tables.
fn legal(a: Authentication, r: Resolution, di: Distribution, de: Destination) -> bool {
    let signed = !matches!(a, Authentication::None);
    let synced = di.is_synchronized();

    if !signed && r != Resolution::Public {
        return false;
    }
    if !signed && synced {
        return false;
    }
    if !signed && matches!(de, Destination::Subjective { .. }) {
        return false;
    }
    let dest_ok = match di {
        Distribution::Relay => matches!(de, Destination::Candidate | Destination::Member),
        Distribution::Direct => !matches!(de, Destination::Subjective { .. }),
        Distribution::FullSync { .. } | Distribution::LastSync { .. } => {
            matches!(de, Destination::Community | Destination::Subjective { .. })
        }
    };
    if !dest_ok {
        return false;
    }
    if di.has_sequence_numbers() && matches!(a, Authentication::MultiMember { .. }) {
        return false;
    }
    true
}

#[test]
fn validate_matches_matrix_for_every_combination() {
    let mut legal_count = 0;
    for a in authentications() {
        for r in resolutions() {
            for di in distributions() {
                for de in destinations() {
                    let expected = legal(a, r, di, de);
                    let result = validate(a, r, di, de);
                    assert_eq!(
                        result.is_ok(),
                        expected,
                        "{} -> {result:?}",
                        PolicySet::new(a, r, di, de)
                    );
                    if expected {
                        legal_count += 1;
                    }
                }
            }
        }
    }
    // 2 signed auths x 3 res x (Relay:2 + Direct:3 + FullSync:2 + FullSyncSeq:2 + LastSync:2)
    // minus MultiMember+FullSyncSeq (3 res x 2 dest), plus None: Public x (Relay:2 + Direct:3)
    assert_eq!(legal_count, 2 * 3 * 11 - 6 + 5);
}

#[test]
fn every_conflict_offers_an_alternative_on_the_violated_axis() {
    for a in authentications() {
        for r in resolutions() {
            for di in distributions() {
                for de in destinations() {
                    if let Err(violation) = validate(a, r, di, de) {
                        assert!(!violation.conflicts.is_empty());
                        for conflict in &violation.conflicts {
                            assert!(!conflict.allowed.is_empty());
                            assert!(!conflict.allowed.contains(&conflict.rejected));
                            assert!(conflict
                                .allowed
                                .iter()
                                .all(|k| k.axis() == conflict.rejected.axis()));
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn table_is_consistent_with_declared_axes() {
    for kind in PolicyKind::ALL {
        for axis in [
            PolicyAxis::Authentication,
            PolicyAxis::Resolution,
            PolicyAxis::Distribution,
            PolicyAxis::Destination,
        ] {
            let allowed = tolerated(kind, axis);
            assert!(!allowed.is_empty(), "{kind} tolerates nothing on {axis}");
            assert!(allowed.iter().all(|k| k.axis() == axis));
        }
    }
}

#[test]
fn concrete_vote_scenarios() {
    assert!(validate(
        Authentication::SingleMember,
        Resolution::Linear,
        Distribution::LastSync { history_size: 1 },
        Destination::Community,
    )
    .is_ok());

    let violation = validate(
        Authentication::None,
        Resolution::Linear,
        Distribution::LastSync { history_size: 1 },
        Destination::Community,
    )
    .unwrap_err();
    assert!(violation
        .to_string()
        .contains("NoAuthentication does not support LinearResolution"));
}

fn arb_authentication() -> impl Strategy<Value = Authentication> {
    prop_oneof![
        Just(Authentication::None),
        Just(Authentication::SingleMember),
        (1u8..=8).prop_map(|count| Authentication::MultiMember { count }),
    ]
}

fn arb_resolution() -> impl Strategy<Value = Resolution> {
    prop_oneof![
        Just(Resolution::Public),
        Just(Resolution::Linear),
        Just(Resolution::Dynamic),
    ]
}

fn arb_distribution() -> impl Strategy<Value = Distribution> {
    prop_oneof![
        Just(Distribution::Relay),
        Just(Distribution::Direct),
        any::<bool>().prop_map(|sequence_numbers| Distribution::FullSync { sequence_numbers }),
        any::<u16>().prop_map(|history_size| Distribution::LastSync { history_size }),
    ]
}

fn arb_destination() -> impl Strategy<Value = Destination> {
    prop_oneof![
        Just(Destination::Candidate),
        Just(Destination::Member),
        Just(Destination::Community),
        any::<u8>().prop_map(|cluster| Destination::Subjective { cluster }),
    ]
}

proptest! {
    /// Parameters never change legality, except the sequence number flag
    #[test]
    fn parameters_do_not_affect_matrix_checks(
        a in arb_authentication(),
        r in arb_resolution(),
        di in arb_distribution(),
        de in arb_destination(),
    ) {
        let result = validate(a, r, di, de);
        prop_assert_eq!(result.is_ok(), legal(a, r, di, de));

        if let Err(violation) = result {
            let sequence_conflict = violation
                .conflicts
                .iter()
                .any(|c| c.rule == ConflictRule::SequenceNumbers);
            prop_assert_eq!(
                sequence_conflict,
                di.has_sequence_numbers() && matches!(a, Authentication::MultiMember { .. })
            );
        }
    }

    /// Every one-directional failure is mirrored or explained by the partner side
    #[test]
    fn conflicts_reference_chosen_kinds(
        a in arb_authentication(),
        r in arb_resolution(),
        di in arb_distribution(),
        de in arb_destination(),
    ) {
        let set = PolicySet::new(a, r, di, de);
        if let Err(violation) = set.validate() {
            let kinds = set.kinds();
            for conflict in violation.conflicts {
                prop_assert!(kinds.contains(&conflict.declared_by));
                prop_assert!(kinds.contains(&conflict.rejected));
            }
        }
    }
}
