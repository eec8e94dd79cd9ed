mod common;

use std::sync::Arc;

use myo_core::StateId;
use myo_hs::{BoundaryCondition, HalfSarcomere, Isotypes, SchemeSource};
use myo_kinetics::{KineticScheme, SchemeParams, State, StateKind};

fn parked_scheme() -> Arc<KineticScheme> {
    Arc::new(
        KineticScheme::new(
            vec![
                State::new(0, "SRX", StateKind::SuperRelaxed),
                State::new(1, "D", StateKind::Detached),
            ],
            Vec::new(),
            SchemeParams {
                initial_state: StateId::from_raw(1),
                ..SchemeParams::default()
            },
        )
        .unwrap(),
    )
}

#[test]
fn proportions_must_match_schemes() {
    let scheme = common::two_state_scheme(1.0, 1.0);
    let err = Isotypes::new(vec![Arc::clone(&scheme)], vec![0.5, 0.5]).unwrap_err();
    assert_eq!(err.info().code, "invalid-isotypes");

    let err = Isotypes::new(
        vec![Arc::clone(&scheme), parked_scheme()],
        vec![1.0, -0.5],
    )
    .unwrap_err();
    assert_eq!(err.info().code, "invalid-isotypes");
    assert_eq!(err.info().context.get("isotype").map(String::as_str), Some("1"));

    let err = Isotypes::new(vec![scheme, parked_scheme()], vec![0.0, 0.0]).unwrap_err();
    assert_eq!(err.info().code, "invalid-isotypes");
}

#[test]
fn assignment_follows_proportions_and_seed() {
    let isotypes = Isotypes::new(
        vec![common::two_state_scheme(1.0, 1.0), parked_scheme()],
        vec![3.0, 1.0],
    )
    .unwrap();
    assert_eq!(isotypes.proportions(), &[0.75, 0.25]);

    let first = isotypes.assign(4000, 42);
    let again = isotypes.assign(4000, 42);
    let other = isotypes.assign(4000, 43);
    assert_eq!(first.isotypes(), again.isotypes());
    assert_ne!(first.isotypes(), other.isotypes());

    let counts = first.counts();
    assert_eq!(counts.iter().sum::<usize>(), 4000);
    assert!((counts[1] as f64 / 4000.0 - 0.25).abs() < 0.03, "{counts:?}");

    let only_first = Isotypes::new(
        vec![common::two_state_scheme(1.0, 1.0), parked_scheme()],
        vec![1.0, 0.0],
    )
    .unwrap()
    .assign(500, 7);
    assert_eq!(only_first.counts(), vec![500, 0]);
}

#[test]
fn units_start_in_their_own_initial_state() {
    let isotypes = Isotypes::new(
        vec![common::two_state_scheme(1.0, 1.0), parked_scheme()],
        vec![0.5, 0.5],
    )
    .unwrap();
    let hs = HalfSarcomere::new(isotypes, common::small_geometry(), common::options(19)).unwrap();
    let assignment = hs.isotypes();
    for (unit, entry) in hs.lattice().units().iter().enumerate() {
        let expected = assignment.scheme_for(unit).initial_state();
        assert_eq!(entry.state, expected);
        let raw = if assignment.isotype_of(unit) == 0 { 0 } else { 1 };
        assert_eq!(entry.state.as_raw(), raw);
    }
    let total: f64 = hs.last_snapshot().populations.iter().sum();
    assert!((total - 1.0).abs() < 1e-12);
}

#[test]
fn each_unit_follows_its_isotype_kinetics() {
    let isotypes = Isotypes::new(
        vec![common::two_state_scheme(400.0, 40.0), parked_scheme()],
        vec![0.5, 0.5],
    )
    .unwrap();
    let mut hs = HalfSarcomere::new(isotypes, common::small_geometry(), common::options(23)).unwrap();
    let parked: Vec<usize> = (0..hs.lattice().units().len())
        .filter(|&unit| hs.isotypes().isotype_of(unit) == 1)
        .collect();
    assert!(!parked.is_empty());
    assert!(parked.len() < hs.lattice().units().len());

    let mut attached_seen = false;
    for _ in 0..50 {
        let snapshot = hs.advance(&BoundaryCondition::hold(), 1e-3).unwrap();
        for &unit in &parked {
            let decision = hs.last_report().decisions[unit];
            assert_eq!(decision.propensity, 0.0);
            assert_eq!(snapshot.unit_states[unit], StateId::from_raw(1));
            assert_eq!(hs.lattice().units()[unit].bound_site, None);
        }
        attached_seen |= snapshot.attached_fraction() > 0.0;
        hs.lattice().check_consistency().unwrap();
    }
    assert!(attached_seen);
}
