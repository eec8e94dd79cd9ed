mod common;

use myo_core::rng::STREAM_KINETICS;
use myo_core::{counter_uniform, MyoError, StateId};
use myo_hs::{Outcome, StochasticTransitionEngine};
use myo_kinetics::{KineticScheme, SchemeParams, State, StateKind};
use myo_lattice::{BindingSiteLattice, Geometry, DEFAULT_TIE_BREAK};

fn single_unit_lattice() -> BindingSiteLattice {
    single_unit_lattice_in(StateId::from_raw(0))
}

fn single_unit_lattice_in(state: StateId) -> BindingSiteLattice {
    let geometry = Geometry {
        thick_filaments: 1,
        thin_filaments: 1,
        nodes_per_thick: 1,
        regulatory_units_per_thin: 1,
        sites_per_unit: 1,
        thick_node_spacing: 10.0,
        thin_site_spacing: 5.0,
        bare_zone: 20.0,
        thin_per_thick: 1,
        initial_length: 25.0,
    };
    BindingSiteLattice::new(geometry, state, true).unwrap()
}

fn engine(seed: u64) -> StochasticTransitionEngine {
    StochasticTransitionEngine {
        seed,
        capture_radius: 10.0,
        tie_break: DEFAULT_TIE_BREAK,
        parallel: false,
    }
}

#[test]
fn firing_threshold_uses_exact_exponential_form() {
    let scheme = common::two_state_scheme(10.0, 5.0);
    let mut lattice = single_unit_lattice();
    let engine = engine(2024);
    let dt = 1e-4;
    let detached_threshold = 1.0 - (-10.0f64 * 1e-4).exp();
    let attached_threshold = 1.0 - (-5.0f64 * 1e-4).exp();
    assert!((detached_threshold - 9.995001666e-4).abs() < 1e-12);

    let mut fired = 0;
    let mut stayed = 0;
    for step in 0..20_000u64 {
        let report = engine.step(&scheme, &mut lattice, &[0.0], dt, step).unwrap();
        let decision = report.decisions[0];
        let expected = if decision.state == StateId::from_raw(0) {
            detached_threshold
        } else {
            attached_threshold
        };
        assert_eq!(decision.threshold, expected);
        assert_eq!(decision.draw, counter_uniform(2024, STREAM_KINETICS, step, 0));
        let gated = decision.draw < decision.threshold;
        match decision.outcome {
            Outcome::Stay => {
                assert!(!gated);
                stayed += 1;
            }
            Outcome::Fired { .. } | Outcome::Vetoed { .. } => {
                assert!(gated);
                fired += 1;
            }
        }
        lattice.check_consistency().unwrap();
    }
    assert!(fired > 0);
    assert!(stayed > fired);
}

#[test]
fn attach_records_occupancy_and_detach_resets_distortion() {
    let scheme = common::two_state_scheme(1e6, 1e6);
    let mut lattice = single_unit_lattice();
    let engine = engine(1);

    let report = engine.step(&scheme, &mut lattice, &[0.0], 1e-3, 0).unwrap();
    assert_eq!(report.attached, 1);
    assert_eq!(lattice.units()[0].bound_site, Some(0));
    assert_eq!(lattice.sites()[0].occupant, Some(0));
    // Node at 5 nm faces the site at 5 nm; distortion is the state's extension.
    assert_eq!(lattice.units()[0].distortion, 4.0);

    let report = engine.step(&scheme, &mut lattice, &[0.0], 1e-3, 1).unwrap();
    assert_eq!(report.detached, 1);
    assert_eq!(lattice.units()[0].bound_site, None);
    assert_eq!(lattice.sites()[0].occupant, None);
    assert_eq!(lattice.units()[0].distortion, scheme.reset_distortion());
}

#[test]
fn detach_without_bound_site_is_a_consistency_error() {
    let scheme = common::two_state_scheme(0.0, 1e6);
    let mut lattice = single_unit_lattice_in(StateId::from_raw(1));
    let err = engine(3)
        .step(&scheme, &mut lattice, &[0.0], 1e-3, 0)
        .unwrap_err();
    assert!(matches!(err, MyoError::Consistency(_)));
    assert_eq!(err.info().code, "detach-without-site");
    assert_eq!(err.info().context.get("unit").map(String::as_str), Some("0"));
}

#[test]
fn state_without_transitions_never_fires() {
    let scheme = KineticScheme::new(
        vec![State::new(0, "SRX", StateKind::SuperRelaxed)],
        Vec::new(),
        SchemeParams::default(),
    )
    .unwrap();
    let mut lattice = single_unit_lattice();
    let engine = engine(9);
    for step in 0..100 {
        let report = engine.step(&scheme, &mut lattice, &[0.0], 1.0, step).unwrap();
        let decision = report.decisions[0];
        assert_eq!(decision.propensity, 0.0);
        assert_eq!(decision.threshold, 0.0);
        assert_eq!(decision.outcome, Outcome::Stay);
    }
}

#[test]
fn parallel_planning_matches_sequential() {
    let scheme = common::two_state_scheme(300.0, 100.0);
    let mut sequential = BindingSiteLattice::new(
        common::small_geometry(),
        StateId::from_raw(0),
        true,
    )
    .unwrap();
    let mut parallel = sequential.clone();
    let forces = vec![0.0; sequential.units().len()];
    let seq_engine = engine(77);
    let par_engine = StochasticTransitionEngine {
        parallel: true,
        ..seq_engine
    };
    for step in 0..200 {
        let a = seq_engine.step(&scheme, &mut sequential, &forces, 1e-3, step).unwrap();
        let b = par_engine.step(&scheme, &mut parallel, &forces, 1e-3, step).unwrap();
        assert_eq!(a, b);
    }
    assert_eq!(sequential, parallel);
}
