mod common;

use myo_core::derive_substream_seed;
use myo_muscle::{Muscle, MuscleBoundary, MuscleConfig, MuscleControl, SeriesElement};

#[test]
fn members_run_on_derived_seeds() {
    let scheme = common::two_state_scheme(100.0, 10.0);
    let muscle = common::muscle(scheme, common::options(77, true), 3, None);
    for (index, member) in muscle.half_sarcomeres().iter().enumerate() {
        assert_eq!(
            member.options().run.seed,
            derive_substream_seed(77, index as u64)
        );
    }
}

fn run(parallel: bool) -> Vec<(f64, f64, Vec<u32>)> {
    let scheme = common::two_state_scheme(400.0, 60.0);
    let mut options = common::options(21, true);
    options.run.parallel = parallel;
    let mut muscle = common::muscle(scheme, options, 2, Some(5.0));
    let bc = MuscleBoundary {
        control: MuscleControl::LengthChange { delta: 0.0 },
        p_ca: Some(5.5),
    };
    (0..40)
        .map(|_| {
            let snapshot = muscle.advance(&bc, 1e-3).unwrap();
            let states = snapshot
                .half_sarcomeres
                .iter()
                .flat_map(|s| s.unit_states.iter().map(|id| id.as_raw()))
                .collect();
            (snapshot.length, snapshot.tension, states)
        })
        .collect()
}

#[test]
fn runs_are_reproducible() {
    assert_eq!(run(false), run(false));
}

#[test]
fn parallel_members_match_sequential_members() {
    assert_eq!(run(false), run(true));
}

#[test]
fn config_rejects_empty_and_bad_series() {
    let scheme = common::two_state_scheme(1.0, 1.0);
    let empty = MuscleConfig {
        half_sarcomeres: 0,
        series: None,
    };
    let err = Muscle::new(scheme.clone(), common::geometry(), common::options(1, false), &empty)
        .unwrap_err();
    assert_eq!(err.info().code, "empty-muscle");

    let bad = MuscleConfig {
        half_sarcomeres: 2,
        series: Some(SeriesElement { stiffness: 0.0 }),
    };
    let err = Muscle::new(scheme, common::geometry(), common::options(1, false), &bad)
        .unwrap_err();
    assert_eq!(err.info().code, "invalid-series-element");
}

#[test]
fn muscle_config_defaults_to_one_member() {
    let config: MuscleConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.half_sarcomeres, 1);
    assert!(config.series.is_none());
}
