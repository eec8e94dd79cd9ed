#![allow(dead_code)]

use std::sync::Arc;

use myo_hs::{Mechanics, PassiveMode, RunOptions, SimulationOptions, Titin};
use myo_kinetics::{KineticScheme, RateLaw, SchemeParams, State, StateKind, TransitionSpec};
use myo_lattice::{Geometry, Regulation};
use myo_muscle::{Muscle, MuscleConfig, SeriesElement};

pub fn two_state_scheme(k_on: f64, k_off: f64) -> Arc<KineticScheme> {
    Arc::new(
        KineticScheme::new(
            vec![
                State::new(0, "D", StateKind::Detached),
                State::new(1, "A", StateKind::Attached).with_extension(4.0),
            ],
            vec![
                TransitionSpec::new(0, 1, RateLaw::Constant { rate: k_on }),
                TransitionSpec::new(1, 0, RateLaw::Constant { rate: k_off }),
            ],
            SchemeParams::default(),
        )
        .unwrap(),
    )
}

pub fn geometry() -> Geometry {
    Geometry {
        thick_filaments: 2,
        thin_filaments: 3,
        nodes_per_thick: 6,
        regulatory_units_per_thin: 4,
        sites_per_unit: 3,
        thick_node_spacing: 10.0,
        thin_site_spacing: 5.0,
        bare_zone: 20.0,
        thin_per_thick: 2,
        initial_length: 100.0,
    }
}

pub fn options(seed: u64, titin: bool) -> SimulationOptions {
    SimulationOptions {
        mechanics: Mechanics {
            titin: titin.then_some(Titin {
                stiffness: 0.5,
                slack_length: 60.0,
                passive: PassiveMode::Linear,
                thick_node: 0,
                thin_node: 0,
            }),
            ..Mechanics::default()
        },
        regulation: Regulation {
            initially_active: true,
            ..Regulation::default()
        },
        run: RunOptions {
            seed,
            ..RunOptions::default()
        },
    }
}

pub fn muscle(
    scheme: Arc<KineticScheme>,
    options: SimulationOptions,
    half_sarcomeres: usize,
    series: Option<f64>,
) -> Muscle {
    let config = MuscleConfig {
        half_sarcomeres,
        series: series.map(|stiffness| SeriesElement { stiffness }),
    };
    Muscle::new(scheme, geometry(), options, &config).unwrap()
}
