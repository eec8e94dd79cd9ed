#![deny(missing_docs)]

//! Kinetic schemes for cross-bridge cycling: states, transitions, rate laws
//! and their serialized form.

/// Canonical hashing of schemes.
pub mod hash;
/// Rate laws and their evaluation context.
pub mod rate;
pub mod scheme;
/// JSON documents for schemes.
pub mod serde;
/// Cross-bridge states.
pub mod state;
/// Rate tables over distortion grids.
pub mod table;
/// Transitions and their derived kinds.
pub mod transition;

pub use hash::canonical_scheme_hash;
pub use rate::{RateContext, RateLaw, THERMAL_ENERGY};
pub use scheme::{KineticScheme, SchemeParams};
pub use serde::{from_json, to_json, SchemeDocument, StateDocument, TransitionDocument};
pub use state::{State, StateKind};
pub use table::{rate_table, RateColumn, RateTable};
pub use transition::{Transition, TransitionKind, TransitionSpec};

/// Builds the three-state cycle used throughout the tests and demos:
/// detached, weakly bound pre-stroke and strongly bound post-stroke.
pub fn three_state_scheme() -> Result<KineticScheme, myo_core::MyoError> {
    let states = vec![
        State::new(0, "D", StateKind::Detached),
        State::new(1, "A1", StateKind::Attached),
        State::new(2, "A2", StateKind::Attached).with_extension(5.0),
    ];
    let transitions = vec![
        TransitionSpec::new(
            0,
            1,
            RateLaw::DistanceDependent {
                k0: 400.0,
                stiffness: 2.0,
            },
        ),
        TransitionSpec::new(1, 0, RateLaw::Constant { rate: 80.0 }),
        TransitionSpec::new(
            1,
            2,
            RateLaw::StrainExponential {
                k0: 200.0,
                sign: -1.0,
                strain_constant: 4.0,
            },
        ),
        TransitionSpec::new(
            2,
            0,
            RateLaw::Polynomial {
                k0: 20.0,
                k1: 2.0,
                power: 2,
                x_center: Some(0.0),
            },
        ),
    ];
    KineticScheme::new(states, transitions, SchemeParams::default())
}
