#![deny(missing_docs)]

//! Muscle built from half-sarcomeres in series. Members share one tension
//! and their length changes add up to the imposed length.

pub mod muscle;
/// Series elastic element.
pub mod series;

pub use muscle::{Muscle, MuscleBoundary, MuscleConfig, MuscleControl, MuscleSnapshot};
pub use series::SeriesElement;
