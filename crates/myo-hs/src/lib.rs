#![deny(missing_docs)]

//! Half-sarcomere simulation: stochastic cross-bridge transitions coupled to
//! an iterative mechanical equilibrium solve, stepped through
//! [`initialize`] and [`advance`].

mod api;
pub mod config;
pub mod engine;
pub mod half_sarcomere;
pub mod isotype;
/// Step snapshots.
pub mod snapshot;
pub mod solver;

pub use api::{advance, initialize, Handle, RunAbort};
pub use config::{
    Extracellular, ForceLaw, Mechanics, ModelConfig, PassiveMode, RunOptions, SimulationOptions,
    Titin,
};
pub use engine::{EngineReport, Outcome, StochasticTransitionEngine, UnitDecision};
pub use half_sarcomere::{BoundaryCondition, Control, ForceSolve, HalfSarcomere};
pub use isotype::{IsotypeAssignment, Isotypes, SchemeSource};
pub use snapshot::Snapshot;
pub use solver::{Chain, Coupling, MechanicalSystem, SolveReport, SolveSettings};
