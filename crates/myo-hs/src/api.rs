use myo_core::MyoError;
use myo_lattice::Geometry;
use thiserror::Error;

use crate::config::SimulationOptions;
use crate::half_sarcomere::{BoundaryCondition, HalfSarcomere};
use crate::isotype::Isotypes;
use crate::snapshot::Snapshot;

/// Opaque run handle returned by [`initialize`].
#[derive(Debug, Clone)]
pub struct Handle {
    half_sarcomere: HalfSarcomere,
}

impl Handle {
    /// Snapshot of the last completed step.
    pub fn snapshot(&self) -> &Snapshot {
        self.half_sarcomere.last_snapshot()
    }

    /// Read access to the underlying half-sarcomere.
    pub fn half_sarcomere(&self) -> &HalfSarcomere {
        &self.half_sarcomere
    }

    /// Releases the underlying half-sarcomere.
    pub fn into_inner(self) -> HalfSarcomere {
        self.half_sarcomere
    }
}

/// A failed step: the error and the last consistent snapshot.
#[derive(Debug, Clone, Error)]
#[error("run aborted: {error}")]
pub struct RunAbort {
    /// Cause of the abort.
    pub error: MyoError,
    /// State after the last successful step.
    pub last_snapshot: Snapshot,
}

/// Validates the configuration and builds a half-sarcomere ready to step.
pub fn initialize(
    schemes: impl Into<Isotypes>,
    geometry: Geometry,
    options: SimulationOptions,
) -> Result<Handle, MyoError> {
    Ok(Handle {
        half_sarcomere: HalfSarcomere::new(schemes, geometry, options)?,
    })
}

/// Runs one step. After an abort every further call fails.
pub fn advance(
    handle: &mut Handle,
    bc: &BoundaryCondition,
    dt: f64,
) -> Result<Snapshot, RunAbort> {
    handle
        .half_sarcomere
        .advance(bc, dt)
        .map_err(|error| RunAbort {
            error,
            last_snapshot: handle.half_sarcomere.last_snapshot().clone(),
        })
}
