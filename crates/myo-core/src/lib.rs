#![deny(missing_docs)]

//! Core identifiers, error taxonomy and deterministic randomness shared by the
//! half-sarcomere simulation crates.

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod provenance;
pub mod rng;

pub use errors::{ErrorInfo, MyoError};
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{counter_uniform, derive_substream_seed};

/// Identifier for a state within a kinetic scheme (scheme-local index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(u32);

impl StateId {
    /// Creates a new identifier from its raw integer representation.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub const fn as_raw(&self) -> u32 {
        self.0
    }

    /// Returns the identifier as a vector index.
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Index of a binding site in the flat site arena of a half-sarcomere.
pub type SiteIndex = usize;

/// Index of a cross-bridge unit in the flat unit arena of a half-sarcomere.
pub type UnitIndex = usize;
