use myo_core::{SiteIndex, StateId, UnitIndex};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A myosin head riding on one thick-filament node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossbridgeUnit {
    /// Current kinetic state.
    pub state: StateId,
    /// Signed bridge distortion (nm); positive values pull the thin filament toward the M-line.
    pub distortion: f64,
    /// Thick filament carrying this unit.
    pub thick: usize,
    /// Node index along the thick filament, counted from the M-line.
    pub node: usize,
    /// Bound site, if attached.
    pub bound_site: Option<SiteIndex>,
}

/// Thick filament view: its units in the flat arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThickFilament {
    /// Filament index.
    pub index: usize,
    /// Units (one per node), ordered from the M-line outward.
    pub units: Range<UnitIndex>,
    /// Thin filaments this filament can bind to.
    pub faced_thin: Vec<usize>,
}
