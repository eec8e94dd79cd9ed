use myo_core::{SiteIndex, UnitIndex};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A binding site on a thin filament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingSite {
    /// Current axial position (nm).
    pub position: f64,
    /// Regulatory unit the site belongs to.
    pub regulatory_unit: usize,
    /// Mirrors the activation of the owning regulatory unit.
    pub active: bool,
    /// Cross-bridge currently bound here.
    pub occupant: Option<UnitIndex>,
}

impl BindingSite {
    /// Active and unoccupied.
    pub fn is_available(&self) -> bool {
        self.active && self.occupant.is_none()
    }
}

/// Group of adjacent binding sites switching together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulatoryUnit {
    /// Owning thin filament.
    pub thin: usize,
    /// Sites controlled by this unit.
    pub sites: Range<SiteIndex>,
    /// Activation status.
    pub active: bool,
}

/// Thin filament view: its sites and regulatory units in the flat arenas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinFilament {
    /// Filament index.
    pub index: usize,
    /// Binding sites, ordered from the Z-disc outward.
    pub sites: Range<SiteIndex>,
    /// Regulatory units, ordered from the Z-disc outward.
    pub regulatory_units: Range<usize>,
}
