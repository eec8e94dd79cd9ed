#![deny(missing_docs)]

//! Binding-site lattice of a half-sarcomere: thick filaments carrying
//! cross-bridge units, thin filaments carrying binding sites grouped into
//! cooperative regulatory units, and the geometric queries the kinetics need.

/// Lattice geometry and its validation.
pub mod geometry;
pub mod lattice;
/// Distance-ordered binding-site queries.
pub mod query;
/// Cooperative thin-filament switching.
pub mod regulation;
/// Binding sites and regulatory units.
pub mod site;
/// Cross-bridge units and thick filaments.
pub mod unit;

pub use geometry::Geometry;
pub use lattice::BindingSiteLattice;
pub use query::{order_candidates, SiteCandidate, TieBreak, DEFAULT_TIE_BREAK};
pub use regulation::{calcium_from_pca, Regulation, RegulationReport};
pub use site::{BindingSite, RegulatoryUnit, ThinFilament};
pub use unit::{CrossbridgeUnit, ThickFilament};
