//! Flat arenas of units and binding sites with bidirectional occupancy.

use myo_core::{ErrorInfo, MyoError, SiteIndex, StateId, UnitIndex};

use crate::geometry::Geometry;
use crate::site::{BindingSite, RegulatoryUnit, ThinFilament};
use crate::unit::{CrossbridgeUnit, ThickFilament};

/// Spatial model of one half-sarcomere: thick nodes carrying units and thin
/// filaments carrying binding sites.
///
/// Unit `u` rides on thick node `u`; site `s` sits on thin node `s`.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingSiteLattice {
    geometry: Geometry,
    thick: Vec<ThickFilament>,
    thin: Vec<ThinFilament>,
    units: Vec<CrossbridgeUnit>,
    node_positions: Vec<f64>,
    sites: Vec<BindingSite>,
    regulatory: Vec<RegulatoryUnit>,
}

impl BindingSiteLattice {
    /// Builds the lattice at rest for `geometry.initial_length` with every unit
    /// detached in `initial_state` and every regulatory unit set to `active`.
    pub fn new(geometry: Geometry, initial_state: StateId, active: bool) -> Result<Self, MyoError> {
        geometry.validate()?;
        let nodes = geometry.nodes_per_thick;
        let per_thin = geometry.sites_per_thin();
        let per_unit = geometry.sites_per_unit;

        let mut thick = Vec::with_capacity(geometry.thick_filaments);
        let mut units = Vec::with_capacity(geometry.total_units());
        let mut node_positions = Vec::with_capacity(geometry.total_units());
        for t in 0..geometry.thick_filaments {
            thick.push(ThickFilament {
                index: t,
                units: t * nodes..(t + 1) * nodes,
                faced_thin: geometry.faced_thin(t).collect(),
            });
            for node in 0..nodes {
                units.push(CrossbridgeUnit {
                    state: initial_state,
                    distortion: 0.0,
                    thick: t,
                    node,
                    bound_site: None,
                });
                node_positions.push(geometry.thick_rest_position(geometry.initial_length, node));
            }
        }

        let mut thin = Vec::with_capacity(geometry.thin_filaments);
        let mut sites = Vec::with_capacity(geometry.total_sites());
        let mut regulatory = Vec::new();
        for f in 0..geometry.thin_filaments {
            let first_unit = regulatory.len();
            for r in 0..geometry.regulatory_units_per_thin {
                let start = f * per_thin + r * per_unit;
                regulatory.push(RegulatoryUnit {
                    thin: f,
                    sites: start..start + per_unit,
                    active,
                });
                for local in 0..per_unit {
                    sites.push(BindingSite {
                        position: geometry.thin_rest_position(r * per_unit + local),
                        regulatory_unit: regulatory.len() - 1,
                        active,
                        occupant: None,
                    });
                }
            }
            thin.push(ThinFilament {
                index: f,
                sites: f * per_thin..(f + 1) * per_thin,
                regulatory_units: first_unit..regulatory.len(),
            });
        }

        log::info!(
            "built lattice: {} thick x {} nodes, {} thin x {} sites",
            geometry.thick_filaments,
            nodes,
            geometry.thin_filaments,
            per_thin
        );

        Ok(Self {
            geometry,
            thick,
            thin,
            units,
            node_positions,
            sites,
            regulatory,
        })
    }

    /// Geometry the lattice was built from.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Thick filament views.
    pub fn thick_filaments(&self) -> &[ThickFilament] {
        &self.thick
    }

    /// Thin filament views.
    pub fn thin_filaments(&self) -> &[ThinFilament] {
        &self.thin
    }

    /// All cross-bridge units.
    pub fn units(&self) -> &[CrossbridgeUnit] {
        &self.units
    }

    /// A single unit.
    pub fn unit(&self, unit: UnitIndex) -> Option<&CrossbridgeUnit> {
        self.units.get(unit)
    }

    /// Mutable access to a unit's state and distortion.
    ///
    /// Occupancy must be changed through [`BindingSiteLattice::bind`] and
    /// [`BindingSiteLattice::release`].
    pub fn set_unit_state(&mut self, unit: UnitIndex, state: StateId, distortion: f64) {
        if let Some(entry) = self.units.get_mut(unit) {
            entry.state = state;
            entry.distortion = distortion;
        }
    }

    /// Overwrites a unit's distortion.
    pub fn set_distortion(&mut self, unit: UnitIndex, distortion: f64) {
        if let Some(entry) = self.units.get_mut(unit) {
            entry.distortion = distortion;
        }
    }

    /// All binding sites.
    pub fn sites(&self) -> &[BindingSite] {
        &self.sites
    }

    /// A single site.
    pub fn site(&self, site: SiteIndex) -> Option<&BindingSite> {
        self.sites.get(site)
    }

    /// Regulatory units across all thin filaments.
    pub fn regulatory_units(&self) -> &[RegulatoryUnit] {
        &self.regulatory
    }

    pub(crate) fn regulatory_units_mut(&mut self) -> &mut [RegulatoryUnit] {
        &mut self.regulatory
    }

    pub(crate) fn sites_mut(&mut self) -> &mut [BindingSite] {
        &mut self.sites
    }

    /// Positions of thick nodes, indexed by unit.
    pub fn node_positions(&self) -> &[f64] {
        &self.node_positions
    }

    /// Axial position of a unit's node.
    pub fn node_position(&self, unit: UnitIndex) -> f64 {
        self.node_positions[unit]
    }

    /// Writes solved thick node positions.
    pub fn set_node_positions(&mut self, positions: &[f64]) {
        self.node_positions.copy_from_slice(positions);
    }

    /// Writes solved site positions.
    pub fn set_site_positions(&mut self, positions: &[f64]) {
        for (site, &position) in self.sites.iter_mut().zip(positions) {
            site.position = position;
        }
    }

    /// Sets every regulatory unit and its sites to `active`.
    pub fn set_all_active(&mut self, active: bool) {
        for unit in &mut self.regulatory {
            unit.active = active;
        }
        for site in &mut self.sites {
            site.active = active;
        }
    }

    /// Records occupancy on both the unit and the site.
    pub fn bind(&mut self, unit: UnitIndex, site: SiteIndex) -> Result<(), MyoError> {
        let bound = self
            .units
            .get(unit)
            .ok_or_else(|| out_of_range("unit", unit))?
            .bound_site;
        let target = self.sites.get(site).ok_or_else(|| out_of_range("site", site))?;
        if let Some(existing) = bound {
            return Err(MyoError::Consistency(
                ErrorInfo::new("unit-already-bound", "unit is already attached")
                    .with_context("unit", unit)
                    .with_context("site", existing),
            ));
        }
        if let Some(occupant) = target.occupant {
            return Err(MyoError::Consistency(
                ErrorInfo::new("site-double-bound", "binding site already has an occupant")
                    .with_context("site", site)
                    .with_context("occupant", occupant)
                    .with_context("unit", unit),
            ));
        }
        if !target.active {
            return Err(MyoError::Consistency(
                ErrorInfo::new("site-inactive", "cannot bind to an inactive site")
                    .with_context("site", site)
                    .with_context("unit", unit),
            ));
        }
        self.sites[site].occupant = Some(unit);
        self.units[unit].bound_site = Some(site);
        Ok(())
    }

    /// Clears occupancy on both sides, returning the released site.
    pub fn release(&mut self, unit: UnitIndex) -> Result<Option<SiteIndex>, MyoError> {
        let entry = self
            .units
            .get_mut(unit)
            .ok_or_else(|| out_of_range("unit", unit))?;
        let Some(site) = entry.bound_site.take() else {
            return Ok(None);
        };
        match self.sites.get_mut(site) {
            Some(target) if target.occupant == Some(unit) => {
                target.occupant = None;
                Ok(Some(site))
            }
            _ => Err(MyoError::Consistency(
                ErrorInfo::new("occupancy-mismatch", "site does not record the releasing unit")
                    .with_context("unit", unit)
                    .with_context("site", site),
            )),
        }
    }

    /// Verifies that unit and site back-references agree in both directions.
    pub fn check_consistency(&self) -> Result<(), MyoError> {
        for (index, unit) in self.units.iter().enumerate() {
            if let Some(site) = unit.bound_site {
                match self.sites.get(site) {
                    Some(target) if target.occupant == Some(index) => {}
                    _ => {
                        return Err(MyoError::Consistency(
                            ErrorInfo::new(
                                "occupancy-mismatch",
                                "unit references a site that does not reference it back",
                            )
                            .with_context("unit", index)
                            .with_context("site", site),
                        ))
                    }
                }
            }
        }
        for (index, site) in self.sites.iter().enumerate() {
            if let Some(occupant) = site.occupant {
                match self.units.get(occupant) {
                    Some(unit) if unit.bound_site == Some(index) => {}
                    _ => {
                        return Err(MyoError::Consistency(
                            ErrorInfo::new(
                                "occupancy-mismatch",
                                "site references a unit that is not bound to it",
                            )
                            .with_context("site", index)
                            .with_context("unit", occupant),
                        ))
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of attached units.
    pub fn attached_count(&self) -> usize {
        self.units.iter().filter(|u| u.bound_site.is_some()).count()
    }

    /// Fraction of binding sites that are activated.
    pub fn active_fraction(&self) -> f64 {
        if self.sites.is_empty() {
            return 0.0;
        }
        self.sites.iter().filter(|s| s.active).count() as f64 / self.sites.len() as f64
    }
}

fn out_of_range(kind: &str, index: usize) -> MyoError {
    MyoError::Consistency(
        ErrorInfo::new("index-out-of-range", "lattice index out of range")
            .with_context("kind", kind)
            .with_context("index", index),
    )
}
