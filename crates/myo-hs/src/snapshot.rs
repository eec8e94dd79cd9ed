use myo_core::{StateId, UnitIndex};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Observable state of a half-sarcomere after a completed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulated time (s).
    pub time: f64,
    /// Completed steps.
    pub step: u64,
    /// Half-sarcomere length (nm).
    pub length: f64,
    /// Total tension at the M-line, summed over thick filaments (pN).
    pub tension: f64,
    /// Portion of the tension carried by titin (pN).
    pub passive_tension: f64,
    /// Portion of the tension carried by the extracellular element (pN).
    #[serde(default)]
    pub extracellular_tension: f64,
    /// Units per thick filament; unit `u` sits on filament `u / nodes_per_thick`.
    pub nodes_per_thick: usize,
    /// Sites per thin filament; site `s` sits on filament `s / sites_per_thin`.
    pub sites_per_thin: usize,
    /// State of every unit.
    pub unit_states: Vec<StateId>,
    /// Distortion of every unit (nm).
    pub distortions: Vec<f64>,
    /// Occupant of every binding site.
    pub occupancy: Vec<Option<UnitIndex>>,
    /// Activation of every binding site.
    pub site_active: Vec<bool>,
    /// Fraction of units in each scheme state.
    pub populations: Vec<f64>,
    /// Sweeps used by the last equilibrium solve.
    pub solver_iterations: usize,
}

impl Snapshot {
    /// States of the units on thick filament `thick`.
    pub fn thick_states(&self, thick: usize) -> &[StateId] {
        let start = (thick * self.nodes_per_thick).min(self.unit_states.len());
        let end = (start + self.nodes_per_thick).min(self.unit_states.len());
        &self.unit_states[start..end]
    }

    /// Occupancy of the sites on thin filament `thin`.
    pub fn thin_occupancy(&self, thin: usize) -> &[Option<UnitIndex>] {
        let start = (thin * self.sites_per_thin).min(self.occupancy.len());
        let end = (start + self.sites_per_thin).min(self.occupancy.len());
        &self.occupancy[start..end]
    }

    /// Fraction of units bound to a site.
    pub fn attached_fraction(&self) -> f64 {
        if self.occupancy.is_empty() || self.unit_states.is_empty() {
            return 0.0;
        }
        self.occupancy.iter().filter(|o| o.is_some()).count() as f64
            / self.unit_states.len() as f64
    }

    /// Fraction of binding sites activated.
    pub fn active_fraction(&self) -> f64 {
        if self.site_active.is_empty() {
            return 0.0;
        }
        self.site_active.iter().filter(|a| **a).count() as f64 / self.site_active.len() as f64
    }

    /// SHA-256 over the bit patterns of every field.
    pub fn canonical_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.time.to_bits().to_le_bytes());
        hasher.update(self.step.to_le_bytes());
        hasher.update(self.length.to_bits().to_le_bytes());
        hasher.update(self.tension.to_bits().to_le_bytes());
        hasher.update(self.passive_tension.to_bits().to_le_bytes());
        hasher.update(self.extracellular_tension.to_bits().to_le_bytes());
        hasher.update((self.nodes_per_thick as u64).to_le_bytes());
        hasher.update((self.sites_per_thin as u64).to_le_bytes());
        hasher.update((self.unit_states.len() as u64).to_le_bytes());
        for (state, distortion) in self.unit_states.iter().zip(&self.distortions) {
            hasher.update((state.as_raw() as u64).to_le_bytes());
            hasher.update(distortion.to_bits().to_le_bytes());
        }
        hasher.update((self.occupancy.len() as u64).to_le_bytes());
        for (occupant, active) in self.occupancy.iter().zip(&self.site_active) {
            let tag = occupant.map_or(u64::MAX, |u| u as u64);
            hasher.update(tag.to_le_bytes());
            hasher.update([u8::from(*active)]);
        }
        for population in &self.populations {
            hasher.update(population.to_bits().to_le_bytes());
        }
        hasher.update((self.solver_iterations as u64).to_le_bytes());
        let digest = hasher.finalize();
        digest
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<String>()
    }
}
