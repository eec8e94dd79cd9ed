use myo_core::rng::STREAM_REGULATION;
use myo_core::{counter_uniform, ErrorInfo, MyoError};
use serde::{Deserialize, Serialize};

use crate::lattice::BindingSiteLattice;

/// Cooperative thin-filament activation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regulation {
    /// Activation rate per molar calcium (M^-1 s^-1).
    #[serde(default = "default_k_on")]
    pub k_on: f64,
    /// Deactivation rate (s^-1).
    #[serde(default = "default_k_off")]
    pub k_off: f64,
    /// Boost per neighbour in the same status.
    #[serde(default = "default_k_coop")]
    pub k_coop: f64,
    /// Status of every regulatory unit at initialization.
    #[serde(default)]
    pub initially_active: bool,
}

fn default_k_on() -> f64 {
    5e8
}

fn default_k_off() -> f64 {
    200.0
}

fn default_k_coop() -> f64 {
    5.0
}

impl Default for Regulation {
    fn default() -> Self {
        Self {
            k_on: default_k_on(),
            k_off: default_k_off(),
            k_coop: default_k_coop(),
            initially_active: false,
        }
    }
}

impl Regulation {
    /// Rejects negative or non-finite rates.
    pub fn validate(&self) -> Result<(), MyoError> {
        for (field, value) in [("k_on", self.k_on), ("k_off", self.k_off), ("k_coop", self.k_coop)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(MyoError::Configuration(
                    ErrorInfo::new("invalid-regulation", "regulation rates must be finite and non-negative")
                        .with_context("field", field)
                        .with_context("value", value),
                ));
            }
        }
        Ok(())
    }
}

/// Counts of regulatory units that switched during one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegulationReport {
    /// Units switched on.
    pub activated: usize,
    /// Units switched off.
    pub deactivated: usize,
}

impl BindingSiteLattice {
    /// Applies one cooperative switching step at calcium concentration
    /// `calcium` (M).
    ///
    /// Neighbour statuses are read from before the update. A unit holding a
    /// bound cross-bridge cannot switch off. Unit `r` consumes the draw at
    /// counter `(step, r)` on the regulation stream.
    pub fn update_regulation(
        &mut self,
        params: &Regulation,
        calcium: f64,
        dt: f64,
        seed: u64,
        step: u64,
    ) -> RegulationReport {
        let previous: Vec<bool> = self.regulatory_units().iter().map(|u| u.active).collect();
        let mut report = RegulationReport::default();
        let mut switched = Vec::new();

        for filament in self.thin_filaments() {
            let range = filament.regulatory_units.clone();
            for r in range.clone() {
                let neighbours = [
                    (r > range.start).then(|| previous[r - 1]),
                    (r + 1 < range.end).then(|| previous[r + 1]),
                ];
                let unit = &self.regulatory_units()[r];
                let rate = if previous[r] {
                    let occupied = unit
                        .sites
                        .clone()
                        .any(|s| self.sites()[s].occupant.is_some());
                    if occupied {
                        continue;
                    }
                    let inactive = neighbours.iter().filter(|n| **n == Some(false)).count();
                    params.k_off * (1.0 + params.k_coop * inactive as f64)
                } else {
                    let active = neighbours.iter().filter(|n| **n == Some(true)).count();
                    params.k_on * calcium * (1.0 + params.k_coop * active as f64)
                };
                let probability = 1.0 - (-rate * dt).exp();
                if counter_uniform(seed, STREAM_REGULATION, step, r as u64) < probability {
                    switched.push(r);
                }
            }
        }

        for r in switched {
            let now_active = !previous[r];
            let sites = {
                let unit = &mut self.regulatory_units_mut()[r];
                unit.active = now_active;
                unit.sites.clone()
            };
            for site in sites {
                self.sites_mut()[site].active = now_active;
            }
            if now_active {
                report.activated += 1;
            } else {
                report.deactivated += 1;
            }
        }
        report
    }
}

/// Converts pCa to molar calcium concentration.
pub fn calcium_from_pca(p_ca: f64) -> f64 {
    10f64.powf(-p_ca)
}
