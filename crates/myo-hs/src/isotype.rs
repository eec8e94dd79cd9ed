//! Myosin isotypes: several kinetic schemes sharing one lattice, each unit
//! governed by the scheme drawn for it at construction.

use std::sync::Arc;

use myo_core::rng::STREAM_ISOTYPE;
use myo_core::{counter_uniform, ErrorInfo, MyoError, UnitIndex};
use myo_kinetics::KineticScheme;

/// Source of the kinetic scheme governing each unit.
pub trait SchemeSource: Sync {
    /// Scheme for `unit`.
    fn scheme_for(&self, unit: UnitIndex) -> &KineticScheme;
}

impl SchemeSource for KineticScheme {
    fn scheme_for(&self, _unit: UnitIndex) -> &KineticScheme {
        self
    }
}

impl SchemeSource for Arc<KineticScheme> {
    fn scheme_for(&self, _unit: UnitIndex) -> &KineticScheme {
        self
    }
}

/// Candidate schemes and the proportion of units drawn into each.
#[derive(Debug, Clone)]
pub struct Isotypes {
    schemes: Vec<Arc<KineticScheme>>,
    proportions: Vec<f64>,
}

impl Isotypes {
    /// Validates one proportion per scheme. Proportions must be finite and
    /// non-negative with a positive sum; they are normalised.
    pub fn new(schemes: Vec<Arc<KineticScheme>>, proportions: Vec<f64>) -> Result<Self, MyoError> {
        if schemes.is_empty() || schemes.len() != proportions.len() {
            return Err(MyoError::Configuration(
                ErrorInfo::new("invalid-isotypes", "need one proportion per isotype scheme")
                    .with_context("schemes", schemes.len())
                    .with_context("proportions", proportions.len()),
            ));
        }
        if let Some((index, value)) = proportions
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.is_finite() && **p >= 0.0))
        {
            return Err(MyoError::Configuration(
                ErrorInfo::new("invalid-isotypes", "isotype proportion must be finite and non-negative")
                    .with_context("isotype", index)
                    .with_context("value", value),
            ));
        }
        let total: f64 = proportions.iter().sum();
        if total <= 0.0 {
            return Err(MyoError::configuration(
                "invalid-isotypes",
                "isotype proportions sum to zero",
            ));
        }
        Ok(Self {
            schemes,
            proportions: proportions.iter().map(|p| p / total).collect(),
        })
    }

    /// A single isotype.
    pub fn single(scheme: Arc<KineticScheme>) -> Self {
        Self {
            schemes: vec![scheme],
            proportions: vec![1.0],
        }
    }

    /// Candidate schemes in isotype order.
    pub fn schemes(&self) -> &[Arc<KineticScheme>] {
        &self.schemes
    }

    /// Normalised proportions in isotype order.
    pub fn proportions(&self) -> &[f64] {
        &self.proportions
    }

    /// Draws an isotype for each of `units` units.
    ///
    /// Unit `u` takes the first isotype whose cumulative proportion exceeds
    /// its draw at counter `(0, u)` on the isotype stream.
    pub fn assign(&self, units: usize, seed: u64) -> IsotypeAssignment {
        let isotype = if self.schemes.len() == 1 {
            vec![0; units]
        } else {
            (0..units)
                .map(|unit| {
                    let draw = counter_uniform(seed, STREAM_ISOTYPE, 0, unit as u64);
                    let mut cumulative = 0.0;
                    self.proportions
                        .iter()
                        .position(|p| {
                            cumulative += p;
                            *p > 0.0 && draw < cumulative
                        })
                        .unwrap_or_else(|| last_populated(&self.proportions))
                })
                .collect()
        };
        IsotypeAssignment {
            schemes: self.schemes.clone(),
            isotype,
        }
    }
}

impl From<Arc<KineticScheme>> for Isotypes {
    fn from(scheme: Arc<KineticScheme>) -> Self {
        Self::single(scheme)
    }
}

fn last_populated(proportions: &[f64]) -> usize {
    proportions.iter().rposition(|p| *p > 0.0).unwrap_or(0)
}

/// Isotype drawn for every unit of one half-sarcomere.
#[derive(Debug, Clone)]
pub struct IsotypeAssignment {
    schemes: Vec<Arc<KineticScheme>>,
    isotype: Vec<usize>,
}

impl IsotypeAssignment {
    /// Candidate schemes in isotype order.
    pub fn schemes(&self) -> &[Arc<KineticScheme>] {
        &self.schemes
    }

    /// Isotype index of every unit.
    pub fn isotypes(&self) -> &[usize] {
        &self.isotype
    }

    /// Isotype index of `unit`.
    pub fn isotype_of(&self, unit: UnitIndex) -> usize {
        self.isotype.get(unit).copied().unwrap_or(0)
    }

    /// Units assigned to each isotype.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.schemes.len()];
        for &isotype in &self.isotype {
            counts[isotype] += 1;
        }
        counts
    }

    /// Largest state count over the candidate schemes.
    pub fn state_count(&self) -> usize {
        self.schemes
            .iter()
            .map(|scheme| scheme.states().len())
            .max()
            .unwrap_or(0)
    }
}

impl SchemeSource for IsotypeAssignment {
    fn scheme_for(&self, unit: UnitIndex) -> &KineticScheme {
        &self.schemes[self.isotype_of(unit)]
    }
}
