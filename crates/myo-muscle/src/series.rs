use myo_core::{ErrorInfo, MyoError};
use serde::{Deserialize, Serialize};

/// Linear spring in series with the half-sarcomeres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesElement {
    /// Stiffness (pN nm^-1).
    pub stiffness: f64,
}

impl SeriesElement {
    /// Rejects non-positive stiffness.
    pub fn validate(&self) -> Result<(), MyoError> {
        if self.stiffness.is_finite() && self.stiffness > 0.0 {
            Ok(())
        } else {
            Err(MyoError::Configuration(
                ErrorInfo::new("invalid-series-element", "series stiffness must be positive")
                    .with_context("stiffness", self.stiffness),
            ))
        }
    }

    /// Extension carrying `tension`.
    pub fn extension(&self, tension: f64) -> f64 {
        tension / self.stiffness
    }

    /// Extension per unit tension.
    pub fn compliance(&self) -> f64 {
        1.0 / self.stiffness
    }
}
