//! YAML documents read by the driver.

use std::fs;
use std::path::Path;

use myo_core::{ErrorInfo, MyoError};
use myo_hs::ModelConfig;
use myo_muscle::{MuscleBoundary, MuscleConfig, MuscleControl};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Model file: half-sarcomere configuration plus muscle composition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimModel {
    #[serde(flatten)]
    pub config: ModelConfig,
    #[serde(default)]
    pub muscle: MuscleConfig,
    /// Share of units drawn into each isotype, in `--scheme` order.
    #[serde(default)]
    pub isotypes: Vec<f64>,
}

impl SimModel {
    pub fn load(path: &Path) -> Result<Self, MyoError> {
        serde_yaml::from_str(&read(path)?).map_err(|err| parse_error("model-parse", path, err))
    }

    /// Isotype proportions for `schemes` schemes; equal shares when none are given.
    pub fn isotype_proportions(&self, schemes: usize) -> Vec<f64> {
        if self.isotypes.is_empty() {
            vec![1.0; schemes]
        } else {
            self.isotypes.clone()
        }
    }

    /// SHA-256 over the canonical JSON form of the model.
    pub fn canonical_hash(&self) -> Result<String, MyoError> {
        let bytes = serde_json::to_vec(self).map_err(|err| {
            MyoError::Serde(ErrorInfo::new("model-serialize", err.to_string()))
        })?;
        let digest = Sha256::digest(&bytes);
        Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }
}

fn default_dt() -> f64 {
    1e-3
}

/// Mechanical control held over a protocol segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentControl {
    /// Keep the current length.
    #[default]
    Hold,
    /// Total length change spread evenly over the segment's steps.
    Ramp { delta: f64 },
    /// Fixed muscle length.
    Length { length: f64 },
    /// Fixed muscle tension.
    Force { force: f64 },
}

/// A run of identical steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub steps: u64,
    #[serde(default = "default_dt")]
    pub dt: f64,
    #[serde(default)]
    pub p_ca: Option<f64>,
    #[serde(default)]
    pub control: SegmentControl,
}

impl Segment {
    /// Boundary condition applied on every step of the segment.
    pub fn boundary(&self) -> MuscleBoundary {
        let control = match self.control {
            SegmentControl::Hold => MuscleControl::LengthChange { delta: 0.0 },
            SegmentControl::Ramp { delta } => MuscleControl::LengthChange {
                delta: delta / self.steps.max(1) as f64,
            },
            SegmentControl::Length { length } => MuscleControl::Length { length },
            SegmentControl::Force { force } => MuscleControl::Force { force },
        };
        MuscleBoundary {
            control,
            p_ca: self.p_ca,
        }
    }
}

/// Ordered loading schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl Protocol {
    pub fn load(path: &Path) -> Result<Self, MyoError> {
        let protocol: Self = serde_yaml::from_str(&read(path)?)
            .map_err(|err| parse_error("protocol-parse", path, err))?;
        protocol.validate()?;
        Ok(protocol)
    }

    /// Rejects non-positive timesteps and non-finite targets.
    pub fn validate(&self) -> Result<(), MyoError> {
        for (index, segment) in self.segments.iter().enumerate() {
            let value = match segment.control {
                SegmentControl::Hold => 0.0,
                SegmentControl::Ramp { delta } => delta,
                SegmentControl::Length { length } => length,
                SegmentControl::Force { force } => force,
            };
            let p_ca = segment.p_ca.unwrap_or(0.0);
            if !(segment.dt.is_finite() && segment.dt > 0.0)
                || !value.is_finite()
                || !p_ca.is_finite()
            {
                return Err(MyoError::Configuration(
                    ErrorInfo::new("invalid-protocol", "segment has an invalid value")
                        .with_context("segment", index)
                        .with_context("dt", segment.dt),
                ));
            }
        }
        Ok(())
    }

    pub fn total_steps(&self) -> u64 {
        self.segments.iter().map(|s| s.steps).sum()
    }
}

pub fn read(path: &Path) -> Result<String, MyoError> {
    fs::read_to_string(path).map_err(|err| {
        MyoError::Serde(
            ErrorInfo::new("file-read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })
}

fn parse_error(code: &str, path: &Path, err: impl ToString) -> MyoError {
    MyoError::Serde(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}
