//! Mechanical parameters and run options.

use myo_core::{ErrorInfo, MyoError};
use myo_lattice::{Geometry, Regulation, TieBreak, DEFAULT_TIE_BREAK};
use serde::{Deserialize, Serialize};

/// Force carried by a bound cross-bridge as a function of its distortion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForceLaw {
    /// `F = k * d`.
    #[default]
    Linear,
    /// `F = k * d + damping * (d - d_prev) / dt`.
    Viscoelastic {
        /// Damping coefficient (pN s nm^-1).
        damping: f64,
    },
}

/// Shape of a passive force-extension curve beyond its linear term.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PassiveMode {
    /// Linear term only.
    #[default]
    Linear,
    /// Adds `sign(x) * sigma * (exp(|x| / length_scale) - 1)` at extension `x`.
    Exponential {
        /// Force scale (pN).
        sigma: f64,
        /// Extension over which the force grows e-fold (nm).
        length_scale: f64,
    },
}

impl PassiveMode {
    /// Force added to the linear term at extension `x`.
    pub fn excess(&self, x: f64) -> f64 {
        match *self {
            PassiveMode::Linear => 0.0,
            PassiveMode::Exponential {
                sigma,
                length_scale,
            } => x.signum() * sigma * (x.abs() / length_scale).exp_m1(),
        }
    }

    /// Derivative of [`PassiveMode::excess`] at `x`.
    pub fn excess_slope(&self, x: f64) -> f64 {
        match *self {
            PassiveMode::Linear => 0.0,
            PassiveMode::Exponential {
                sigma,
                length_scale,
            } => sigma / length_scale * (x.abs() / length_scale).exp(),
        }
    }

    fn validate(&self, field: &str) -> Result<(), MyoError> {
        if let PassiveMode::Exponential {
            sigma,
            length_scale,
        } = *self
        {
            non_negative(&format!("{field}.sigma"), sigma)?;
            positive(&format!("{field}.length_scale"), length_scale)?;
        }
        Ok(())
    }
}

/// Passive titin spring linking each thick filament to the thin filaments it faces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Titin {
    /// Spring stiffness (pN nm^-1).
    pub stiffness: f64,
    /// Length at which the spring carries no force (nm).
    #[serde(default)]
    pub slack_length: f64,
    /// Nonlinear part of the force-extension curve.
    #[serde(default)]
    pub passive: PassiveMode,
    /// Thick node carrying the spring, counted from the M-line.
    #[serde(default)]
    pub thick_node: usize,
    /// Thin node carrying the spring, counted from the Z-disc.
    #[serde(default)]
    pub thin_node: usize,
}

impl Titin {
    /// Force at `extension` past the slack length (pN).
    pub fn force(&self, extension: f64) -> f64 {
        self.stiffness * extension + self.passive.excess(extension)
    }

    /// Tangent stiffness at `extension` (pN nm^-1).
    pub fn slope(&self, extension: f64) -> f64 {
        self.stiffness + self.passive.excess_slope(extension)
    }

    /// True when the force is not linear in the extension.
    pub fn is_nonlinear(&self) -> bool {
        self.passive != PassiveMode::Linear
    }
}

/// Passive element in parallel with the lattice; its force depends only on
/// the half-sarcomere length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extracellular {
    /// Linear stiffness (pN nm^-1).
    #[serde(default)]
    pub stiffness: f64,
    /// Half-sarcomere length at which the element carries no force (nm).
    pub slack_length: f64,
    /// Nonlinear part of the force-length curve.
    #[serde(default)]
    pub passive: PassiveMode,
}

impl Extracellular {
    /// Force at half-sarcomere length `length` (pN).
    pub fn force(&self, length: f64) -> f64 {
        let extension = length - self.slack_length;
        self.stiffness * extension + self.passive.excess(extension)
    }
}

/// Elastic description of the lattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mechanics {
    /// Thick backbone segment stiffness (pN nm^-1).
    #[serde(default = "default_thick_stiffness")]
    pub thick_stiffness: f64,
    /// Thin backbone segment stiffness (pN nm^-1).
    #[serde(default = "default_thin_stiffness")]
    pub thin_stiffness: f64,
    /// Bound cross-bridge stiffness (pN nm^-1).
    #[serde(default = "default_bridge_stiffness")]
    pub bridge_stiffness: f64,
    /// Cross-bridge force law.
    #[serde(default)]
    pub force_law: ForceLaw,
    /// Optional passive spring.
    #[serde(default)]
    pub titin: Option<Titin>,
    /// Optional passive element outside the filament lattice.
    #[serde(default)]
    pub extracellular: Option<Extracellular>,
    /// When false thin filaments are held rigid at their rest positions.
    #[serde(default = "default_thin_compliant")]
    pub thin_compliant: bool,
}

fn default_thick_stiffness() -> f64 {
    2020.0
}

fn default_thin_stiffness() -> f64 {
    1743.0
}

fn default_bridge_stiffness() -> f64 {
    2.0
}

fn default_thin_compliant() -> bool {
    true
}

impl Default for Mechanics {
    fn default() -> Self {
        Self {
            thick_stiffness: default_thick_stiffness(),
            thin_stiffness: default_thin_stiffness(),
            bridge_stiffness: default_bridge_stiffness(),
            force_law: ForceLaw::default(),
            titin: None,
            extracellular: None,
            thin_compliant: default_thin_compliant(),
        }
    }
}

/// Numerical and stochastic options for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Master seed for every random draw in the run.
    #[serde(default)]
    pub seed: u64,
    /// Maximum net node force accepted as equilibrium (pN).
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Iteration cap shared by the equilibrium solve and force searches.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Distance within which a detached unit may capture a site (nm, exclusive).
    #[serde(default = "default_capture_radius")]
    pub capture_radius: f64,
    /// Force mismatch accepted by fixed-force searches (pN).
    #[serde(default = "default_force_tolerance")]
    pub force_tolerance: f64,
    /// Largest length change a fixed-force search may impose in one step (nm).
    #[serde(default = "default_force_span")]
    pub force_span: f64,
    /// First trial length change of a fixed-force search (nm).
    #[serde(default = "default_trial_step")]
    pub trial_step: f64,
    /// Evaluate kinetics and residuals on the rayon pool.
    #[serde(default)]
    pub parallel: bool,
    /// Ordering among equidistant candidate sites.
    #[serde(default = "default_tie_break")]
    pub tie_break: TieBreak,
}

fn default_tolerance() -> f64 {
    1e-3
}

fn default_max_iterations() -> usize {
    200
}

fn default_capture_radius() -> f64 {
    10.0
}

fn default_force_tolerance() -> f64 {
    1e-2
}

fn default_force_span() -> f64 {
    50.0
}

fn default_trial_step() -> f64 {
    1.0
}

fn default_tie_break() -> TieBreak {
    DEFAULT_TIE_BREAK
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            capture_radius: default_capture_radius(),
            force_tolerance: default_force_tolerance(),
            force_span: default_force_span(),
            trial_step: default_trial_step(),
            parallel: false,
            tie_break: default_tie_break(),
        }
    }
}

/// Everything besides the scheme and geometry needed to build a half-sarcomere.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationOptions {
    /// Elastic parameters.
    #[serde(default)]
    pub mechanics: Mechanics,
    /// Thin filament regulation.
    #[serde(default)]
    pub regulation: Regulation,
    /// Numerical options.
    #[serde(default)]
    pub run: RunOptions,
}

/// Complete model description as loaded by an external driver.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Lattice geometry.
    #[serde(default)]
    pub geometry: Geometry,
    /// Mechanics, regulation and run options.
    #[serde(flatten)]
    pub options: SimulationOptions,
}

fn invalid(code: &str, field: &str, value: f64) -> MyoError {
    MyoError::Configuration(
        ErrorInfo::new(code, "invalid option value")
            .with_context("field", field)
            .with_context("value", value),
    )
}

fn positive(field: &str, value: f64) -> Result<(), MyoError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid("invalid-option", field, value))
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), MyoError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid("invalid-option", field, value))
    }
}

impl Mechanics {
    /// Validates stiffnesses and titin attachment points against `geometry`.
    pub fn validate(&self, geometry: &Geometry) -> Result<(), MyoError> {
        positive("thick_stiffness", self.thick_stiffness)?;
        positive("thin_stiffness", self.thin_stiffness)?;
        non_negative("bridge_stiffness", self.bridge_stiffness)?;
        if let ForceLaw::Viscoelastic { damping } = self.force_law {
            non_negative("damping", damping)?;
        }
        if let Some(titin) = &self.titin {
            non_negative("titin.stiffness", titin.stiffness)?;
            if !titin.slack_length.is_finite() {
                return Err(invalid("invalid-option", "titin.slack_length", titin.slack_length));
            }
            titin.passive.validate("titin")?;
            if titin.thick_node >= geometry.nodes_per_thick
                || titin.thin_node >= geometry.sites_per_thin()
            {
                return Err(MyoError::Configuration(
                    ErrorInfo::new("malformed-geometry", "titin attachment node out of range")
                        .with_context("thick_node", titin.thick_node)
                        .with_context("thin_node", titin.thin_node),
                ));
            }
        }
        if let Some(extracellular) = &self.extracellular {
            non_negative("extracellular.stiffness", extracellular.stiffness)?;
            if !extracellular.slack_length.is_finite() {
                return Err(invalid(
                    "invalid-option",
                    "extracellular.slack_length",
                    extracellular.slack_length,
                ));
            }
            extracellular.passive.validate("extracellular")?;
        }
        Ok(())
    }
}

impl RunOptions {
    /// Validates tolerances and the capture radius.
    pub fn validate(&self) -> Result<(), MyoError> {
        positive("tolerance", self.tolerance)?;
        non_negative("capture_radius", self.capture_radius)?;
        positive("force_tolerance", self.force_tolerance)?;
        positive("force_span", self.force_span)?;
        positive("trial_step", self.trial_step)?;
        Ok(())
    }
}

impl SimulationOptions {
    /// Validates every section against `geometry`.
    pub fn validate(&self, geometry: &Geometry) -> Result<(), MyoError> {
        geometry.validate()?;
        self.mechanics.validate(geometry)?;
        self.regulation.validate()?;
        self.run.validate()
    }
}
