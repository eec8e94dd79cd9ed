use myo_core::{ErrorInfo, MyoError};
use serde::{Deserialize, Serialize};

/// Thermal energy at 310 K in pN nm.
pub const THERMAL_ENERGY: f64 = 1.38e-23 * 310.0 * 1e21;

/// Instantaneous mechanical context in which a rate law is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RateContext {
    /// Signed distortion of the unit (nm).
    pub distortion: f64,
    /// Signed offset to the nearest compatible binding site, when one exists.
    pub site_distance: Option<f64>,
    /// Tension carried by the thick-filament backbone at the unit's node.
    pub node_force: f64,
}

impl RateContext {
    /// Context with only a distortion set.
    pub fn at_distortion(distortion: f64) -> Self {
        Self {
            distortion,
            site_distance: None,
            node_force: 0.0,
        }
    }
}

/// Tagged rate-law variant. Evaluated by [`RateLaw::rate`] without dynamic dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RateLaw {
    /// Fixed rate in s^-1.
    Constant {
        /// Rate constant.
        rate: f64,
    },
    /// `k0 * exp(sign * distortion / strain_constant)`.
    StrainExponential {
        /// Rate at zero distortion.
        k0: f64,
        /// Direction of the strain dependence, usually +1 or -1.
        sign: f64,
        /// Distortion producing an e-fold change (nm).
        strain_constant: f64,
    },
    /// Gaussian in the distance to the nearest available binding site.
    /// Only legal on attach transitions.
    DistanceDependent {
        /// Rate when the site sits exactly opposite the unit.
        k0: f64,
        /// Stiffness of the bridge link in pN nm^-1.
        stiffness: f64,
    },
    /// `k0 * (1 + max(node_force, 0) * k_force)`.
    ForceDependent {
        /// Rate with an unloaded backbone.
        k0: f64,
        /// Force sensitivity.
        k_force: f64,
    },
    /// `k0 + k1 * (distortion + x_center)^power`.
    Polynomial {
        /// Offset rate.
        k0: f64,
        /// Polynomial coefficient.
        k1: f64,
        /// Integer exponent.
        power: i32,
        /// Centre of the polynomial; the state's extension when absent.
        #[serde(default)]
        x_center: Option<f64>,
    },
}

impl RateLaw {
    /// Short name used in diagnostics and rate tables.
    pub fn name(&self) -> &'static str {
        match self {
            RateLaw::Constant { .. } => "constant",
            RateLaw::StrainExponential { .. } => "strain_exponential",
            RateLaw::DistanceDependent { .. } => "distance_dependent",
            RateLaw::ForceDependent { .. } => "force_dependent",
            RateLaw::Polynomial { .. } => "polynomial",
        }
    }

    /// Parameters in declaration order, used for validation and hashing.
    pub fn parameters(&self) -> Vec<f64> {
        match self {
            RateLaw::Constant { rate } => vec![*rate],
            RateLaw::StrainExponential {
                k0,
                sign,
                strain_constant,
            } => vec![*k0, *sign, *strain_constant],
            RateLaw::DistanceDependent { k0, stiffness } => vec![*k0, *stiffness],
            RateLaw::ForceDependent { k0, k_force } => vec![*k0, *k_force],
            RateLaw::Polynomial {
                k0,
                k1,
                power,
                x_center,
            } => vec![*k0, *k1, *power as f64, x_center.unwrap_or(f64::NAN)],
        }
    }

    /// Checks parameters at load time.
    pub fn validate(&self) -> Result<(), MyoError> {
        let negative = |name: &str, value: f64| -> Result<(), MyoError> {
            if !value.is_finite() {
                return Err(MyoError::Configuration(
                    ErrorInfo::new("non-finite-rate-parameter", "rate parameter must be finite")
                        .with_context("law", self.name())
                        .with_context("parameter", name),
                ));
            }
            if value < 0.0 {
                return Err(MyoError::Configuration(
                    ErrorInfo::new("negative-rate-parameter", "rate parameter is negative")
                        .with_context("law", self.name())
                        .with_context("parameter", name)
                        .with_context("value", value),
                ));
            }
            Ok(())
        };
        match self {
            RateLaw::Constant { rate } => negative("rate", *rate),
            RateLaw::StrainExponential {
                k0,
                sign,
                strain_constant,
            } => {
                negative("k0", *k0)?;
                if !sign.is_finite() {
                    return Err(MyoError::configuration(
                        "non-finite-rate-parameter",
                        "strain sign must be finite",
                    ));
                }
                negative("strain_constant", *strain_constant)?;
                if *strain_constant == 0.0 {
                    return Err(MyoError::Configuration(
                        ErrorInfo::new("zero-strain-constant", "strain constant must be positive")
                            .with_context("law", self.name()),
                    ));
                }
                Ok(())
            }
            RateLaw::DistanceDependent { k0, stiffness } => {
                negative("k0", *k0)?;
                negative("stiffness", *stiffness)
            }
            RateLaw::ForceDependent { k0, k_force } => {
                negative("k0", *k0)?;
                negative("k_force", *k_force)
            }
            RateLaw::Polynomial {
                k0, k1, x_center, ..
            } => {
                negative("k0", *k0)?;
                negative("k1", *k1)?;
                match x_center {
                    Some(center) if !center.is_finite() => Err(MyoError::configuration(
                        "non-finite-rate-parameter",
                        "polynomial centre must be finite",
                    )),
                    _ => Ok(()),
                }
            }
        }
    }

    /// Evaluates the unclamped rate. `extension` is the source state's extension.
    pub fn raw_rate(&self, ctx: &RateContext, extension: f64) -> f64 {
        match self {
            RateLaw::Constant { rate } => *rate,
            RateLaw::StrainExponential {
                k0,
                sign,
                strain_constant,
            } => scaled(*k0, (sign * ctx.distortion / strain_constant).exp()),
            RateLaw::DistanceDependent { k0, stiffness } => match ctx.site_distance {
                Some(x) => k0 * (-(0.5 * stiffness * x * x) / THERMAL_ENERGY).exp(),
                None => 0.0,
            },
            RateLaw::ForceDependent { k0, k_force } => {
                k0 * (1.0 + ctx.node_force.max(0.0) * k_force)
            }
            RateLaw::Polynomial {
                k0,
                k1,
                power,
                x_center,
            } => {
                let center = x_center.unwrap_or(extension);
                k0 + scaled(*k1, (ctx.distortion + center).powi(*power))
            }
        }
    }

    /// Evaluates the rate clamped to `[0, max_rate]`.
    ///
    /// Returns `None` when the raw value is NaN; the caller attaches context.
    pub fn rate(&self, ctx: &RateContext, extension: f64, max_rate: f64) -> Option<f64> {
        let raw = self.raw_rate(ctx, extension);
        if raw.is_nan() {
            return None;
        }
        Some(raw.clamp(0.0, max_rate))
    }
}

/// `coefficient * term` with a zero coefficient silencing an overflowed term.
fn scaled(coefficient: f64, term: f64) -> f64 {
    if coefficient == 0.0 {
        0.0
    } else {
        coefficient * term
    }
}
