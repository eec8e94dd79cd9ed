use myo_core::{ErrorInfo, MyoError};
use serde::{Deserialize, Serialize};

/// Structural description of a half-sarcomere lattice.
///
/// Positions are measured in nm from the Z-disc (x = 0) toward the M-line
/// (x = half-sarcomere length).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Number of thick filaments.
    #[serde(default = "default_thick_filaments")]
    pub thick_filaments: usize,
    /// Number of thin filaments.
    #[serde(default = "default_thin_filaments")]
    pub thin_filaments: usize,
    /// Cross-bridge bearing nodes per thick filament.
    #[serde(default = "default_nodes_per_thick")]
    pub nodes_per_thick: usize,
    /// Regulatory units per thin filament.
    #[serde(default = "default_regulatory_units")]
    pub regulatory_units_per_thin: usize,
    /// Binding sites per regulatory unit.
    #[serde(default = "default_sites_per_unit")]
    pub sites_per_unit: usize,
    /// Rest spacing between thick filament nodes (nm).
    #[serde(default = "default_thick_spacing")]
    pub thick_node_spacing: f64,
    /// Rest spacing between thin filament binding sites (nm).
    #[serde(default = "default_thin_spacing")]
    pub thin_site_spacing: f64,
    /// Rest length of the bare zone between the M-line and the first thick node (nm).
    #[serde(default = "default_bare_zone")]
    pub bare_zone: f64,
    /// Thin filaments faced by each thick filament.
    #[serde(default = "default_thin_per_thick")]
    pub thin_per_thick: usize,
    /// Half-sarcomere length at initialization (nm).
    #[serde(default = "default_initial_length")]
    pub initial_length: f64,
}

fn default_thick_filaments() -> usize {
    4
}

fn default_thin_filaments() -> usize {
    8
}

fn default_nodes_per_thick() -> usize {
    54
}

fn default_regulatory_units() -> usize {
    27
}

fn default_sites_per_unit() -> usize {
    7
}

fn default_thick_spacing() -> f64 {
    13.5
}

fn default_thin_spacing() -> f64 {
    5.375
}

fn default_bare_zone() -> f64 {
    80.0
}

fn default_thin_per_thick() -> usize {
    2
}

fn default_initial_length() -> f64 {
    1100.0
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            thick_filaments: default_thick_filaments(),
            thin_filaments: default_thin_filaments(),
            nodes_per_thick: default_nodes_per_thick(),
            regulatory_units_per_thin: default_regulatory_units(),
            sites_per_unit: default_sites_per_unit(),
            thick_node_spacing: default_thick_spacing(),
            thin_site_spacing: default_thin_spacing(),
            bare_zone: default_bare_zone(),
            thin_per_thick: default_thin_per_thick(),
            initial_length: default_initial_length(),
        }
    }
}

fn malformed(field: &str, message: &str) -> MyoError {
    MyoError::Configuration(
        ErrorInfo::new("malformed-geometry", message).with_context("field", field),
    )
}

impl Geometry {
    /// Checks counts and spacings before the lattice is built.
    pub fn validate(&self) -> Result<(), MyoError> {
        let counts = [
            ("thick_filaments", self.thick_filaments),
            ("thin_filaments", self.thin_filaments),
            ("nodes_per_thick", self.nodes_per_thick),
            ("regulatory_units_per_thin", self.regulatory_units_per_thin),
            ("sites_per_unit", self.sites_per_unit),
            ("thin_per_thick", self.thin_per_thick),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(malformed(field, "count must be at least one"));
            }
        }
        if self.thin_per_thick > self.thin_filaments {
            return Err(malformed(
                "thin_per_thick",
                "a thick filament cannot face more thin filaments than exist",
            ));
        }
        let lengths = [
            ("thick_node_spacing", self.thick_node_spacing),
            ("thin_site_spacing", self.thin_site_spacing),
            ("initial_length", self.initial_length),
        ];
        for (field, value) in lengths {
            if !(value.is_finite() && value > 0.0) {
                return Err(malformed(field, "length must be finite and positive"));
            }
        }
        if !(self.bare_zone.is_finite() && self.bare_zone >= 0.0) {
            return Err(malformed("bare_zone", "bare zone must be finite and non-negative"));
        }
        Ok(())
    }

    /// Binding sites on one thin filament.
    pub fn sites_per_thin(&self) -> usize {
        self.regulatory_units_per_thin * self.sites_per_unit
    }

    /// Cross-bridge units in the half-sarcomere.
    pub fn total_units(&self) -> usize {
        self.thick_filaments * self.nodes_per_thick
    }

    /// Binding sites in the half-sarcomere.
    pub fn total_sites(&self) -> usize {
        self.thin_filaments * self.sites_per_thin()
    }

    /// Thin filaments faced by thick filament `thick`, in ascending offset order.
    pub fn faced_thin(&self, thick: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.thin_per_thick).map(move |offset| (thick + offset) % self.thin_filaments)
    }

    /// Rest position of thick node `node` for a half-sarcomere of length `length`.
    pub fn thick_rest_position(&self, length: f64, node: usize) -> f64 {
        length - self.bare_zone - node as f64 * self.thick_node_spacing
    }

    /// Rest position of the `site`-th binding site along a thin filament.
    pub fn thin_rest_position(&self, site: usize) -> f64 {
        (site + 1) as f64 * self.thin_site_spacing
    }
}
