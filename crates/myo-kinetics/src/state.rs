use myo_core::StateId;
use serde::{Deserialize, Serialize};

/// Category of a cross-bridge state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// Parked, unavailable for binding without first leaving this state.
    SuperRelaxed,
    /// Detached but able to bind.
    Detached,
    /// Bound to a binding site on a thin filament.
    Attached,
}

impl StateKind {
    /// Returns true when units in this state occupy a binding site.
    pub fn is_attached(&self) -> bool {
        matches!(self, StateKind::Attached)
    }

    pub(crate) fn tag(&self) -> &'static [u8] {
        match self {
            StateKind::SuperRelaxed => b"S",
            StateKind::Detached => b"D",
            StateKind::Attached => b"A",
        }
    }
}

/// A discrete state of the kinetic scheme. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Scheme-local identifier; equal to the state's position in the scheme.
    pub id: StateId,
    /// Human readable label.
    pub label: String,
    /// Attachment category.
    pub kind: StateKind,
    /// Power-stroke extension added to the bridge distortion while in this state (nm).
    pub extension: f64,
}

impl State {
    /// Creates a state with zero extension.
    pub fn new(id: u32, label: impl Into<String>, kind: StateKind) -> Self {
        Self {
            id: StateId::from_raw(id),
            label: label.into(),
            kind,
            extension: 0.0,
        }
    }

    /// Sets the power-stroke extension.
    pub fn with_extension(mut self, extension: f64) -> Self {
        self.extension = extension;
        self
    }
}
