use myo_core::StateId;
use serde::{Deserialize, Serialize};

use crate::rate::RateLaw;
use crate::state::StateKind;

/// Lattice effect of a transition, derived from the categories of its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Detached-like to attached: requires a binding site.
    Attach,
    /// Attached to detached-like: releases the bound site.
    Detach,
    /// No change in occupancy.
    Neutral,
}

impl TransitionKind {
    /// Derives the kind from the source and target categories.
    pub fn between(from: StateKind, to: StateKind) -> Self {
        match (from.is_attached(), to.is_attached()) {
            (false, true) => TransitionKind::Attach,
            (true, false) => TransitionKind::Detach,
            _ => TransitionKind::Neutral,
        }
    }
}

/// A directed transition between two states. Immutable once the scheme is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Source state.
    pub from: StateId,
    /// Target state.
    pub to: StateId,
    /// Rate law governing the transition.
    pub law: RateLaw,
    /// Derived occupancy effect.
    pub kind: TransitionKind,
}

impl Transition {
    /// True when firing the transition needs an available binding site.
    pub fn requires_site(&self) -> bool {
        self.kind == TransitionKind::Attach
    }
}

/// Unvalidated transition description supplied to [`crate::KineticScheme::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionSpec {
    /// Source state.
    pub from: StateId,
    /// Target state.
    pub to: StateId,
    /// Rate law.
    pub law: RateLaw,
}

impl TransitionSpec {
    /// Convenience constructor from raw state indices.
    pub fn new(from: u32, to: u32, law: RateLaw) -> Self {
        Self {
            from: StateId::from_raw(from),
            to: StateId::from_raw(to),
            law,
        }
    }
}
