//! Validated kinetic scheme and per-state propensity evaluation.

use myo_core::{ErrorInfo, MyoError, SchemaVersion, StateId};
use serde::{Deserialize, Serialize};

use crate::rate::RateContext;
use crate::state::{State, StateKind};
use crate::transition::{Transition, TransitionKind, TransitionSpec};

/// Scheme-wide parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeParams {
    /// Upper clamp applied to every evaluated rate (s^-1).
    #[serde(default = "default_max_rate")]
    pub max_rate: f64,
    /// Distortion assigned to a unit when it detaches (nm).
    #[serde(default)]
    pub reset_distortion: f64,
    /// State every unit starts in.
    #[serde(default = "default_initial_state")]
    pub initial_state: StateId,
}

fn default_max_rate() -> f64 {
    5000.0
}

fn default_initial_state() -> StateId {
    StateId::from_raw(0)
}

impl Default for SchemeParams {
    fn default() -> Self {
        Self {
            max_rate: default_max_rate(),
            reset_distortion: 0.0,
            initial_state: default_initial_state(),
        }
    }
}

/// Immutable, validated set of states and transitions shared read-only by every unit.
#[derive(Debug, Clone, PartialEq)]
pub struct KineticScheme {
    states: Vec<State>,
    transitions: Vec<Transition>,
    outgoing: Vec<Vec<usize>>,
    params: SchemeParams,
    schema_version: SchemaVersion,
}

impl KineticScheme {
    /// Validates and builds a scheme.
    ///
    /// States must be listed in identifier order starting at zero. Transition
    /// order is preserved and defines tie-break order during selection.
    pub fn new(
        states: Vec<State>,
        transitions: Vec<TransitionSpec>,
        params: SchemeParams,
    ) -> Result<Self, MyoError> {
        if states.is_empty() {
            return Err(MyoError::configuration(
                "empty-scheme",
                "kinetic scheme must declare at least one state",
            ));
        }
        for (position, state) in states.iter().enumerate() {
            if state.id.index() != position {
                return Err(MyoError::Configuration(
                    ErrorInfo::new("state-index-mismatch", "state identifiers must be dense")
                        .with_context("position", position)
                        .with_context("state", state.id),
                ));
            }
            if !state.extension.is_finite() {
                return Err(MyoError::Configuration(
                    ErrorInfo::new("non-finite-extension", "state extension must be finite")
                        .with_context("state", state.id),
                ));
            }
        }
        if !(params.max_rate.is_finite() && params.max_rate >= 0.0) {
            return Err(MyoError::Configuration(
                ErrorInfo::new("invalid-max-rate", "max_rate must be finite and non-negative")
                    .with_context("max_rate", params.max_rate),
            ));
        }
        if !params.reset_distortion.is_finite() {
            return Err(MyoError::configuration(
                "invalid-reset-distortion",
                "reset distortion must be finite",
            ));
        }
        let unknown = |id: StateId, role: &str| {
            MyoError::Configuration(
                ErrorInfo::new("unknown-state", "transition references an unknown state")
                    .with_context("state", id)
                    .with_context("role", role)
                    .with_hint("declare the state before referencing it"),
            )
        };
        if params.initial_state.index() >= states.len() {
            return Err(unknown(params.initial_state, "initial"));
        }
        if states[params.initial_state.index()].kind.is_attached() {
            return Err(MyoError::Configuration(
                ErrorInfo::new(
                    "attached-initial-state",
                    "initial state must not be an attached state",
                )
                .with_context("state", params.initial_state)
                .with_hint("units start unbound; pick a detached or off state"),
            ));
        }

        let mut outgoing = vec![Vec::new(); states.len()];
        let mut built = Vec::with_capacity(transitions.len());
        for (index, spec) in transitions.into_iter().enumerate() {
            let from = states
                .get(spec.from.index())
                .ok_or_else(|| unknown(spec.from, "from"))?;
            let to = states
                .get(spec.to.index())
                .ok_or_else(|| unknown(spec.to, "to"))?;
            spec.law.validate().map_err(|err| match err {
                MyoError::Configuration(info) => {
                    MyoError::Configuration(info.with_context("transition", index))
                }
                other => other,
            })?;
            let kind = TransitionKind::between(from.kind, to.kind);
            if matches!(spec.law, crate::RateLaw::DistanceDependent { .. })
                && kind != TransitionKind::Attach
            {
                return Err(MyoError::Configuration(
                    ErrorInfo::new(
                        "distance-law-not-attach",
                        "distance dependent rates are only valid on attach transitions",
                    )
                    .with_context("transition", index),
                ));
            }
            outgoing[spec.from.index()].push(built.len());
            built.push(Transition {
                from: spec.from,
                to: spec.to,
                law: spec.law,
                kind,
            });
        }

        Ok(Self {
            states,
            transitions: built,
            outgoing,
            params,
            schema_version: SchemaVersion::default(),
        })
    }

    /// All states in identifier order.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// All transitions in definition order.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Scheme-wide parameters.
    pub fn params(&self) -> &SchemeParams {
        &self.params
    }

    /// Version of the document format this scheme was built for.
    pub fn schema_version(&self) -> SchemaVersion {
        self.schema_version
    }

    pub(crate) fn set_schema_version(&mut self, version: SchemaVersion) {
        self.schema_version = version;
    }

    /// Looks a state up by identifier.
    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id.index())
    }

    /// True when `id` names a state of this scheme.
    pub fn contains(&self, id: StateId) -> bool {
        id.index() < self.states.len()
    }

    /// Category of the given state, if it exists.
    pub fn kind_of(&self, id: StateId) -> Option<StateKind> {
        self.state(id).map(|state| state.kind)
    }

    /// Transitions leaving `state`, in definition order.
    pub fn outgoing(&self, state: StateId) -> impl Iterator<Item = &Transition> + '_ {
        self.outgoing_indices(state)
            .iter()
            .map(move |&idx| &self.transitions[idx])
    }

    /// Indices into [`KineticScheme::transitions`] of the transitions leaving `state`.
    pub fn outgoing_indices(&self, state: StateId) -> &[usize] {
        self.outgoing
            .get(state.index())
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Initial state for every unit.
    pub fn initial_state(&self) -> StateId {
        self.params.initial_state
    }

    /// Distortion assigned on detachment.
    pub fn reset_distortion(&self) -> f64 {
        self.params.reset_distortion
    }

    /// Rate clamp.
    pub fn max_rate(&self) -> f64 {
        self.params.max_rate
    }

    /// Evaluates every outgoing transition of `state` in definition order.
    ///
    /// Rates are clamped to `[0, max_rate]`. A NaN rate yields a numeric error
    /// naming the state and transition.
    pub fn evaluate(
        &self,
        state: StateId,
        ctx: &RateContext,
    ) -> Result<Vec<(StateId, f64)>, MyoError> {
        let mut out = Vec::new();
        self.evaluate_into(state, ctx, &mut out)?;
        Ok(out)
    }

    /// Buffer-reusing form of [`KineticScheme::evaluate`].
    pub fn evaluate_into(
        &self,
        state: StateId,
        ctx: &RateContext,
        out: &mut Vec<(StateId, f64)>,
    ) -> Result<(), MyoError> {
        out.clear();
        let source = self.state(state).ok_or_else(|| {
            MyoError::Consistency(
                ErrorInfo::new("unknown-state", "unit holds a state outside the scheme")
                    .with_context("state", state),
            )
        })?;
        for (position, transition) in self.outgoing(state).enumerate() {
            let rate = transition
                .law
                .rate(ctx, source.extension, self.params.max_rate)
                .ok_or_else(|| {
                    MyoError::Numeric(
                        ErrorInfo::new("non-finite-rate", "rate law evaluated to NaN")
                            .with_context("state", state)
                            .with_context("transition", position)
                            .with_context("law", transition.law.name())
                            .with_context("distortion", ctx.distortion),
                    )
                })?;
            out.push((transition.to, rate));
        }
        Ok(())
    }

    /// Sum of outgoing rates; zero for states with no outgoing transitions.
    pub fn propensity(&self, state: StateId, ctx: &RateContext) -> Result<f64, MyoError> {
        Ok(self.evaluate(state, ctx)?.iter().map(|(_, rate)| rate).sum())
    }

    /// True when any outgoing transition of `state` reads the site distance.
    pub fn needs_site_distance(&self, state: StateId) -> bool {
        self.outgoing(state)
            .any(|t| matches!(t.law, crate::RateLaw::DistanceDependent { .. }))
    }

    /// True when any outgoing transition of `state` requires a free site.
    pub fn has_attach(&self, state: StateId) -> bool {
        self.outgoing(state).any(Transition::requires_site)
    }
}
