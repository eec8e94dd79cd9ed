use myo_core::{ErrorInfo, MyoError, SchemaVersion, StateId};
use serde::{Deserialize, Serialize};

use crate::rate::RateLaw;
use crate::scheme::{KineticScheme, SchemeParams};
use crate::state::{State, StateKind};
use crate::transition::TransitionSpec;

/// Newest document major version this crate reads.
pub const SCHEME_SCHEMA_MAJOR: u32 = 1;

/// Serializable form of a kinetic scheme. State identifiers are implied by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeDocument {
    /// Document format version.
    #[serde(default)]
    pub schema_version: SchemaVersion,
    /// Scheme-wide parameters.
    #[serde(default)]
    pub params: SchemeParams,
    /// States in identifier order, each with its outgoing transitions.
    pub states: Vec<StateDocument>,
}

/// Serializable state entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    /// Human readable label.
    pub label: String,
    /// Attachment category.
    pub kind: StateKind,
    /// Power-stroke extension (nm).
    #[serde(default)]
    pub extension: f64,
    /// Outgoing transitions in definition order.
    #[serde(default)]
    pub transitions: Vec<TransitionDocument>,
}

/// Serializable transition entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDocument {
    /// Target state index.
    pub to: u32,
    /// Rate law.
    pub law: RateLaw,
}

impl SchemeDocument {
    /// Validates the document and builds the scheme.
    pub fn into_scheme(self) -> Result<KineticScheme, MyoError> {
        if self.schema_version.major != SCHEME_SCHEMA_MAJOR {
            return Err(MyoError::Serde(
                ErrorInfo::new("unsupported-schema", "scheme document version is not supported")
                    .with_context("major", self.schema_version.major),
            ));
        }
        let mut states = Vec::with_capacity(self.states.len());
        let mut transitions = Vec::new();
        for (index, entry) in self.states.into_iter().enumerate() {
            let id = index as u32;
            for transition in entry.transitions {
                transitions.push(TransitionSpec {
                    from: StateId::from_raw(id),
                    to: StateId::from_raw(transition.to),
                    law: transition.law,
                });
            }
            states.push(State::new(id, entry.label, entry.kind).with_extension(entry.extension));
        }
        let mut scheme = KineticScheme::new(states, transitions, self.params)?;
        scheme.set_schema_version(self.schema_version);
        Ok(scheme)
    }

    /// Captures an existing scheme.
    pub fn from_scheme(scheme: &KineticScheme) -> Self {
        let states = scheme
            .states()
            .iter()
            .map(|state| StateDocument {
                label: state.label.clone(),
                kind: state.kind,
                extension: state.extension,
                transitions: scheme
                    .outgoing(state.id)
                    .map(|t| TransitionDocument {
                        to: t.to.as_raw(),
                        law: t.law.clone(),
                    })
                    .collect(),
            })
            .collect();
        Self {
            schema_version: scheme.schema_version(),
            params: scheme.params().clone(),
            states,
        }
    }
}

/// Serializes a scheme to pretty JSON.
pub fn to_json(scheme: &KineticScheme) -> Result<String, MyoError> {
    serde_json::to_string_pretty(&SchemeDocument::from_scheme(scheme))
        .map_err(|err| MyoError::Serde(ErrorInfo::new("json-serialize", err.to_string())))
}

/// Loads and validates a scheme from JSON.
pub fn from_json(data: &str) -> Result<KineticScheme, MyoError> {
    let document: SchemeDocument = serde_json::from_str(data)
        .map_err(|err| MyoError::Serde(ErrorInfo::new("json-deserialize", err.to_string())))?;
    document.into_scheme()
}
