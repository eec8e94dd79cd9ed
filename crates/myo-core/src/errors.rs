//! Structured error types shared across the myo crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`MyoError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (unit index, state, iteration counts, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the half-sarcomere engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum MyoError {
    /// Invalid scheme, geometry or options, detected before any step runs.
    #[error("configuration error: {0}")]
    Configuration(ErrorInfo),
    /// Mechanical solve or force search exceeded its iteration cap.
    #[error("convergence error: {0}")]
    Convergence(ErrorInfo),
    /// Rate evaluation produced a non-finite value.
    #[error("numeric error: {0}")]
    Numeric(ErrorInfo),
    /// Internal invariant violated (occupancy, state membership).
    #[error("consistency error: {0}")]
    Consistency(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl MyoError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            MyoError::Configuration(info)
            | MyoError::Convergence(info)
            | MyoError::Numeric(info)
            | MyoError::Consistency(info)
            | MyoError::Serde(info) => info,
        }
    }

    /// Returns true for errors that indicate an internal bug rather than bad input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MyoError::Consistency(_))
    }

    /// Shorthand for a configuration error.
    pub fn configuration(code: &str, message: impl Into<String>) -> Self {
        MyoError::Configuration(ErrorInfo::new(code, message))
    }

    /// Shorthand for a consistency error.
    pub fn consistency(code: &str, message: impl Into<String>) -> Self {
        MyoError::Consistency(ErrorInfo::new(code, message))
    }
}
