// SPDX-License-Identifier: MIT

//! Typed error handling for faultgraph-rs
//!
//! Compilation failures propagate to the caller. Evaluation failures
//! (`UnknownOperator`, `DataSourceFailure`, `PredicateFailure`) are raised by
//! the operator layer and downgraded by the engine to "no activation".

use thiserror::Error;

/// Top-level error type for faultgraph-rs
#[derive(Debug, Error)]
pub enum FaultGraphError {
    /// Unbalanced or unparseable condition text
    #[error("Malformed expression '{expression}': {reason}")]
    MalformedExpression { expression: String, reason: String },

    /// Operator binding that has no registered callable
    #[error("Unknown operator '{name}'")]
    UnknownOperator { name: String },

    /// Data-source call failed while reading an indicator
    #[error("Data source '{name}' failed: {message}")]
    DataSourceFailure { name: String, message: String },

    /// Predicate or transform call failed while evaluating an edge
    #[error("Operator '{name}' failed: {message}")]
    PredicateFailure { name: String, message: String },

    /// Configuration errors (invalid id ranges, unsupported files)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Error raised from inside an operator callable.
///
/// Fixtures and integrations only need to describe what went wrong; the
/// engine attaches the operator name when it wraps this into a
/// [`FaultGraphError`].
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{0}")]
pub struct OperatorError(pub String);

impl OperatorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for OperatorError {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for OperatorError {
    fn from(s: String) -> Self {
        Self(s)
    }
}

pub type Result<T> = std::result::Result<T, FaultGraphError>;

/// Result type returned by operator callables
pub type OperatorResult<T> = std::result::Result<T, OperatorError>;

impl FaultGraphError {
    /// Create a malformed expression error
    pub fn malformed(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedExpression {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown operator error
    pub fn unknown_operator(name: impl Into<String>) -> Self {
        Self::UnknownOperator { name: name.into() }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
