use crate::dimension::Dim;
use std::sync::Arc;
use thiserror::Error;

/// Location details for a raw definition that failed to parse
#[derive(Debug, Clone, PartialEq)]
pub struct ParseDetails {
    pub message: String,
    pub source_text: Arc<str>,
    pub line: usize,
    pub col: usize,
}

/// Fatal configuration faults.
///
/// Failures that belong to the evaluated program (type errors, undefined
/// variables, ambiguous definitions, ...) are never reported here; they flow
/// as [`crate::Special`] values. These variants are only for faults the
/// caller of `install_equation`/`resolve` has to fix.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContourError {
    /// Raw definition text could not be parsed
    #[error("Parse error: {} at {}:{}", .0.message, .0.line, .0.col)]
    Parse(Box<ParseDetails>),

    /// Parsed definition could not be lowered to a compiled expression
    #[error("Semantic error: {0}")]
    Semantic(String),

    /// Guard is not a tuple literal after fix-up
    #[error("Malformed guard: {0}")]
    MalformedGuard(String),

    /// A structurally referenced dimension name is not known
    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    /// Priority in a guard is not a constant integer
    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    /// Installation requested at a logical time before the newest generation
    #[error("Cannot install at time {requested}: newest generation starts at {latest}")]
    TimeRegression { requested: i64, latest: i64 },

    /// `delta` is not a restriction of `kappa`
    #[error("Known context binds dimension {0} inconsistently with the full context")]
    InconsistentContexts(Dim),

    /// Resource limit exceeded
    #[error("Resource limit exceeded: {limit_name} (limit: {limit_value}, actual: {actual_value}). {suggestion}")]
    ResourceLimitExceeded {
        limit_name: String,
        limit_value: String,
        actual_value: String,
        suggestion: String,
    },

    /// Engine error without a more specific category
    #[error("Engine error: {0}")]
    Engine(String),
}

impl ContourError {
    /// Create a parse error with source position
    pub fn parse(
        message: impl Into<String>,
        source_text: impl Into<Arc<str>>,
        line: usize,
        col: usize,
    ) -> Self {
        Self::Parse(Box::new(ParseDetails {
            message: message.into(),
            source_text: source_text.into(),
            line,
            col,
        }))
    }

    /// Create a resource limit error
    pub fn limit_exceeded(
        limit_name: impl Into<String>,
        limit_value: impl ToString,
        actual_value: impl ToString,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::ResourceLimitExceeded {
            limit_name: limit_name.into(),
            limit_value: limit_value.to_string(),
            actual_value: actual_value.to_string(),
            suggestion: suggestion.into(),
        }
    }
}
