//! Centralized error types for the sports graph pipeline.

use thiserror::Error;

/// Main error type for model, construction and archive operations.
#[derive(Error, Debug)]
pub enum SportsError {
    #[error("Malformed event document: {0}")]
    MalformedEvent(#[source] serde_json::Error),

    #[error("Missing required field: {path}")]
    MissingField { path: String },

    #[error("Edge {relation} references unknown node(s): {from} -> {to}")]
    DanglingEdge {
        relation: String,
        from: i64,
        to: i64,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for sports graph operations.
pub type SportsResult<T> = Result<T, SportsError>;

impl SportsError {
    /// Create a missing field error.
    pub fn missing(path: impl Into<String>) -> Self {
        Self::MissingField { path: path.into() }
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }
}
