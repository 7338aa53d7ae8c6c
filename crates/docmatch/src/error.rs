//! Error types for the matcher.

use thiserror::Error;

/// Errors that can occur while building values or evaluating a query.
#[derive(Debug, Error)]
pub enum MatchError {
    /// A set operator was given something other than an array.
    #[error("cannot use the {op} operator with a non-array argument ({found})")]
    InvalidOperatorArgument {
        op: &'static str,
        found: &'static str,
    },

    /// The query nests deeper than the matcher allows.
    #[error("query nesting exceeds the maximum depth of {limit}")]
    DepthExceeded { limit: usize },

    /// Invalid regular expression pattern.
    #[error("invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Malformed JSON text.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Result type for matcher operations.
pub type Result<T> = std::result::Result<T, MatchError>;
