//! Error types for attribute resolution

use thiserror::Error;

/// Attribute resolution error type
///
/// Only configuration and loading problems surface here. Failures of a single
/// attribute source are absorbed by the fan-out and never reach callers.
#[derive(Error, Debug)]
pub enum AttributeError {
    /// Invalid repository configuration
    #[error("config error: {0}")]
    Config(String),

    /// Unknown merge policy name
    #[error("unknown merge policy: {0}")]
    UnknownMergePolicy(String),

    /// Unknown case canonicalization mode
    #[error("unknown case canonicalization mode: {0}")]
    UnknownCanonicalization(String),

    /// Malformed configuration or attribute document
    #[error("parse error: {0}")]
    Parse(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for AttributeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type for attribute resolution
pub type AttributeResult<T> = Result<T, AttributeError>;
