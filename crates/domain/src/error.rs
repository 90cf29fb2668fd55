//! Domain error types.

use thiserror::Error;

/// Errors raised while interpreting domain data.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A category name that no variant answers to.
    #[error("Unknown process category: {0}")]
    UnknownCategory(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
