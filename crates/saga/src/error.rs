//! Saga error types.
//!
//! These are infrastructure errors only. Business failures travel as
//! [`domain::Outcome::Failure`] and never become a `SagaError`.

use event_store::EventStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SagaError {
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The engine is stopping; the instance stays pending and resumes on
    /// the next recovery.
    #[error("Engine is shutting down")]
    ShuttingDown,

    #[error("Process instance not found: {0}")]
    InstanceNotFound(String),

    /// A stream exists but holds no start record to replay from.
    #[error("Process instance {0} has no start record")]
    MissingStart(String),

    #[error("Incomplete event envelope for {0}")]
    IncompleteEnvelope(String),
}

impl SagaError {
    pub fn is_shutdown(&self) -> bool {
        matches!(self, SagaError::ShuttingDown)
    }
}

pub type Result<T> = std::result::Result<T, SagaError>;

/// Outcome of a stage, wrapped in the infrastructure error channel.
pub type StageResult<T> = Result<domain::ProcessResult<T>>;
