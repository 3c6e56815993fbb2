//! Domain-level error taxonomy for bizarena.

use bizarena_state::StorageError;

/// Failures reported by external collaborators (agents, data sources, the
/// judge, the criteria parser, scenarios).
///
/// These are local failures: the engine records them inline on the action or
/// task outcome that produced them instead of aborting the whole run.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// A data source was asked for a query type it does not serve.
    #[error("unknown data type: {0}")]
    UnknownDataType(String),

    /// The call did not finish before the round deadline.
    #[error("round deadline exceeded")]
    DeadlineExceeded,

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CollaboratorError {
    pub fn failed(msg: impl std::fmt::Display) -> Self {
        CollaboratorError::Failed(msg.to_string())
    }
}

/// Result type for collaborator calls.
pub type CollabResult<T> = std::result::Result<T, CollaboratorError>;

/// Errors produced by the scoring model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("no scorable criteria: no weighted criterion appears in the evaluation")]
    NoScorableCriteria,
}

/// bizarena engine errors.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid scenario duration: {0:?}")]
    InvalidDuration(String),

    #[error("invalid criterion {name}: {reason}")]
    InvalidCriterion { name: String, reason: String },

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("scoring error: {0}")]
    Scoring(#[from] ScoringError),

    #[error("round {index} evaluation failed: {reason}")]
    RoundEvaluation { index: usize, reason: String },

    #[error("submission not found: {0}")]
    SubmissionNotFound(String),

    #[error("verification not found: {0}")]
    VerificationNotFound(String),

    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for ArenaError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { submission_id } => ArenaError::SubmissionNotFound(submission_id),
            other => ArenaError::Storage(other),
        }
    }
}

/// Result type for bizarena engine operations.
pub type Result<T> = std::result::Result<T, ArenaError>;
