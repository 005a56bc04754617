//! Engine error types.

use thiserror::Error;

use crate::store::StoreError;

/// Result type alias for engine operations.
pub type ReviewResult<T> = Result<T, ReviewError>;

/// Errors returned by the review engine.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The requested state change is not allowed.
    #[error("invalid {entity} transition from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// The rotation pointer changed between read and commit.
    #[error("concurrent rotation update for team {team}: expected version {expected}, found {actual}")]
    ConcurrentUpdate {
        team: String,
        expected: u64,
        actual: u64,
    },

    /// The team does not use this review result.
    #[error("team {team} has no review result '{result}'")]
    UnknownResult { team: String, result: String },

    /// A reviewer filter pattern does not compile.
    #[error("invalid filter pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

impl ReviewError {
    /// Create a not-found error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create an invalid-transition error.
    pub fn invalid_transition(
        entity: &'static str,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Whether retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentUpdate { .. })
    }
}

impl From<StoreError> for ReviewError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VersionConflict {
                team,
                expected,
                actual,
            } => Self::ConcurrentUpdate {
                team,
                expected,
                actual,
            },
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Store(other),
        }
    }
}
