//! Error types for search runs

use gi_eval::{Stage, Status};

/// Failure that ends a search run
///
/// Per-patch failures never surface here; they are recorded as non-viable
/// and the search moves on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    /// The starting patch did not evaluate to a fitness
    #[error("initial patch is not viable ({status} at {stage:?})")]
    InitialNotViable {
        /// Outcome class
        status: Status,
        /// Failing stage
        stage: Option<Stage>,
    },

    /// The mutation operator could not produce any edit
    #[error("no valid edit could be created")]
    NoEdit,

    /// Algorithm or operator parameters are out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unknown algorithm name
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),
}

impl SearchError {
    /// Create configuration error
    #[inline]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}

/// Result alias for search operations
pub type Result<T> = std::result::Result<T, SearchError>;
