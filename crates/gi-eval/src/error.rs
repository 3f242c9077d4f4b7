//! Error types for the evaluation harness
//!
//! Descriptor errors are fatal at startup. Staging and spawn errors are
//! folded into a non-viable [`Evaluation`](crate::Evaluation) by the
//! harness and never reach the search.

use std::path::PathBuf;

/// Evaluation harness failure
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Filesystem operation failed
    #[error("io error at {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed while staging
    #[error("failed to walk project tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// Child process could not be started
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        /// Shell command
        command: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Descriptor file has an unknown extension
    #[error("unsupported descriptor format: {0}")]
    DescriptorFormat(PathBuf),

    /// Descriptor TOML is malformed
    #[error("invalid descriptor: {0}")]
    Toml(#[from] toml::de::Error),

    /// Descriptor JSON is malformed
    #[error("invalid descriptor: {0}")]
    Json(#[from] serde_json::Error),

    /// Descriptor parsed but is unusable
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// Output parser pattern failed to compile
    #[error("invalid output pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Target files could not be loaded
    #[error(transparent)]
    Program(#[from] gi_program::ProgramError),
}

impl EvalError {
    /// Create I/O error for a path
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create descriptor validation error
    #[inline]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor(reason.into())
    }
}

/// Result alias for harness operations
pub type Result<T> = std::result::Result<T, EvalError>;
