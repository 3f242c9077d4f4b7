//! Error types for program representations and edits
//!
//! - [`ProgramError`]: loading/parsing failures, fatal at startup
//! - [`EditError`]: an edit that cannot be applied; aborts its whole patch

use std::path::PathBuf;

use crate::edit::{EditKind, Target};
use crate::markup::MarkupError;

/// Failure to build a program representation
#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    /// Reading a target file failed
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Markup target is malformed
    #[error("failed to parse {file}: {source}")]
    Markup {
        /// Target file
        file: String,
        /// Reader error
        #[source]
        source: MarkupError,
    },

    /// Source file does not parse cleanly
    #[error("syntax error in {file}")]
    Syntax {
        /// Target file
        file: String,
    },

    /// No statement grammar for this file
    #[error("unsupported language for {0}")]
    UnsupportedLanguage(String),

    /// Tree-sitter parser could not be set up
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    /// Program was given no target files
    #[error("no target files")]
    NoTargets,

    /// Weight table does not match the file's points
    #[error("invalid weights for {file}: {reason}")]
    InvalidWeights {
        /// Target file
        file: String,
        /// What was wrong
        reason: String,
    },

    /// File is not one of the program's targets
    #[error("unknown target file: {0}")]
    UnknownFile(String),
}

impl ProgramError {
    /// Create I/O error for a path
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure to apply one edit
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// Edit names a file the program does not have
    #[error("unknown target file: {0}")]
    UnknownFile(String),

    /// Point index beyond the file's point table
    #[error("point {target} out of range ({len} points)")]
    OutOfRange {
        /// Offending point
        target: Target,
        /// Size of the point table
        len: usize,
    },

    /// Point was removed by an earlier edit in the same patch
    #[error("point {0} no longer resolves")]
    Unresolved(Target),

    /// Kind needs an ingredient but none was given
    #[error("{0} requires an ingredient")]
    MissingIngredient(EditKind),

    /// Ingredient cannot stand in for the target
    #[error("ingredient {ingredient} is incompatible with target {target}")]
    Incompatible {
        /// Target point
        target: Target,
        /// Ingredient point
        ingredient: Target,
    },

    /// One point contains the other
    #[error("points {outer} and {inner} overlap")]
    Overlap {
        /// Enclosing point
        outer: Target,
        /// Enclosed point
        inner: Target,
    },
}
