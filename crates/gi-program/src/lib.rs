//! GI Program - program representations for genetic improvement
//!
//! Parses target files at a chosen granularity and exposes their
//! modification points to structural edits:
//! - Line granularity: one point per source line
//! - Statement granularity: tree-sitter statement nodes, source-exact
//! - Markup granularity: every element of a generic mixed-content tree
//!
//! # Core Concepts
//!
//! - [`Engine`]: parsing, rendering and surgery for one granularity
//! - [`Program`]: the parsed, immutable original
//! - [`Edit`] / [`Patch`]: value objects naming operations by point index
//! - [`Variant`]: copy-on-write working copy produced by applying a patch
//!
//! # Example
//!
//! ```rust,ignore
//! use gi_program::{Edit, LineEngine, Patch, Program, Target};
//!
//! let program = Program::from_sources(LineEngine, [("main.c", "a\nb\nc\n")])?;
//! let patch = Patch::from(vec![Edit::delete(Target::new("main.c", 1))]);
//! let variant = program.apply(&patch)?;
//! assert_eq!(variant.render_file("main.c").unwrap(), "a\n\nc\n");
//! ```

pub mod edit;
pub mod engine;
pub mod error;
pub mod line;
pub mod markup;
pub mod patch;
pub mod path;
pub mod program;
pub mod signature;
pub mod statement;
pub mod tree;

pub use edit::{Edit, EditKind, Target};
pub use engine::{Engine, Placement, Sheet};
pub use error::{EditError, ProgramError};
pub use line::LineEngine;
pub use markup::{MarkupEngine, MarkupError};
pub use patch::Patch;
pub use path::{NodePath, PathStep};
pub use program::{PointInfo, PointSelection, Program, RenderedFile, Variant};
pub use signature::PatchSignature;
pub use statement::{Language, StatementEngine};
pub use tree::Node;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
