//! GI Eval - fitness evaluation for patched programs
//!
//! Stages a patched program into a scratch copy of its project, builds
//! and runs it under hard timeouts, and reads a fitness value from what
//! it prints.
//!
//! # Core Concepts
//!
//! - [`Evaluator`]: the seam between search and measurement
//! - [`Harness`]: the external-command evaluator
//! - [`ProjectDescriptor`]: project layout, commands and fitness source
//! - [`OutputParser`]: tagged block, named counter, elapsed time, pass/fail
//! - [`TruthTable`]: first-seen pass/fail per test instance

pub mod cache;
pub mod descriptor;
pub mod error;
pub mod evaluation;
pub mod harness;
pub mod output;
pub mod process;
pub mod scratch;
pub mod truth;

pub use cache::EvaluationCache;
pub use descriptor::{FitnessSpec, ProjectDescriptor, DEFAULT_DESCRIPTOR, INSTANCE_PLACEHOLDER};
pub use error::{EvalError, Result};
pub use evaluation::{Evaluation, Evaluator, Stage, Status};
pub use harness::Harness;
pub use output::{ElapsedTime, NamedCounter, OutputParser, PassFail, TaggedBlock};
pub use process::{run_shell, Outcome, RunOutput};
pub use scratch::Scratch;
pub use truth::{TruthTable, Verdict};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
