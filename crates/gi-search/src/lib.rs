//! GI Search - metaheuristics over the patch space
//!
//! Searches for the patch with the lowest fitness. Each algorithm drives a
//! [`SearchContext`], which memoizes outcomes, tracks the best patch and
//! decides when to stop.
//!
//! # Core Concepts
//!
//! - [`dominates`]: the fitness order; a non-viable patch is always worst
//! - [`Mutator`]: neighbourhood and crossover operators
//! - [`Algorithm`]: random search, iterated local search, tabu search and
//!   genetic programming
//! - [`StopCondition`]: time budget, target fitness and step caps
//! - [`SearchReport`]: outcome of a run
//!
//! # Example
//!
//! ```rust,ignore
//! use gi_search::{by_name, search, EditMutator, SearchContext, StopCondition};
//!
//! let mutator = EditMutator::new(program.clone())?;
//! let mut ctx = SearchContext::new(Box::new(harness), Box::new(mutator), 42)
//!     .with_stop(StopCondition::budget(Duration::from_secs(60)));
//! let report = search(by_name("tabu")?.as_ref(), &mut ctx, Patch::new()).await?;
//! println!("{}", report.generate_text());
//! ```

pub mod algorithms;
pub mod context;
pub mod error;
pub mod fitness;
pub mod operators;
pub mod report;
pub mod state;
pub mod stop;

#[cfg(test)]
mod testing;

pub use algorithms::{
    by_name, search, Algorithm, GeneticProgramming, IteratedLocalSearch, ParentSelection, RandomSearch, TabuQueue,
    TabuSearch, ALGORITHMS,
};
pub use context::SearchContext;
pub use error::{Result, SearchError};
pub use fitness::dominates;
pub use operators::{EditMutator, Mutator, DEFAULT_REMOVAL_RATE};
pub use report::SearchReport;
pub use state::{SearchState, SearchStats};
pub use stop::{StopCondition, StopReason, DEFAULT_BUDGET};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
