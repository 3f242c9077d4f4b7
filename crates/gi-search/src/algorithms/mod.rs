//! Search algorithms
//!
//! Every algorithm starts by evaluating the initial patch (which must be
//! viable), then loops until the context's stop condition holds. The
//! condition is polled between steps, never while a candidate is running.

use std::fmt::Debug;

use async_trait::async_trait;
use gi_program::Patch;
use tracing::info;

use crate::context::SearchContext;
use crate::error::{Result, SearchError};
use crate::report::SearchReport;

pub mod genetic;
pub mod local;
pub mod random;
pub mod tabu;

pub use genetic::{GeneticProgramming, ParentSelection};
pub use local::IteratedLocalSearch;
pub use random::RandomSearch;
pub use tabu::{TabuQueue, TabuSearch};

/// Names accepted by [`by_name`]
pub const ALGORITHMS: [&str; 4] = [
    RandomSearch::NAME,
    IteratedLocalSearch::NAME,
    TabuSearch::NAME,
    GeneticProgramming::NAME,
];

/// A metaheuristic over the patch space
#[async_trait]
pub trait Algorithm: Send + Sync + Debug {
    /// Algorithm name
    fn name(&self) -> &'static str;

    /// Search from `initial` until the stop condition holds
    ///
    /// # Errors
    /// Returns error if the initial patch is not viable, the operator
    /// cannot create edits, or the configuration is out of range
    async fn run(&self, ctx: &mut SearchContext, initial: Patch) -> Result<SearchReport>;
}

/// Algorithm with default parameters by name
///
/// # Errors
/// Returns error for an unknown name
pub fn by_name(name: &str) -> Result<Box<dyn Algorithm>> {
    match name {
        RandomSearch::NAME => Ok(Box::new(RandomSearch::default())),
        IteratedLocalSearch::NAME => Ok(Box::new(IteratedLocalSearch::default())),
        TabuSearch::NAME => Ok(Box::new(TabuSearch::default())),
        GeneticProgramming::NAME => Ok(Box::new(GeneticProgramming::default())),
        other => Err(SearchError::UnknownAlgorithm(other.to_string())),
    }
}

/// Run `algorithm` and log its start and end
///
/// # Errors
/// Propagates the algorithm's error
pub async fn search(algorithm: &dyn Algorithm, ctx: &mut SearchContext, initial: Patch) -> Result<SearchReport> {
    info!(algorithm = algorithm.name(), stop = ?ctx.stop_condition(), %initial, "search started");
    let report = algorithm.run(ctx, initial).await?;
    info!(
        algorithm = algorithm.name(),
        best = ?report.best_fitness,
        evaluations = report.stats.evaluations,
        reason = ?report.stop_reason,
        elapsed = ?report.elapsed,
        "search finished"
    );
    Ok(report)
}
