//! Run report

use std::time::Duration;

use gi_program::Patch;
use serde::{Deserialize, Serialize};

use crate::state::SearchStats;
use crate::stop::StopReason;

/// Outcome of one search run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    /// Algorithm name
    pub algorithm: String,
    /// Best patch found
    pub best_patch: Patch,
    /// Fitness of the best patch
    pub best_fitness: Option<f64>,
    /// Fitness of the starting patch
    pub initial_fitness: Option<f64>,
    /// Run counters
    pub stats: SearchStats,
    /// Wall-clock time of the run
    pub elapsed: Duration,
    /// Condition that ended the run
    pub stop_reason: Option<StopReason>,
}

impl SearchReport {
    /// Relative improvement of best over initial, in percent
    #[must_use]
    pub fn improvement_percent(&self) -> Option<f64> {
        let (initial, best) = (self.initial_fitness?, self.best_fitness?);
        (initial != 0.0).then(|| 100.0 * (initial - best) / initial.abs())
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let fmt_fitness = |f: Option<f64>| f.map_or_else(|| "-".to_string(), |f| format!("{f}"));
        let mut report = String::new();

        report.push_str(&format!("=== {} ===\n\n", self.algorithm));
        report.push_str(&format!("Initial fitness: {}\n", fmt_fitness(self.initial_fitness)));
        report.push_str(&format!("Best fitness: {}\n", fmt_fitness(self.best_fitness)));
        if let Some(percent) = self.improvement_percent() {
            report.push_str(&format!("Improvement: {percent:.2}%\n"));
        }
        report.push_str(&format!("Best patch ({} edits): {}\n", self.best_patch.len(), self.best_patch));
        report.push_str(&format!("Signature: {}\n", self.best_patch.signature().short()));

        report.push_str("\n=== Stats ===\n");
        report.push_str(&format!("Evaluations: {}\n", self.stats.evaluations));
        report.push_str(&format!("Cache hits: {}\n", self.stats.cache_hits));
        report.push_str(&format!("Steps: {}\n", self.stats.steps));
        report.push_str(&format!("Iterations: {}\n", self.stats.iterations));
        report.push_str(&format!("Generations: {}\n", self.stats.generations));
        report.push_str(&format!("Restarts: {}\n", self.stats.restarts));
        report.push_str(&format!("Failures: {}\n", self.stats.failures));
        report.push_str(&format!("Timeouts: {}\n", self.stats.timeouts));
        report.push_str(&format!("Improvements: {}\n", self.stats.improvements));

        let reason = self.stop_reason.map_or_else(|| "-".to_string(), |r| format!("{r:?}"));
        report.push_str(&format!(
            "\n=== END ({:.2}s, stopped by {reason}) ===\n",
            self.elapsed.as_secs_f64()
        ));
        report
    }
}
