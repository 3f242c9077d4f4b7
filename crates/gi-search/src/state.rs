//! Search state shared by every algorithm
//!
//! Holds what a run has learned so far: the best patch, a memo of viable
//! fitness values, the set of non-viable patches and the run counters.
//! It only grows during a run.

use std::collections::{HashMap, HashSet};

use gi_eval::{Evaluation, Status};
use gi_program::Patch;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::fitness::dominates;

/// Run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Evaluator calls
    pub evaluations: u64,
    /// Lookups answered from the memo or the non-viable set
    pub cache_hits: u64,
    /// Candidates considered
    pub steps: u64,
    /// Local-search iterations / tabu rounds since restart
    pub iterations: u64,
    /// Genetic generations
    pub generations: u64,
    /// Restarts to the initial patch
    pub restarts: u64,
    /// Non-viable evaluations other than timeouts
    pub failures: u64,
    /// Timed-out evaluations
    pub timeouts: u64,
    /// Times the best patch improved
    pub improvements: u64,
}

/// Knowledge accumulated by one run
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    best: Patch,
    best_fitness: Option<f64>,
    memo: HashMap<Patch, f64>,
    non_viable: HashSet<Patch>,
    stats: SearchStats,
}

impl SearchState {
    /// Empty state; the best patch starts as the empty patch with no fitness
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Best patch so far
    #[inline]
    #[must_use]
    pub fn best(&self) -> &Patch {
        &self.best
    }

    /// Fitness of the best patch
    #[inline]
    #[must_use]
    pub fn best_fitness(&self) -> Option<f64> {
        self.best_fitness
    }

    /// Memoized fitness of `patch`
    #[inline]
    #[must_use]
    pub fn fitness(&self, patch: &Patch) -> Option<f64> {
        self.memo.get(patch).copied()
    }

    /// Whether `patch` is known to be non-viable
    #[inline]
    #[must_use]
    pub fn is_non_viable(&self, patch: &Patch) -> bool {
        self.non_viable.contains(patch)
    }

    /// Whether `patch` has been evaluated at all
    #[must_use]
    pub fn is_known(&self, patch: &Patch) -> bool {
        self.memo.contains_key(patch) || self.non_viable.contains(patch)
    }

    /// Number of viable patches seen
    #[must_use]
    pub fn viable_count(&self) -> usize {
        self.memo.len()
    }

    /// Number of non-viable patches seen
    #[must_use]
    pub fn non_viable_count(&self) -> usize {
        self.non_viable.len()
    }

    /// Run counters
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Mutable run counters
    #[inline]
    pub fn stats_mut(&mut self) -> &mut SearchStats {
        &mut self.stats
    }

    /// Store the outcome of evaluating `patch`
    pub fn record(&mut self, patch: &Patch, evaluation: &Evaluation) -> Option<f64> {
        match (evaluation.status, evaluation.fitness) {
            (Status::Normal, Some(fitness)) => {
                self.memo.insert(patch.clone(), fitness);
                Some(fitness)
            }
            (Status::TimeOut, _) => {
                self.stats.timeouts += 1;
                self.non_viable.insert(patch.clone());
                None
            }
            _ => {
                self.stats.failures += 1;
                self.non_viable.insert(patch.clone());
                None
            }
        }
    }

    /// Make `patch` the best if it dominates the current best
    pub fn offer(&mut self, patch: &Patch) -> bool {
        let fitness = self.fitness(patch);
        if !dominates(fitness, self.best_fitness) {
            return false;
        }
        if self.best_fitness.is_some() {
            self.stats.improvements += 1;
            info!(fitness = ?fitness, previous = ?self.best_fitness, %patch, "new best");
        }
        self.best = patch.clone();
        self.best_fitness = fitness;
        true
    }
}
