//! Search context
//!
//! Everything an algorithm needs for one run: the evaluator, the mutation
//! operator, an explicitly seeded generator, the accumulated
//! [`SearchState`] and the [`StopCondition`].

use std::time::{Duration, Instant};

use gi_eval::Evaluator;
use gi_program::Patch;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::error::{Result, SearchError};
use crate::operators::Mutator;
use crate::report::SearchReport;
use crate::state::{SearchState, SearchStats};
use crate::stop::{StopCondition, StopReason};

/// Per-run search context
pub struct SearchContext {
    evaluator: Box<dyn Evaluator>,
    mutator: Box<dyn Mutator>,
    rng: StdRng,
    state: SearchState,
    stop: StopCondition,
    started: Instant,
}

impl SearchContext {
    /// Create a context seeded with `seed`
    #[must_use]
    pub fn new(evaluator: Box<dyn Evaluator>, mutator: Box<dyn Mutator>, seed: u64) -> Self {
        Self {
            evaluator,
            mutator,
            rng: StdRng::seed_from_u64(seed),
            state: SearchState::new(),
            stop: StopCondition::default(),
            started: Instant::now(),
        }
    }

    /// Replace the stop condition
    #[must_use]
    pub fn with_stop(mut self, stop: StopCondition) -> Self {
        self.stop = stop;
        self
    }

    /// Accumulated state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Run counters
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &SearchStats {
        self.state.stats()
    }

    /// Mutable run counters
    #[inline]
    pub fn stats_mut(&mut self) -> &mut SearchStats {
        self.state.stats_mut()
    }

    /// The run's random generator
    #[inline]
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Stop condition
    #[inline]
    #[must_use]
    pub fn stop_condition(&self) -> &StopCondition {
        &self.stop
    }

    /// Time since [`start`](Self::start)
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// First stop condition that holds
    #[must_use]
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop.check(self.elapsed(), &self.state)
    }

    /// Whether the run should end
    #[inline]
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_reason().is_some()
    }

    /// Memoized fitness of `patch`
    #[inline]
    #[must_use]
    pub fn fitness(&self, patch: &Patch) -> Option<f64> {
        self.state.fitness(patch)
    }

    /// Best patch so far
    #[inline]
    #[must_use]
    pub fn best(&self) -> &Patch {
        self.state.best()
    }

    /// Evaluate `patch` unless its outcome is already known
    ///
    /// Returns the fitness, or `None` if the patch is not viable.
    pub async fn run_patch(&mut self, patch: &Patch) -> Option<f64> {
        if let Some(fitness) = self.state.fitness(patch) {
            self.state.stats_mut().cache_hits += 1;
            return Some(fitness);
        }
        if self.state.is_non_viable(patch) {
            self.state.stats_mut().cache_hits += 1;
            return None;
        }
        self.state.stats_mut().evaluations += 1;
        let evaluation = self.evaluator.evaluate(patch).await;
        debug!(
            %patch,
            status = %evaluation.status,
            stage = ?evaluation.stage,
            fitness = ?evaluation.fitness,
            "candidate evaluated"
        );
        self.state.record(patch, &evaluation)
    }

    /// Make `patch` the best if it dominates the current best
    pub fn offer(&mut self, patch: &Patch) -> bool {
        self.state.offer(patch)
    }

    /// One random neighbour of `patch`
    ///
    /// # Errors
    /// Returns error if the operator cannot create an edit
    pub fn mutate(&mut self, patch: &Patch) -> Result<Patch> {
        self.mutator.mutate(patch, &mut self.rng)
    }

    /// Offspring of `a` and `b`
    pub fn crossover(&mut self, a: &Patch, b: &Patch) -> Patch {
        self.mutator.crossover(a, b, &mut self.rng)
    }

    /// Restart the clock and evaluate the initial patch, which becomes the
    /// first best
    ///
    /// # Errors
    /// Returns error if the initial patch is not viable
    pub async fn start(&mut self, initial: &Patch) -> Result<f64> {
        self.started = Instant::now();
        self.state.stats_mut().evaluations += 1;
        let evaluation = self.evaluator.evaluate(initial).await;
        match self.state.record(initial, &evaluation) {
            Some(fitness) => {
                self.state.offer(initial);
                info!(fitness, %initial, "initial patch evaluated");
                Ok(fitness)
            }
            None => Err(SearchError::InitialNotViable {
                status: evaluation.status,
                stage: evaluation.stage,
            }),
        }
    }

    /// Report of the run so far
    #[must_use]
    pub fn report(&self, algorithm: &str, initial_fitness: Option<f64>) -> SearchReport {
        SearchReport {
            algorithm: algorithm.to_string(),
            best_patch: self.state.best().clone(),
            best_fitness: self.state.best_fitness(),
            initial_fitness,
            stats: *self.state.stats(),
            elapsed: self.elapsed(),
            stop_reason: self.stop_reason(),
        }
    }
}

impl std::fmt::Debug for SearchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchContext")
            .field("mutator", &self.mutator)
            .field("state", &self.state)
            .field("stop", &self.stop)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{walk_context, Walk};
    use gi_eval::{Evaluation, Stage, Status};
    use gi_test_utils::ScriptedEvaluator;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn known_patches_are_not_re_evaluated() {
        let evaluator = ScriptedEvaluator::new(|patch| (Walk::decode(patch) != 3).then_some(1.0));
        let calls = evaluator.call_counter();
        let mut ctx = SearchContext::new(Box::new(evaluator), Box::new(Walk), 0);

        assert_eq!(ctx.run_patch(&Walk::encode(1)).await, Some(1.0));
        assert_eq!(ctx.run_patch(&Walk::encode(1)).await, Some(1.0));
        assert_eq!(ctx.run_patch(&Walk::encode(3)).await, None);
        assert_eq!(ctx.run_patch(&Walk::encode(3)).await, None);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.stats().evaluations, 2);
        assert_eq!(ctx.stats().cache_hits, 2);
        assert_eq!(ctx.stats().failures, 1);
    }

    #[tokio::test]
    async fn timeouts_are_counted_apart() {
        let evaluator =
            ScriptedEvaluator::from_fn(|_| Evaluation::failure(Status::TimeOut, Stage::Run, Duration::ZERO));
        let mut ctx = SearchContext::new(Box::new(evaluator), Box::new(Walk), 0);
        assert_eq!(ctx.run_patch(&Walk::encode(2)).await, None);
        assert_eq!(ctx.stats().timeouts, 1);
        assert_eq!(ctx.stats().failures, 0);
    }

    #[tokio::test]
    async fn non_viable_initial_patch_is_an_error() {
        let evaluator = ScriptedEvaluator::new(|_| None);
        let mut ctx = SearchContext::new(Box::new(evaluator), Box::new(Walk), 0);
        let err = ctx.start(&Patch::new()).await.unwrap_err();
        assert_eq!(
            err,
            SearchError::InitialNotViable {
                status: Status::ParseError,
                stage: Some(Stage::Run)
            }
        );
    }

    #[tokio::test]
    async fn start_sets_best() {
        let mut ctx = walk_context(|k| Some(k.unsigned_abs() as f64), 0);
        assert_eq!(ctx.start(&Walk::encode(4)).await.unwrap(), 4.0);
        assert_eq!(ctx.best(), &Walk::encode(4));
        assert_eq!(ctx.stats().improvements, 0);
    }
}
