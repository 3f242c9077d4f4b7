//! Iterated local search
//!
//! # Core Concepts
//!
//! - **Descent**: a first-improvement walk. Each neighbour of the current
//!   patch is evaluated; it replaces the current one when it is viable and
//!   not dominated by it, so equal fitness moves sideways across plateaus.
//! - **Stuck**: a descent ends after `stuck_threshold` consecutive
//!   rejections. Revisiting a patch seen in the same descent counts as a
//!   rejection.
//! - **Escape**: between descents, restart to the initial patch with
//!   `restart_probability`, otherwise perturb the current patch by a few
//!   random steps.

use std::collections::HashSet;

use async_trait::async_trait;
use gi_program::Patch;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Algorithm;
use crate::context::SearchContext;
use crate::error::{Result, SearchError};
use crate::fitness::dominates;
use crate::report::SearchReport;

/// Iterated first-improvement descent with restarts and perturbation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IteratedLocalSearch {
    /// Random steps per perturbation
    pub perturbation_length: usize,
    /// Chance of restarting from the initial patch instead of perturbing
    pub restart_probability: f64,
    /// Consecutive rejections that end a descent
    pub stuck_threshold: usize,
    /// Perturbations tried before keeping the current patch
    pub max_perturbation_attempts: usize,
}

impl IteratedLocalSearch {
    /// Algorithm name
    pub const NAME: &'static str = "local";

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.restart_probability) {
            return Err(SearchError::invalid(format!(
                "restart probability {} outside [0, 1]",
                self.restart_probability
            )));
        }
        if self.stuck_threshold == 0 {
            return Err(SearchError::invalid("stuck_threshold must be at least 1"));
        }
        Ok(())
    }

    /// First-improvement walk from `current`
    ///
    /// Returns the patch the walk ended on.
    ///
    /// # Errors
    /// Returns error if the operator cannot create an edit
    pub async fn descend(&self, ctx: &mut SearchContext, mut current: Patch) -> Result<Patch> {
        let mut current_fitness = ctx.fitness(&current);
        let mut visited = HashSet::from([current.clone()]);
        let mut rejections = 0;

        while rejections < self.stuck_threshold && !ctx.should_stop() {
            let neighbour = ctx.mutate(&current)?;
            if !visited.insert(neighbour.clone()) {
                rejections += 1;
                continue;
            }
            ctx.stats_mut().steps += 1;
            let fitness = ctx.run_patch(&neighbour).await;
            if fitness.is_some() && !dominates(current_fitness, fitness) {
                ctx.offer(&neighbour);
                current = neighbour;
                current_fitness = fitness;
                rejections = 0;
            } else {
                rejections += 1;
            }
        }
        debug!(fitness = ?current_fitness, %current, "descent ended");
        Ok(current)
    }

    async fn perturb(&self, ctx: &mut SearchContext, current: &Patch) -> Result<Patch> {
        for _ in 0..self.max_perturbation_attempts {
            let mut candidate = current.clone();
            for _ in 0..self.perturbation_length {
                candidate = ctx.mutate(&candidate)?;
            }
            ctx.stats_mut().steps += 1;
            if ctx.run_patch(&candidate).await.is_some() {
                return Ok(candidate);
            }
            if ctx.should_stop() {
                break;
            }
        }
        Ok(current.clone())
    }
}

impl Default for IteratedLocalSearch {
    fn default() -> Self {
        Self {
            perturbation_length: 3,
            restart_probability: 0.01,
            stuck_threshold: 100,
            max_perturbation_attempts: 10,
        }
    }
}

#[async_trait]
impl Algorithm for IteratedLocalSearch {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, ctx: &mut SearchContext, initial: Patch) -> Result<SearchReport> {
        self.validate()?;
        let initial_fitness = ctx.start(&initial).await?;
        let mut current = initial.clone();

        while !ctx.should_stop() {
            ctx.stats_mut().iterations += 1;
            if ctx.stats().iterations > 1 {
                if ctx.rng().gen_bool(self.restart_probability) {
                    ctx.stats_mut().restarts += 1;
                    info!(iteration = ctx.stats().iterations, "restarting from the initial patch");
                    current = initial.clone();
                } else {
                    current = self.perturb(ctx, &current).await?;
                }
            }
            current = self.descend(ctx, current).await?;
            ctx.offer(&current);
        }
        Ok(ctx.report(Self::NAME, Some(initial_fitness)))
    }
}
