//! Genetic programming
//!
//! A fixed-size population of patches evolves by generations. Parents are
//! chosen by [`ParentSelection`]; each parent is crossed over with a random
//! member and also mutated. Missing slots are refilled with mutants of the
//! initial patch.

use std::cmp::Ordering;

use async_trait::async_trait;
use gi_program::Patch;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Algorithm;
use crate::context::SearchContext;
use crate::error::{Result, SearchError};
use crate::fitness::dominates;
use crate::report::SearchReport;

/// An evaluated population member
type Scored = (Patch, Option<f64>);

/// How parents are drawn from an evaluated generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParentSelection {
    /// The best `count` viable members
    Truncation {
        /// Parents kept
        count: usize,
    },
    /// `count` tournaments of `size` members drawn with replacement
    Tournament {
        /// Entrants per tournament
        size: usize,
        /// Tournaments held
        count: usize,
    },
}

impl Default for ParentSelection {
    fn default() -> Self {
        Self::Truncation { count: 5 }
    }
}

impl ParentSelection {
    fn validate(self) -> Result<()> {
        match self {
            Self::Truncation { count } | Self::Tournament { count, .. } if count == 0 => {
                Err(SearchError::invalid("parent count must be at least 1"))
            }
            Self::Tournament { size: 0, .. } => Err(SearchError::invalid("tournament size must be at least 1")),
            _ => Ok(()),
        }
    }

    /// Parents from `scored`; non-viable members are never chosen
    pub fn select(self, scored: &[Scored], rng: &mut impl Rng) -> Vec<Patch> {
        match self {
            Self::Truncation { count } => {
                let mut viable: Vec<(&Patch, f64)> =
                    scored.iter().filter_map(|(p, f)| f.map(|f| (p, f))).collect();
                viable.sort_by(|a, b| a.1.total_cmp(&b.1));
                viable.into_iter().take(count).map(|(p, _)| p.clone()).collect()
            }
            Self::Tournament { size, count } => {
                if scored.is_empty() {
                    return Vec::new();
                }
                (0..count)
                    .filter_map(|_| {
                        let winner = (0..size)
                            .map(|_| &scored[rng.gen_range(0..scored.len())])
                            .max_by(|a, b| {
                                if dominates(a.1, b.1) {
                                    Ordering::Greater
                                } else if dominates(b.1, a.1) {
                                    Ordering::Less
                                } else {
                                    Ordering::Equal
                                }
                            })?;
                        winner.1.map(|_| winner.0.clone())
                    })
                    .collect()
            }
        }
    }
}

/// Generational genetic programming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticProgramming {
    /// Members per generation
    pub population_size: usize,
    /// Parent selection scheme
    pub selection: ParentSelection,
}

impl GeneticProgramming {
    /// Algorithm name
    pub const NAME: &'static str = "genetic";

    /// Evaluate every member; the generation's best is offered
    async fn evaluate_generation(&self, ctx: &mut SearchContext, population: Vec<Patch>) -> Vec<Scored> {
        let mut scored = Vec::with_capacity(population.len());
        for member in population {
            if ctx.should_stop() {
                break;
            }
            ctx.stats_mut().steps += 1;
            let fitness = ctx.run_patch(&member).await;
            scored.push((member, fitness));
        }
        let best = scored
            .iter()
            .filter(|(_, f)| f.is_some())
            .reduce(|a, b| if dominates(b.1, a.1) { b } else { a });
        if let Some((patch, _)) = best {
            ctx.offer(patch);
        }
        scored
    }

    fn mutants_of(&self, ctx: &mut SearchContext, initial: &Patch, into: &mut Vec<Patch>) -> Result<()> {
        while into.len() < self.population_size {
            into.push(ctx.mutate(initial)?);
        }
        Ok(())
    }
}

impl Default for GeneticProgramming {
    fn default() -> Self {
        Self {
            population_size: 10,
            selection: ParentSelection::default(),
        }
    }
}

#[async_trait]
impl Algorithm for GeneticProgramming {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, ctx: &mut SearchContext, initial: Patch) -> Result<SearchReport> {
        if self.population_size == 0 {
            return Err(SearchError::invalid("population_size must be at least 1"));
        }
        self.selection.validate()?;
        let initial_fitness = ctx.start(&initial).await?;

        let mut population = Vec::with_capacity(self.population_size);
        self.mutants_of(ctx, &initial, &mut population)?;

        while !ctx.should_stop() {
            ctx.stats_mut().generations += 1;
            let scored = self.evaluate_generation(ctx, population).await;
            let parents = self.selection.select(&scored, ctx.rng());
            debug!(
                generation = ctx.stats().generations,
                viable = scored.iter().filter(|(_, f)| f.is_some()).count(),
                parents = parents.len(),
                "generation evaluated"
            );

            let mut offspring = Vec::with_capacity(self.population_size.max(parents.len() * 2));
            for parent in &parents {
                if scored.is_empty() {
                    break;
                }
                let mate = scored[ctx.rng().gen_range(0..scored.len())].0.clone();
                offspring.push(ctx.crossover(parent, &mate));
                offspring.push(ctx.mutate(parent)?);
            }
            self.mutants_of(ctx, &initial, &mut offspring)?;
            offspring.truncate(self.population_size);
            population = offspring;
        }
        Ok(ctx.report(Self::NAME, Some(initial_fitness)))
    }
}
