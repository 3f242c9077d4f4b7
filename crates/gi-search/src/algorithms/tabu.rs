//! Tabu search
//!
//! Best-improvement moves over a sampled neighbourhood. Recently chosen
//! patches sit in a bounded FIFO queue and cannot be chosen again until
//! they are evicted.

use std::collections::VecDeque;

use async_trait::async_trait;
use gi_program::Patch;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Algorithm;
use crate::context::SearchContext;
use crate::error::{Result, SearchError};
use crate::fitness::dominates;
use crate::report::SearchReport;

/// Mutation draws per requested neighbour when sampling
const SAMPLE_ATTEMPTS: usize = 4;

/// Bounded FIFO of recently chosen patches
#[derive(Debug, Clone, Default)]
pub struct TabuQueue {
    entries: VecDeque<Patch>,
    capacity: usize,
}

impl TabuQueue {
    /// Empty queue holding at most `capacity` patches
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append `patch`, evicting the oldest entries beyond capacity
    pub fn push(&mut self, patch: Patch) {
        self.entries.push_back(patch);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Whether `patch` is tabu
    #[inline]
    #[must_use]
    pub fn contains(&self, patch: &Patch) -> bool {
        self.entries.contains(patch)
    }

    /// Forget every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of tabu patches
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no patch is tabu
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Patch> {
        self.entries.iter()
    }
}

/// Tabu search over sampled neighbourhoods
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabuSearch {
    /// Queue capacity
    pub tabu_length: usize,
    /// Distinct neighbours sampled per round
    pub neighbourhood_size: usize,
}

impl TabuSearch {
    /// Algorithm name
    pub const NAME: &'static str = "tabu";

    /// One round: sample neighbours of `current` and return the best viable
    /// one outside `tabu`, if any
    ///
    /// # Errors
    /// Returns error if the operator cannot create an edit
    pub async fn round(&self, ctx: &mut SearchContext, current: &Patch, tabu: &TabuQueue) -> Result<Option<Patch>> {
        let mut neighbours: Vec<Patch> = Vec::with_capacity(self.neighbourhood_size);
        for _ in 0..self.neighbourhood_size * SAMPLE_ATTEMPTS {
            if neighbours.len() == self.neighbourhood_size {
                break;
            }
            let candidate = ctx.mutate(current)?;
            if &candidate != current && !neighbours.contains(&candidate) {
                neighbours.push(candidate);
            }
        }

        let mut chosen: Option<(Patch, Option<f64>)> = None;
        for candidate in neighbours {
            if ctx.should_stop() {
                break;
            }
            if tabu.contains(&candidate) {
                continue;
            }
            ctx.stats_mut().steps += 1;
            let Some(fitness) = ctx.run_patch(&candidate).await else {
                continue;
            };
            let better = chosen.as_ref().map_or(true, |(_, best)| dominates(Some(fitness), *best));
            if better {
                chosen = Some((candidate, Some(fitness)));
            }
        }
        Ok(chosen.map(|(patch, _)| patch))
    }
}

impl Default for TabuSearch {
    fn default() -> Self {
        Self {
            tabu_length: 10,
            neighbourhood_size: 20,
        }
    }
}

#[async_trait]
impl Algorithm for TabuSearch {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, ctx: &mut SearchContext, initial: Patch) -> Result<SearchReport> {
        if self.neighbourhood_size == 0 {
            return Err(SearchError::invalid("neighbourhood_size must be at least 1"));
        }
        let initial_fitness = ctx.start(&initial).await?;
        let mut tabu = TabuQueue::new(self.tabu_length);
        tabu.push(initial.clone());
        let mut current = initial.clone();
        ctx.stats_mut().iterations = 1;

        while !ctx.should_stop() {
            match self.round(ctx, &current, &tabu).await? {
                Some(next) => {
                    debug!(fitness = ?ctx.fitness(&next), %next, "tabu move");
                    tabu.push(next.clone());
                    ctx.offer(&next);
                    current = next;
                }
                None if ctx.should_stop() => break,
                None => {
                    let stats = ctx.stats_mut();
                    stats.restarts += 1;
                    stats.iterations += 1;
                    info!(restarts = stats.restarts, "no admissible neighbour, restarting");
                    tabu.clear();
                    tabu.push(initial.clone());
                    current = initial.clone();
                }
            }
        }
        Ok(ctx.report(Self::NAME, Some(initial_fitness)))
    }
}
