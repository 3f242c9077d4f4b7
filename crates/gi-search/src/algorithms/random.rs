//! Random search
//!
//! Each step takes a random walk of `1..=max_distance` mutations from the
//! best patch (adaptive) or from the initial patch, and keeps the result
//! if it dominates the best.

use async_trait::async_trait;
use gi_program::Patch;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::Algorithm;
use crate::context::SearchContext;
use crate::error::{Result, SearchError};
use crate::report::SearchReport;

/// Random-walk sampling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomSearch {
    /// Longest walk per step
    pub max_distance: usize,
    /// Walk from the best patch instead of the initial one
    pub adaptive: bool,
}

impl RandomSearch {
    /// Algorithm name
    pub const NAME: &'static str = "random";
}

impl Default for RandomSearch {
    fn default() -> Self {
        Self {
            max_distance: 10,
            adaptive: false,
        }
    }
}

#[async_trait]
impl Algorithm for RandomSearch {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, ctx: &mut SearchContext, initial: Patch) -> Result<SearchReport> {
        if self.max_distance == 0 {
            return Err(SearchError::invalid("max_distance must be at least 1"));
        }
        let initial_fitness = ctx.start(&initial).await?;

        while !ctx.should_stop() {
            ctx.stats_mut().steps += 1;
            let distance = ctx.rng().gen_range(1..=self.max_distance);
            let mut current = if self.adaptive { ctx.best().clone() } else { initial.clone() };
            for _ in 0..distance {
                current = ctx.mutate(&current)?;
            }
            ctx.run_patch(&current).await;
            ctx.offer(&current);
        }
        Ok(ctx.report(Self::NAME, Some(initial_fitness)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stop::{StopCondition, StopReason};
    use crate::testing::{walk_context, Walk};
    use std::time::Duration;

    #[allow(clippy::cast_precision_loss)]
    fn distance_to(target: i64) -> impl Fn(i64) -> Option<f64> + Send + 'static {
        move |k| Some((k - target).unsigned_abs() as f64)
    }

    #[tokio::test]
    async fn adaptive_walk_reaches_target() {
        let algorithm = RandomSearch {
            max_distance: 3,
            adaptive: true,
        };
        let mut ctx = walk_context(distance_to(6), 7)
            .with_stop(StopCondition::budget(Duration::from_secs(10)).with_target(0.0).with_max_steps(5_000));
        let report = algorithm.run(&mut ctx, Patch::new()).await.unwrap();

        assert_eq!(report.best_fitness, Some(0.0));
        assert_eq!(Walk::decode(&report.best_patch), 6);
        assert_eq!(report.stop_reason, Some(StopReason::Target));
        assert_eq!(report.initial_fitness, Some(6.0));
    }

    #[tokio::test]
    async fn best_never_gets_worse() {
        let algorithm = RandomSearch::default();
        let mut ctx = walk_context(distance_to(-4), 3).with_stop(StopCondition::default().with_max_steps(200));
        let report = algorithm.run(&mut ctx, Patch::new()).await.unwrap();
        assert!(report.best_fitness.unwrap() <= 4.0);
        assert_eq!(report.stats.steps, 200);
        assert_eq!(report.stop_reason, Some(StopReason::Steps));
    }

    #[tokio::test]
    async fn zero_distance_is_rejected() {
        let algorithm = RandomSearch {
            max_distance: 0,
            adaptive: false,
        };
        let mut ctx = walk_context(distance_to(0), 0);
        assert!(matches!(
            algorithm.run(&mut ctx, Patch::new()).await,
            Err(SearchError::InvalidConfig(_))
        ));
    }
}
