//! Stop conditions, polled between steps

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::state::SearchState;

/// Default wall-clock budget
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(30);

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Wall-clock budget spent
    Budget,
    /// Best fitness reached the target
    Target,
    /// Evaluation limit reached
    Evaluations,
    /// Step limit reached
    Steps,
}

/// When a search run should end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopCondition {
    /// Wall-clock budget
    pub budget: Duration,
    /// Stop once the best fitness is at or below this value
    pub target: Option<f64>,
    /// Maximum evaluator calls
    pub max_evaluations: Option<u64>,
    /// Maximum candidates considered
    pub max_steps: Option<u64>,
}

impl Default for StopCondition {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            target: None,
            max_evaluations: None,
            max_steps: None,
        }
    }
}

impl StopCondition {
    /// Budget-only condition
    #[must_use]
    pub fn budget(budget: Duration) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }

    /// Set target fitness
    #[must_use]
    pub fn with_target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }

    /// Set evaluation limit
    #[must_use]
    pub fn with_max_evaluations(mut self, max: u64) -> Self {
        self.max_evaluations = Some(max);
        self
    }

    /// Set step limit
    #[must_use]
    pub fn with_max_steps(mut self, max: u64) -> Self {
        self.max_steps = Some(max);
        self
    }

    /// First condition that holds, if any
    #[must_use]
    pub fn check(&self, elapsed: Duration, state: &SearchState) -> Option<StopReason> {
        let stats = state.stats();
        if elapsed >= self.budget {
            Some(StopReason::Budget)
        } else if self
            .target
            .zip(state.best_fitness())
            .is_some_and(|(target, best)| best <= target)
        {
            Some(StopReason::Target)
        } else if self.max_evaluations.is_some_and(|max| stats.evaluations >= max) {
            Some(StopReason::Evaluations)
        } else if self.max_steps.is_some_and(|max| stats.steps >= max) {
            Some(StopReason::Steps)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gi_eval::Evaluation;
    use gi_program::Patch;

    #[test]
    fn budget_expires() {
        let stop = StopCondition::budget(Duration::from_secs(1));
        let state = SearchState::new();
        assert_eq!(stop.check(Duration::from_millis(999), &state), None);
        assert_eq!(stop.check(Duration::from_secs(1), &state), Some(StopReason::Budget));
    }

    #[test]
    fn target_compares_best_fitness() {
        let stop = StopCondition::default().with_target(2.0);
        let mut state = SearchState::new();
        assert_eq!(stop.check(Duration::ZERO, &state), None);
        state.record(&Patch::new(), &Evaluation::normal(2.0, Duration::ZERO));
        state.offer(&Patch::new());
        assert_eq!(stop.check(Duration::ZERO, &state), Some(StopReason::Target));
    }

    #[test]
    fn counters_limit_the_run() {
        let stop = StopCondition::default().with_max_evaluations(3).with_max_steps(10);
        let mut state = SearchState::new();
        state.stats_mut().evaluations = 3;
        assert_eq!(stop.check(Duration::ZERO, &state), Some(StopReason::Evaluations));
        state.stats_mut().evaluations = 0;
        state.stats_mut().steps = 10;
        assert_eq!(stop.check(Duration::ZERO, &state), Some(StopReason::Steps));
    }
}
