//! Evaluation results and the [`Evaluator`] seam

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use async_trait::async_trait;
use gi_program::Patch;
use serde::{Deserialize, Serialize};

/// Outcome class of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Produced a fitness value
    Normal,
    /// Did not apply, build, run or parse
    ParseError,
    /// Exceeded its time budget
    TimeOut,
}

/// Where a non-viable evaluation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Patch application or staging
    Apply,
    /// Compile command
    Compile,
    /// Run command or output parsing
    Run,
    /// Instance outcome contradicted the truth table
    Fail,
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Normal => "NORMAL",
            Status::ParseError => "PARSE_ERROR",
            Status::TimeOut => "TIME_OUT",
        })
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Apply => "APPLY",
            Stage::Compile => "COMPILE",
            Stage::Run => "RUN",
            Stage::Fail => "FAIL",
        })
    }
}

/// Result of evaluating one patch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Outcome class
    pub status: Status,
    /// Failing stage (`None` when viable)
    pub stage: Option<Stage>,
    /// Fitness, lower is better (`None` when not viable)
    pub fitness: Option<f64>,
    /// Wall-clock time spent
    pub elapsed: Duration,
}

impl Evaluation {
    /// Viable result
    #[must_use]
    pub fn normal(fitness: f64, elapsed: Duration) -> Self {
        Self {
            status: Status::Normal,
            stage: None,
            fitness: Some(fitness),
            elapsed,
        }
    }

    /// Non-viable result
    #[must_use]
    pub fn failure(status: Status, stage: Stage, elapsed: Duration) -> Self {
        Self {
            status,
            stage: Some(stage),
            fitness: None,
            elapsed,
        }
    }

    /// Whether the patch produced a fitness value
    #[inline]
    #[must_use]
    pub fn is_viable(&self) -> bool {
        self.status == Status::Normal && self.fitness.is_some()
    }
}

/// Scores patches
///
/// The search drives exactly one evaluation at a time; implementations may
/// keep mutable state (memo, truth table) without synchronisation.
#[async_trait]
pub trait Evaluator: Send {
    /// Evaluate `patch`; failures are reported in the result, never raised
    async fn evaluate(&mut self, patch: &Patch) -> Evaluation;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viability() {
        assert!(Evaluation::normal(1.0, Duration::ZERO).is_viable());
        let failed = Evaluation::failure(Status::TimeOut, Stage::Run, Duration::ZERO);
        assert!(!failed.is_viable());
        assert_eq!(failed.fitness, None);
        assert_eq!(format!("{} {}", failed.status, failed.stage.unwrap()), "TIME_OUT RUN");
    }
}
