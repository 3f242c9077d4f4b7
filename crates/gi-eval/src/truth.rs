//! Instance truth table
//!
//! With the oracle enabled, the first observed pass/fail of each test
//! instance becomes its expected outcome. A later variant that disagrees
//! on any instance is rejected as semantically broken.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Result of checking one observation against the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// First observation, now recorded
    Recorded,
    /// Matches the recorded outcome
    Agrees,
    /// Contradicts the recorded outcome
    Diverges,
}

/// Expected pass/fail per instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruthTable {
    expected: BTreeMap<String, bool>,
}

impl TruthTable {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `passed` against the record for `instance`, recording it
    /// on first encounter
    pub fn check(&mut self, instance: &str, passed: bool) -> Verdict {
        match self.expected.get(instance) {
            Some(&expected) if expected == passed => Verdict::Agrees,
            Some(_) => Verdict::Diverges,
            None => {
                info!(instance, passed, "recorded instance truth");
                self.expected.insert(instance.to_string(), passed);
                Verdict::Recorded
            }
        }
    }

    /// Recorded outcome of `instance`
    #[must_use]
    pub fn expected(&self, instance: &str) -> Option<bool> {
        self.expected.get(instance).copied()
    }

    /// Number of recorded instances
    #[must_use]
    pub fn len(&self) -> usize {
        self.expected.len()
    }

    /// Whether nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_truth() {
        let mut table = TruthTable::new();
        assert_eq!(table.check("a.cnf", true), Verdict::Recorded);
        assert_eq!(table.check("a.cnf", true), Verdict::Agrees);
        assert_eq!(table.check("a.cnf", false), Verdict::Diverges);
        assert_eq!(table.expected("a.cnf"), Some(true));
    }

    #[test]
    fn instances_are_independent() {
        let mut table = TruthTable::new();
        table.check("sat.cnf", true);
        assert_eq!(table.check("unsat.cnf", false), Verdict::Recorded);
        assert_eq!(table.len(), 2);
        assert_eq!(table.check("unsat.cnf", false), Verdict::Agrees);
    }
}
