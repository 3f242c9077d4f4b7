//! One-dimensional walk used to exercise the algorithms
//!
//! State `k` is the empty patch for `k == 0`, otherwise a single delete
//! whose point encodes `k`. Mutation steps to `k - 1` or `k + 1`.

use gi_program::{Edit, Patch, Target};
use gi_test_utils::ScriptedEvaluator;
use rand::{Rng, RngCore};

use crate::context::SearchContext;
use crate::error::Result;
use crate::operators::Mutator;

const OFFSET: i64 = 1_000;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Walk;

impl Walk {
    pub(crate) fn encode(k: i64) -> Patch {
        if k == 0 {
            return Patch::new();
        }
        let point = usize::try_from(k + OFFSET).unwrap();
        Patch::from(vec![Edit::delete(Target::new("k", point))])
    }

    pub(crate) fn decode(patch: &Patch) -> i64 {
        patch
            .edits()
            .first()
            .map_or(0, |edit| i64::try_from(edit.target().point).unwrap() - OFFSET)
    }
}

impl Mutator for Walk {
    fn mutate(&self, patch: &Patch, rng: &mut dyn RngCore) -> Result<Patch> {
        let k = Self::decode(patch);
        let step = if rng.gen_bool(0.5) { 1 } else { -1 };
        Ok(Self::encode(k + step))
    }
}

/// Context over the walk with fitness `f(k)`
pub(crate) fn walk_context(f: impl Fn(i64) -> Option<f64> + Send + 'static, seed: u64) -> SearchContext {
    let evaluator = ScriptedEvaluator::new(move |patch| f(Walk::decode(patch)));
    SearchContext::new(Box::new(evaluator), Box::new(Walk), seed)
}
