//! Mutation and crossover
//!
//! A [`Mutator`] produces neighbours of a patch. Every random choice draws
//! from the caller's generator so a run is reproducible from its seed.

use std::fmt::Debug;
use std::sync::Arc;

use gi_program::{Edit, EditKind, Engine, Patch, PointSelection, Program};
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, RngCore};

use crate::error::{Result, SearchError};

/// Default probability of shrinking a non-empty patch
pub const DEFAULT_REMOVAL_RATE: f64 = 0.5;

/// Kind draws before [`EditMutator`] gives up
const KIND_ATTEMPTS: usize = 8;

/// Neighbourhood operators over patches
pub trait Mutator: Send + Sync + Debug {
    /// One random neighbour of `patch`
    ///
    /// # Errors
    /// Returns error if no edit can be created
    fn mutate(&self, patch: &Patch, rng: &mut dyn RngCore) -> Result<Patch>;

    /// Offspring of two parents: the edits of `a` followed by those of `b`
    fn crossover(&self, a: &Patch, b: &Patch, _rng: &mut dyn RngCore) -> Patch {
        a.concat(b)
    }
}

/// Mutator appending random edits drawn from a weighted operator table
#[derive(Debug)]
pub struct EditMutator<E: Engine> {
    program: Arc<Program<E>>,
    kinds: Vec<EditKind>,
    weights: WeightedIndex<f64>,
    removal_rate: f64,
    selection: PointSelection,
}

impl<E: Engine> EditMutator<E> {
    /// Every edit kind with equal weight
    ///
    /// # Errors
    /// Never fails for the built-in table
    pub fn new(program: Arc<Program<E>>) -> Result<Self> {
        let table: Vec<(EditKind, f64)> = EditKind::ALL.iter().map(|&kind| (kind, 1.0)).collect();
        Self::with_operators(program, &table)
    }

    /// Custom operator table
    ///
    /// # Errors
    /// Returns error if the table is empty, has a negative weight or sums
    /// to zero
    pub fn with_operators(program: Arc<Program<E>>, table: &[(EditKind, f64)]) -> Result<Self> {
        let weights = WeightedIndex::new(table.iter().map(|(_, w)| *w))
            .map_err(|e| SearchError::invalid(format!("operator weights: {e}")))?;
        Ok(Self {
            program,
            kinds: table.iter().map(|(kind, _)| *kind).collect(),
            weights,
            removal_rate: DEFAULT_REMOVAL_RATE,
            selection: PointSelection::Uniform,
        })
    }

    /// Probability of removing an edit instead of adding one
    ///
    /// # Errors
    /// Returns error if `rate` is outside `[0, 1]`
    pub fn with_removal_rate(mut self, rate: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(SearchError::invalid(format!("removal rate {rate} outside [0, 1]")));
        }
        self.removal_rate = rate;
        Ok(self)
    }

    /// Target point selection
    #[must_use]
    pub fn with_selection(mut self, selection: PointSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Program the edits address
    #[inline]
    #[must_use]
    pub fn program(&self) -> &Program<E> {
        &self.program
    }
}

impl<E: Engine + Debug> Mutator for EditMutator<E> {
    fn mutate(&self, patch: &Patch, rng: &mut dyn RngCore) -> Result<Patch> {
        let mut next = patch.clone();
        if !next.is_empty() && rng.gen_bool(self.removal_rate) {
            let index = rng.gen_range(0..next.len());
            next.remove(index);
            return Ok(next);
        }

        let program: &Program<E> = &self.program;
        for _ in 0..KIND_ATTEMPTS {
            let kind = self.kinds[self.weights.sample(rng)];
            if let Some(edit) = Edit::random(kind, program, self.selection, rng) {
                next.push(edit);
                return Ok(next);
            }
        }
        Err(SearchError::NoEdit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gi_test_utils::{line_program, markup_program};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mutator() -> EditMutator<gi_program::LineEngine> {
        EditMutator::new(Arc::new(line_program(&[("f.c", "a\nb\nc\nd\n")]))).unwrap()
    }

    #[test]
    fn empty_patch_always_grows() {
        let mutator = mutator();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let next = mutator.mutate(&Patch::new(), &mut rng).unwrap();
            assert_eq!(next.len(), 1);
            assert!(next.edits()[0].is_valid_for(mutator.program()));
        }
    }

    #[test]
    fn full_removal_rate_shrinks() {
        let mutator = mutator().with_removal_rate(1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let grown = mutator.mutate(&Patch::new(), &mut rng).unwrap();
        let grown = grown.concat(&grown);
        let shrunk = mutator.mutate(&grown, &mut rng).unwrap();
        assert_eq!(shrunk.len(), 1);
    }

    #[test]
    fn zero_removal_rate_always_grows() {
        let mutator = mutator().with_removal_rate(0.0).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let mut patch = Patch::new();
        for expected in 1..=5 {
            patch = mutator.mutate(&patch, &mut rng).unwrap();
            assert_eq!(patch.len(), expected);
        }
    }

    #[test]
    fn same_seed_same_mutations() {
        let mutator = mutator();
        let walk = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut patch = Patch::new();
            for _ in 0..10 {
                patch = mutator.mutate(&patch, &mut rng).unwrap();
            }
            patch
        };
        assert_eq!(walk(42), walk(42));
    }

    #[test]
    fn operator_table_restricts_kinds() {
        let program = Arc::new(markup_program(&[("f.xml", "<r><a/><a/><b/></r>")]));
        let mutator = EditMutator::with_operators(program, &[(EditKind::Delete, 1.0), (EditKind::Swap, 0.0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..10 {
            let patch = mutator.mutate(&Patch::new(), &mut rng).unwrap();
            assert_eq!(patch.edits()[0].kind(), EditKind::Delete);
        }
    }

    #[test]
    fn invalid_tables_are_rejected() {
        let program = Arc::new(line_program(&[("f.c", "a\n")]));
        assert!(EditMutator::with_operators(Arc::clone(&program), &[]).is_err());
        assert!(EditMutator::with_operators(Arc::clone(&program), &[(EditKind::Delete, 0.0)]).is_err());
        assert!(EditMutator::new(program).unwrap().with_removal_rate(1.5).is_err());
    }

    #[test]
    fn crossover_concatenates() {
        let mutator = mutator();
        let mut rng = StdRng::seed_from_u64(1);
        let a = mutator.mutate(&Patch::new(), &mut rng).unwrap();
        let b = mutator.mutate(&Patch::new(), &mut rng).unwrap();
        let child = mutator.crossover(&a, &b, &mut rng);
        assert_eq!(child.len(), 2);
        assert_eq!(child.edits()[0], a.edits()[0]);
        assert_eq!(child.edits()[1], b.edits()[0]);
    }
}
