//! Patches: ordered sequences of edits
//!
//! A [`Patch`] is the genome the search algorithms evolve. It is a plain
//! value: two patches holding equal edits in the same order are equal,
//! hash equally and share a [`PatchSignature`], regardless of how they
//! were built.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::edit::Edit;
use crate::signature::PatchSignature;

/// Ordered sequence of edits
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    edits: Vec<Edit>,
}

impl Patch {
    /// Empty patch (the unmodified program)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an edit
    pub fn push(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    /// Remove the edit at `index`
    pub fn remove(&mut self, index: usize) -> Option<Edit> {
        (index < self.edits.len()).then(|| self.edits.remove(index))
    }

    /// Number of edits
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Whether the patch has no edits
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Edits in application order
    #[inline]
    #[must_use]
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Iterate edits in application order
    pub fn iter(&self) -> std::slice::Iter<'_, Edit> {
        self.edits.iter()
    }

    /// `self` followed by `other`
    #[must_use]
    pub fn concat(&self, other: &Patch) -> Patch {
        self.iter().chain(other.iter()).cloned().collect()
    }

    /// Content hash of the canonical rendering
    #[must_use]
    pub fn signature(&self) -> PatchSignature {
        PatchSignature::compute(&self.to_string())
    }
}

impl From<Vec<Edit>> for Patch {
    fn from(edits: Vec<Edit>) -> Self {
        Self { edits }
    }
}

impl FromIterator<Edit> for Patch {
    fn from_iter<I: IntoIterator<Item = Edit>>(iter: I) -> Self {
        Self {
            edits: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Patch {
    type Item = &'a Edit;
    type IntoIter = std::slice::Iter<'a, Edit>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.iter()
    }
}

impl Display for Patch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, edit) in self.edits.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{edit}")?;
        }
        Ok(())
    }
}
