//! Structural paths for addressing nodes within a tree
//!
//! Provides [`NodePath`], an ordered list of `(tag, occurrence)` steps
//! rendered as `./block[1]/expression_statement[3]`.

use std::fmt::{self, Display, Formatter};

/// One step of a [`NodePath`]: the `index`-th child (1-based) tagged `tag`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathStep {
    /// Element tag
    pub tag: String,
    /// 1-based occurrence among siblings sharing `tag`
    pub index: usize,
}

impl PathStep {
    /// Create a new step
    #[inline]
    #[must_use]
    pub fn new(tag: impl Into<String>, index: usize) -> Self {
        Self {
            tag: tag.into(),
            index,
        }
    }
}

impl Display for PathStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.tag, self.index)
    }
}

/// Path from the root of a tree to one of its descendants
///
/// Occurrence indices are counted per tag, so inserting or removing a
/// sibling only renumbers siblings that share its tag.
///
/// # Examples
/// - `[]` → `.` (the root itself)
/// - `[("a", 2)]` → `./a[2]`
/// - `[("a", 1), ("b", 3)]` → `./a[1]/b[3]`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodePath(Vec<PathStep>);

impl NodePath {
    /// Empty path (root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path steps
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    /// Mutable access to the step at `depth`
    #[inline]
    pub(crate) fn step_mut(&mut self, depth: usize) -> Option<&mut PathStep> {
        self.0.get_mut(depth)
    }

    /// Get number of steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split into parent path and last step
    #[must_use]
    pub fn split_last(&self) -> Option<(Self, &PathStep)> {
        let (last, rest) = self.0.split_last()?;
        Some((Self(rest.to_vec()), last))
    }

    /// Append a step, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, tag: impl Into<String>, index: usize) -> Self {
        let mut new = self.clone();
        new.0.push(PathStep::new(tag, index));
        new
    }

    /// Check if this path is a prefix of another (or equal to it)
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Check if this path is an ancestor of another (strict prefix)
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.is_prefix_of(other)
    }
}

impl Display for NodePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(".")?;
        for step in &self.0 {
            write!(f, "/{step}")?;
        }
        Ok(())
    }
}
