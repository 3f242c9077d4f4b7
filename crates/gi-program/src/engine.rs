//! Granularity engines
//!
//! An [`Engine`] owns the parsing, rendering and in-place surgery for one
//! program granularity. [`Program`](crate::Program), [`Edit`](crate::Edit)
//! and [`Patch`](crate::Patch) are generic over it.
//!
//! # Core Concepts
//!
//! - [`Sheet`]: one parsed file plus its modification-point table
//! - Modification point: an index into `Sheet::points`. Each slot holds the
//!   *current* location of an original point, or `None` once its node has
//!   been removed. Engines keep every live slot resolvable across edits.

use std::fmt::{Debug, Display};

use crate::error::ProgramError;

/// Where an inserted element lands relative to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placement {
    /// New element becomes the target's predecessor
    Before,
    /// New element becomes the target's successor
    After,
}

/// One parsed file and its modification points
pub struct Sheet<E: Engine + ?Sized> {
    /// Parsed content
    pub content: E::Content,
    /// Current location of every modification point (`None` once removed)
    pub points: Vec<Option<E::Location>>,
}

impl<E: Engine + ?Sized> Sheet<E> {
    /// Create a sheet whose points are all live
    #[must_use]
    pub fn new(content: E::Content, locations: Vec<E::Location>) -> Self {
        Self {
            content,
            points: locations.into_iter().map(Some).collect(),
        }
    }

    /// Current location of `point`, if it still resolves
    #[inline]
    #[must_use]
    pub fn location(&self, point: usize) -> Option<&E::Location> {
        self.points.get(point)?.as_ref()
    }

    /// Number of points that are still live
    #[must_use]
    pub fn live_points(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }
}

impl<E: Engine + ?Sized> Clone for Sheet<E> {
    fn clone(&self) -> Self {
        Self {
            content: self.content.clone(),
            points: self.points.clone(),
        }
    }
}

impl<E: Engine + ?Sized> Debug for Sheet<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sheet")
            .field("content", &self.content)
            .field("points", &self.points)
            .finish()
    }
}

/// Parsing, rendering and surgery for one granularity
///
/// Surgery methods return `None` when the addressed point (or its node) no
/// longer resolves; the caller turns that into an
/// [`EditError`](crate::EditError).
pub trait Engine: Send + Sync + 'static {
    /// Parsed file content
    type Content: Clone + Debug + Send + Sync;

    /// Address of a modification point inside [`Self::Content`]
    type Location: Clone + Debug + Display + PartialEq + Send + Sync;

    /// Owned, deep-copied piece of content that can be spliced elsewhere
    type Fragment: Clone + Debug + Send + Sync;

    /// Granularity name
    const NAME: &'static str;

    /// Parse one file
    ///
    /// # Errors
    /// Returns error if the source cannot be parsed at this granularity
    fn parse(&self, file: &str, source: &str) -> Result<Sheet<Self>, ProgramError>;

    /// Text written to the scratch copy of `content`
    fn render(&self, content: &Self::Content) -> String;

    /// File name under which a rendered target is written
    fn output_name(&self, file: &str) -> String {
        file.to_string()
    }

    /// Short human view of the content at `location`
    fn describe(&self, content: &Self::Content, location: &Self::Location) -> Option<String>;

    /// Whether `ingredient` may be copied onto or next to `target`
    fn compatible(
        &self,
        target: (&Self::Content, &Self::Location),
        ingredient: (&Self::Content, &Self::Location),
    ) -> bool;

    /// Whether `outer` strictly contains `inner`
    fn encloses(&self, _outer: &Self::Location, _inner: &Self::Location) -> bool {
        false
    }

    /// Deep copy of the content at `location`
    fn extract(&self, content: &Self::Content, location: &Self::Location) -> Option<Self::Fragment>;

    /// Remove the element at `point`
    fn delete(&self, sheet: &mut Sheet<Self>, point: usize) -> Option<()>;

    /// Overwrite the element at `point` with `fragment`
    fn replace(&self, sheet: &mut Sheet<Self>, point: usize, fragment: Self::Fragment) -> Option<()>;

    /// Splice `fragment` next to `point`, returning the new point's index
    fn insert(
        &self,
        sheet: &mut Sheet<Self>,
        point: usize,
        fragment: Self::Fragment,
        placement: Placement,
    ) -> Option<usize>;
}
