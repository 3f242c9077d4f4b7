//! Edits: value objects naming one operation and its points
//!
//! An [`Edit`] never holds content; it names a [`Target`] (and for most
//! kinds an ingredient [`Target`]) by modification-point index. Applying
//! it resolves both against a [`Variant`] working copy, where earlier edits
//! of the same patch may already have moved or removed them.

use std::fmt::{self, Display, Formatter};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::{Engine, Placement};
use crate::error::EditError;
use crate::program::{PointSelection, Program, Variant};

/// Attempts made by [`Edit::random`] before giving up
const MAX_ATTEMPTS: usize = 32;

/// A modification point in one target file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Target {
    /// Target file (relative path)
    pub file: String,
    /// Index into the file's point table
    pub point: usize,
}

impl Target {
    /// Create a new target
    #[inline]
    #[must_use]
    pub fn new(file: impl Into<String>, point: usize) -> Self {
        Self {
            file: file.into(),
            point,
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.point)
    }
}

/// Operation performed by an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    /// Remove the target
    Delete,
    /// Overwrite the target with a copy of the ingredient
    Replace,
    /// Exchange target and ingredient content
    Swap,
    /// Copy the ingredient in front of the target
    InsertBefore,
    /// Copy the ingredient behind the target
    InsertAfter,
    /// Insert the ingredient in front of the target, then delete it
    MoveBefore,
    /// Insert the ingredient behind the target, then delete it
    MoveAfter,
}

impl EditKind {
    /// Every kind, in declaration order
    pub const ALL: [EditKind; 7] = [
        EditKind::Delete,
        EditKind::Replace,
        EditKind::Swap,
        EditKind::InsertBefore,
        EditKind::InsertAfter,
        EditKind::MoveBefore,
        EditKind::MoveAfter,
    ];

    /// Whether this kind reads from an ingredient point
    #[inline]
    #[must_use]
    pub fn needs_ingredient(self) -> bool {
        !matches!(self, EditKind::Delete)
    }

    /// Placement for insert/move kinds
    #[inline]
    #[must_use]
    pub fn placement(self) -> Option<Placement> {
        match self {
            EditKind::InsertBefore | EditKind::MoveBefore => Some(Placement::Before),
            EditKind::InsertAfter | EditKind::MoveAfter => Some(Placement::After),
            _ => None,
        }
    }

    /// Canonical name used in renderings
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EditKind::Delete => "Delete",
            EditKind::Replace => "Replace",
            EditKind::Swap => "Swap",
            EditKind::InsertBefore => "InsertBefore",
            EditKind::InsertAfter => "InsertAfter",
            EditKind::MoveBefore => "MoveBefore",
            EditKind::MoveAfter => "MoveAfter",
        }
    }
}

impl Display for EditKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One structural edit
///
/// Immutable; equality and hashing are structural so independently built
/// edits compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edit {
    kind: EditKind,
    target: Target,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ingredient: Option<Target>,
}

impl Edit {
    /// Create an edit
    ///
    /// # Errors
    /// Returns error if the kind needs an ingredient and none is given
    pub fn new(kind: EditKind, target: Target, ingredient: Option<Target>) -> Result<Self, EditError> {
        if kind.needs_ingredient() && ingredient.is_none() {
            return Err(EditError::MissingIngredient(kind));
        }
        let ingredient = if kind.needs_ingredient() { ingredient } else { None };
        Ok(Self {
            kind,
            target,
            ingredient,
        })
    }

    /// Delete `target`
    #[must_use]
    pub fn delete(target: Target) -> Self {
        Self {
            kind: EditKind::Delete,
            target,
            ingredient: None,
        }
    }

    /// Edit of an ingredient-reading kind
    #[must_use]
    pub fn with_ingredient(kind: EditKind, target: Target, ingredient: Target) -> Self {
        Self {
            kind,
            target,
            ingredient: kind.needs_ingredient().then_some(ingredient),
        }
    }

    /// Operation
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EditKind {
        self.kind
    }

    /// Target point
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Ingredient point
    #[inline]
    #[must_use]
    pub fn ingredient(&self) -> Option<&Target> {
        self.ingredient.as_ref()
    }

    fn require_ingredient(&self) -> Result<&Target, EditError> {
        self.ingredient
            .as_ref()
            .ok_or(EditError::MissingIngredient(self.kind))
    }

    /// Validity predicate against the unmodified program
    ///
    /// Both points must exist and resolve, the engine must accept the
    /// ingredient for the target, and for swap/move neither point may
    /// enclose the other.
    #[must_use]
    pub fn is_valid_for<E: Engine>(&self, program: &Program<E>) -> bool {
        let Some(target) = program.location(&self.target) else {
            return false;
        };
        let Some(ingredient) = &self.ingredient else {
            return !self.kind.needs_ingredient();
        };
        let Some(source) = program.location(ingredient) else {
            return false;
        };
        let (Some(target_content), Some(source_content)) =
            (program.content(&self.target.file), program.content(&ingredient.file))
        else {
            return false;
        };

        let engine = program.engine();
        if !engine.compatible((target_content, target), (source_content, source)) {
            return false;
        }
        let same_file = self.target.file == ingredient.file;
        match self.kind {
            EditKind::Swap => {
                !(same_file && (engine.encloses(target, source) || engine.encloses(source, target)))
            }
            EditKind::MoveBefore | EditKind::MoveAfter => !(same_file && engine.encloses(source, target)),
            _ => true,
        }
    }

    /// Random valid edit of `kind`
    ///
    /// The target is drawn with `selection`, the ingredient uniformly.
    /// Returns `None` if no valid edit was found within a bounded number
    /// of attempts.
    pub fn random<E, R>(kind: EditKind, program: &Program<E>, selection: PointSelection, rng: &mut R) -> Option<Self>
    where
        E: Engine,
        R: Rng + ?Sized,
    {
        for _ in 0..MAX_ATTEMPTS {
            let target = program.random_target(selection, rng)?;
            let edit = if kind.needs_ingredient() {
                let ingredient = program.random_target(PointSelection::Uniform, rng)?;
                Self::with_ingredient(kind, target, ingredient)
            } else {
                Self::delete(target)
            };
            if edit.is_valid_for(program) {
                return Some(edit);
            }
        }
        None
    }

    /// Apply to a working copy
    ///
    /// # Errors
    /// Returns error if a point no longer resolves, the ingredient is
    /// incompatible, or swap/move points overlap
    pub fn apply<E: Engine>(&self, variant: &mut Variant<'_, E>) -> Result<(), EditError> {
        match self.kind {
            EditKind::Delete => variant.delete(&self.target),
            EditKind::Replace => {
                let ingredient = self.require_ingredient()?;
                variant.check_compatible(&self.target, ingredient)?;
                let fragment = variant.extract(ingredient)?;
                variant.replace(&self.target, fragment)
            }
            EditKind::Swap => {
                let ingredient = self.require_ingredient()?;
                variant.check_compatible(&self.target, ingredient)?;
                variant.check_disjoint(&self.target, ingredient)?;
                variant.check_disjoint(ingredient, &self.target)?;
                let target_copy = variant.extract(&self.target)?;
                let ingredient_copy = variant.extract(ingredient)?;
                variant.replace(&self.target, ingredient_copy)?;
                variant.replace(ingredient, target_copy)
            }
            EditKind::InsertBefore | EditKind::InsertAfter | EditKind::MoveBefore | EditKind::MoveAfter => {
                let ingredient = self.require_ingredient()?;
                let placement = self.kind.placement().ok_or(EditError::MissingIngredient(self.kind))?;
                variant.check_compatible(&self.target, ingredient)?;
                let moving = matches!(self.kind, EditKind::MoveBefore | EditKind::MoveAfter);
                if moving {
                    variant.check_disjoint(ingredient, &self.target)?;
                }
                let fragment = variant.extract(ingredient)?;
                variant.insert(&self.target, fragment, placement)?;
                if moving {
                    variant.delete(ingredient)?;
                }
                Ok(())
            }
        }
    }
}

impl Display for Edit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.ingredient {
            Some(ingredient) => write!(f, "{}({}, {})", self.kind, self.target, ingredient),
            None => write!(f, "{}({})", self.kind, self.target),
        }
    }
}
