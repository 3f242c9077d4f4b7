//! Program representation
//!
//! A [`Program`] is parsed once from the canonical sources and never
//! mutated afterwards. [`Program::apply`] replays a patch against a
//! [`Variant`], a copy-on-write view that clones a file's [`Sheet`] the
//! first time an edit touches it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edit::Target;
use crate::engine::{Engine, Placement, Sheet};
use crate::error::{EditError, ProgramError};
use crate::patch::Patch;

/// How a target point is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointSelection {
    /// Every original point equally likely
    #[default]
    Uniform,
    /// Proportional to the file's weight table (uniform without one)
    Weighted,
}

/// A rendered target file, ready to be written into a scratch directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Path relative to the project root
    pub name: String,
    /// File contents
    pub contents: String,
}

/// Summary of one modification point, for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointInfo {
    /// Index into the file's point table
    pub index: usize,
    /// Location rendered with the engine's `Display`
    pub location: String,
    /// Content at the point
    pub preview: String,
}

/// Parsed target files of one project at one granularity
#[derive(Debug)]
pub struct Program<E: Engine> {
    engine: E,
    files: BTreeMap<String, Sheet<E>>,
    weights: BTreeMap<String, Vec<f64>>,
}

impl<E: Engine> Program<E> {
    /// Parse in-memory sources
    ///
    /// # Errors
    /// Returns error if there are no sources or one fails to parse
    pub fn from_sources<I, F, S>(engine: E, sources: I) -> Result<Self, ProgramError>
    where
        I: IntoIterator<Item = (F, S)>,
        F: Into<String>,
        S: AsRef<str>,
    {
        let mut files = BTreeMap::new();
        for (file, source) in sources {
            let file = file.into();
            let sheet = engine.parse(&file, source.as_ref())?;
            debug!(file = %file, granularity = E::NAME, points = sheet.points.len(), "parsed target");
            files.insert(file, sheet);
        }
        if files.is_empty() {
            return Err(ProgramError::NoTargets);
        }
        Ok(Self {
            engine,
            files,
            weights: BTreeMap::new(),
        })
    }

    /// Read and parse `targets` relative to `root`
    ///
    /// # Errors
    /// Returns error if a target cannot be read or parsed
    pub fn load(engine: E, root: &Path, targets: &[String]) -> Result<Self, ProgramError> {
        let sources = targets
            .iter()
            .map(|target| {
                let path = root.join(target);
                fs::read_to_string(&path)
                    .map(|source| (target.clone(), source))
                    .map_err(|e| ProgramError::io(path, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_sources(engine, sources)
    }

    /// Granularity engine
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Target file names in order
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Parsed sheet of `file`
    #[inline]
    #[must_use]
    pub fn sheet(&self, file: &str) -> Option<&Sheet<E>> {
        self.files.get(file)
    }

    /// Parsed content of `file`
    #[inline]
    #[must_use]
    pub fn content(&self, file: &str) -> Option<&E::Content> {
        self.files.get(file).map(|sheet| &sheet.content)
    }

    /// Number of modification points in `file`
    #[must_use]
    pub fn point_count(&self, file: &str) -> usize {
        self.files.get(file).map_or(0, |sheet| sheet.points.len())
    }

    /// Location of `target` in the unmodified program
    #[must_use]
    pub fn location(&self, target: &Target) -> Option<&E::Location> {
        self.files.get(&target.file)?.location(target.point)
    }

    /// All points of `file` with a short preview each
    ///
    /// # Errors
    /// Returns error if `file` is not a target
    pub fn describe_points(&self, file: &str) -> Result<Vec<PointInfo>, ProgramError> {
        let sheet = self
            .files
            .get(file)
            .ok_or_else(|| ProgramError::UnknownFile(file.to_string()))?;
        Ok(sheet
            .points
            .iter()
            .enumerate()
            .filter_map(|(index, location)| {
                let location = location.as_ref()?;
                Some(PointInfo {
                    index,
                    location: location.to_string(),
                    preview: self.engine.describe(&sheet.content, location).unwrap_or_default(),
                })
            })
            .collect())
    }

    /// Attach selection weights in `[0, 1]` to the points of `file`
    ///
    /// # Errors
    /// Returns error if `file` is unknown, the table size differs from the
    /// point count, or a weight lies outside `[0, 1]`
    pub fn set_weights(&mut self, file: &str, weights: Vec<f64>) -> Result<(), ProgramError> {
        let invalid = |reason: String| ProgramError::InvalidWeights {
            file: file.to_string(),
            reason,
        };
        let count = self.point_count(file);
        if !self.files.contains_key(file) {
            return Err(ProgramError::UnknownFile(file.to_string()));
        }
        if weights.len() != count {
            return Err(invalid(format!("expected {count} weights, got {}", weights.len())));
        }
        if let Some(bad) = weights.iter().find(|w| !(0.0..=1.0).contains(*w)) {
            return Err(invalid(format!("weight {bad} outside [0, 1]")));
        }
        self.weights.insert(file.to_string(), weights);
        Ok(())
    }

    /// Draw a point of `file`
    pub fn select_point<R: Rng + ?Sized>(&self, file: &str, selection: PointSelection, rng: &mut R) -> Option<usize> {
        let count = self.point_count(file);
        if count == 0 {
            return None;
        }
        if selection == PointSelection::Weighted {
            if let Some(index) = self
                .weights
                .get(file)
                .and_then(|weights| WeightedIndex::new(weights).ok())
            {
                return Some(index.sample(rng));
            }
        }
        Some(rng.gen_range(0..count))
    }

    /// Draw a random file, then a point within it
    pub fn random_target<R: Rng + ?Sized>(&self, selection: PointSelection, rng: &mut R) -> Option<Target> {
        let files: Vec<&String> = self.files.keys().filter(|f| self.point_count(f) > 0).collect();
        let file = files.choose(rng)?;
        let point = self.select_point(file, selection, rng)?;
        Some(Target::new(file.as_str(), point))
    }

    /// Render every target file as-is
    #[must_use]
    pub fn render(&self) -> Vec<RenderedFile> {
        self.files
            .iter()
            .map(|(file, sheet)| RenderedFile {
                name: self.engine.output_name(file),
                contents: self.engine.render(&sheet.content),
            })
            .collect()
    }

    /// Replay `patch` against a fresh working copy
    ///
    /// Edits apply in order; the first failing edit aborts the whole patch.
    ///
    /// # Errors
    /// Returns the failing edit's error
    pub fn apply(&self, patch: &Patch) -> Result<Variant<'_, E>, EditError> {
        let mut variant = Variant {
            program: self,
            touched: BTreeMap::new(),
        };
        for edit in patch.iter() {
            edit.apply(&mut variant)?;
        }
        Ok(variant)
    }
}

/// Copy-on-write working copy of a [`Program`]
#[derive(Debug)]
pub struct Variant<'a, E: Engine> {
    program: &'a Program<E>,
    touched: BTreeMap<String, Sheet<E>>,
}

impl<'a, E: Engine> Variant<'a, E> {
    /// Current sheet of `file`
    #[must_use]
    pub fn sheet(&self, file: &str) -> Option<&Sheet<E>> {
        self.touched.get(file).or_else(|| self.program.files.get(file))
    }

    /// Current content of `file`
    #[must_use]
    pub fn content(&self, file: &str) -> Option<&E::Content> {
        self.sheet(file).map(|sheet| &sheet.content)
    }

    /// Whether any edit modified `file`
    #[must_use]
    pub fn is_touched(&self, file: &str) -> bool {
        self.touched.contains_key(file)
    }

    /// Render every target file
    #[must_use]
    pub fn render(&self) -> Vec<RenderedFile> {
        let engine = &self.program.engine;
        self.program
            .files
            .keys()
            .filter_map(|file| {
                let sheet = self.sheet(file)?;
                Some(RenderedFile {
                    name: engine.output_name(file),
                    contents: engine.render(&sheet.content),
                })
            })
            .collect()
    }

    /// Render one target file
    #[must_use]
    pub fn render_file(&self, file: &str) -> Option<String> {
        self.content(file).map(|content| self.program.engine.render(content))
    }

    fn sheet_mut(&mut self, file: &str) -> Result<&mut Sheet<E>, EditError> {
        if !self.touched.contains_key(file) {
            let original = self
                .program
                .files
                .get(file)
                .ok_or_else(|| EditError::UnknownFile(file.to_string()))?;
            self.touched.insert(file.to_string(), original.clone());
        }
        self.touched
            .get_mut(file)
            .ok_or_else(|| EditError::UnknownFile(file.to_string()))
    }

    fn resolve(&self, target: &Target) -> Result<(&Sheet<E>, &E::Location), EditError> {
        let sheet = self
            .sheet(&target.file)
            .ok_or_else(|| EditError::UnknownFile(target.file.clone()))?;
        if target.point >= sheet.points.len() {
            return Err(EditError::OutOfRange {
                target: target.clone(),
                len: sheet.points.len(),
            });
        }
        let location = sheet
            .location(target.point)
            .ok_or_else(|| EditError::Unresolved(target.clone()))?;
        Ok((sheet, location))
    }

    pub(crate) fn check_compatible(&self, target: &Target, ingredient: &Target) -> Result<(), EditError> {
        let (target_sheet, target_location) = self.resolve(target)?;
        let (source_sheet, source_location) = self.resolve(ingredient)?;
        let compatible = self.program.engine.compatible(
            (&target_sheet.content, target_location),
            (&source_sheet.content, source_location),
        );
        if compatible {
            Ok(())
        } else {
            Err(EditError::Incompatible {
                target: target.clone(),
                ingredient: ingredient.clone(),
            })
        }
    }

    /// Fails if `outer` strictly encloses `inner` in the same file
    pub(crate) fn check_disjoint(&self, outer: &Target, inner: &Target) -> Result<(), EditError> {
        if outer.file != inner.file {
            return Ok(());
        }
        let (_, outer_location) = self.resolve(outer)?;
        let (_, inner_location) = self.resolve(inner)?;
        if self.program.engine.encloses(outer_location, inner_location) {
            return Err(EditError::Overlap {
                outer: outer.clone(),
                inner: inner.clone(),
            });
        }
        Ok(())
    }

    pub(crate) fn extract(&self, target: &Target) -> Result<E::Fragment, EditError> {
        let (sheet, location) = self.resolve(target)?;
        self.program
            .engine
            .extract(&sheet.content, location)
            .ok_or_else(|| EditError::Unresolved(target.clone()))
    }

    pub(crate) fn delete(&mut self, target: &Target) -> Result<(), EditError> {
        self.resolve(target)?;
        let program = self.program;
        let engine = &program.engine;
        let sheet = self.sheet_mut(&target.file)?;
        engine
            .delete(sheet, target.point)
            .ok_or_else(|| EditError::Unresolved(target.clone()))
    }

    pub(crate) fn replace(&mut self, target: &Target, fragment: E::Fragment) -> Result<(), EditError> {
        self.resolve(target)?;
        let program = self.program;
        let engine = &program.engine;
        let sheet = self.sheet_mut(&target.file)?;
        engine
            .replace(sheet, target.point, fragment)
            .ok_or_else(|| EditError::Unresolved(target.clone()))
    }

    pub(crate) fn insert(&mut self, target: &Target, fragment: E::Fragment, placement: Placement) -> Result<usize, EditError> {
        self.resolve(target)?;
        let program = self.program;
        let engine = &program.engine;
        let sheet = self.sheet_mut(&target.file)?;
        engine
            .insert(sheet, target.point, fragment, placement)
            .ok_or_else(|| EditError::Unresolved(target.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::{Edit, EditKind};
    use crate::line::LineEngine;
    use crate::markup::MarkupEngine;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn five_lines() -> Program<LineEngine> {
        Program::from_sources(LineEngine, [("f.c", "l0\nl1\nl2\nl3\nl4\n")]).unwrap()
    }

    fn effective_lines(text: &str) -> usize {
        text.lines().filter(|l| !l.is_empty()).count()
    }

    #[test]
    fn empty_patch_leaves_program_untouched() {
        let program = five_lines();
        let variant = program.apply(&Patch::new()).unwrap();
        assert!(!variant.is_touched("f.c"));
        assert_eq!(variant.render(), program.render());
    }

    #[test]
    fn line_deletion_twice_is_a_distinct_patch() {
        let program = five_lines();
        let once = Patch::from(vec![Edit::delete(Target::new("f.c", 2))]);
        let mut twice = once.clone();
        twice.push(Edit::delete(Target::new("f.c", 2)));

        let text = program.apply(&once).unwrap().render_file("f.c").unwrap();
        assert_eq!(effective_lines(&text), 4);
        assert_eq!(program.apply(&twice).unwrap().render_file("f.c").unwrap(), text);

        assert_eq!(twice.len(), 2);
        assert_ne!(once, twice);
        assert_ne!(once.signature(), twice.signature());
    }

    #[test]
    fn apply_never_mutates_the_original() {
        let program = five_lines();
        let patch = Patch::from(vec![Edit::with_ingredient(
            EditKind::InsertBefore,
            Target::new("f.c", 0),
            Target::new("f.c", 4),
        )]);
        let variant = program.apply(&patch).unwrap();
        assert_eq!(variant.render_file("f.c").unwrap(), "l4\nl0\nl1\nl2\nl3\nl4\n");
        assert_eq!(program.render()[0].contents, "l0\nl1\nl2\nl3\nl4\n");
    }

    #[test]
    fn edit_on_removed_point_aborts_the_patch() {
        let program = Program::from_sources(MarkupEngine, [("f.xml", "<r><a>x</a><a>y</a></r>")]).unwrap();
        let patch = Patch::from(vec![
            Edit::delete(Target::new("f.xml", 0)),
            Edit::with_ingredient(EditKind::Replace, Target::new("f.xml", 1), Target::new("f.xml", 0)),
        ]);
        let err = program.apply(&patch).unwrap_err();
        assert_eq!(err, EditError::Unresolved(Target::new("f.xml", 0)));
    }

    #[test]
    fn generic_tree_deletion_merges_tail() {
        let program = Program::from_sources(MarkupEngine, [("f.xml", "<root>c1<a>a1</a>c2<a>a2</a>c3</root>")]).unwrap();
        let variant = program
            .apply(&Patch::from(vec![Edit::delete(Target::new("f.xml", 0))]))
            .unwrap();
        assert_eq!(
            variant.content("f.xml").unwrap().to_markup(),
            "<root>c1c2<a>a2</a>c3</root>"
        );
    }

    #[test]
    fn move_conserves_sibling_text() {
        let program = Program::from_sources(MarkupEngine, [("f.xml", "<r>t0<s>A</s>t1<s>B</s>t2<s>C</s>t3</r>")]).unwrap();
        let patch = Patch::from(vec![Edit::with_ingredient(
            EditKind::MoveAfter,
            Target::new("f.xml", 2),
            Target::new("f.xml", 0),
        )]);
        let variant = program.apply(&patch).unwrap();
        assert_eq!(
            variant.content("f.xml").unwrap().to_markup(),
            "<r>t0t1<s>B</s>t2<s>C</s><s>A</s>t3</r>"
        );
        let before: String = program.content("f.xml").unwrap().itertext().chars().filter(|c| *c != 'A').collect();
        let after: String = variant.content("f.xml").unwrap().itertext().chars().filter(|c| *c != 'A').collect();
        let sorted = |s: String| {
            let mut v: Vec<char> = s.chars().collect();
            v.sort_unstable();
            v
        };
        assert_eq!(sorted(before), sorted(after));
    }

    #[test]
    fn swap_keeps_each_tail_in_place() {
        let program = Program::from_sources(MarkupEngine, [("f.xml", "<r><s>A</s>1<s>B</s>2</r>")]).unwrap();
        let patch = Patch::from(vec![Edit::with_ingredient(
            EditKind::Swap,
            Target::new("f.xml", 0),
            Target::new("f.xml", 1),
        )]);
        let variant = program.apply(&patch).unwrap();
        assert_eq!(variant.content("f.xml").unwrap().to_markup(), "<r><s>B</s>1<s>A</s>2</r>");
    }

    #[test]
    fn insertion_and_deletion_change_live_points_by_one() {
        let program = Program::from_sources(MarkupEngine, [("f.xml", "<r><a/><a/><a/></r>")]).unwrap();
        let live = |patch: &Patch| {
            program
                .apply(patch)
                .unwrap()
                .sheet("f.xml")
                .unwrap()
                .live_points()
        };
        let insert = Patch::from(vec![Edit::with_ingredient(
            EditKind::InsertBefore,
            Target::new("f.xml", 1),
            Target::new("f.xml", 0),
        )]);
        let delete = Patch::from(vec![Edit::delete(Target::new("f.xml", 1))]);
        assert_eq!(live(&Patch::new()), 3);
        assert_eq!(live(&insert), 4);
        assert_eq!(live(&delete), 2);
    }

    #[test]
    fn weighted_selection_follows_weights() {
        let mut program = five_lines();
        program.set_weights("f.c", vec![0.0, 0.0, 1.0, 0.0, 0.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            assert_eq!(program.select_point("f.c", PointSelection::Weighted, &mut rng), Some(2));
        }
    }

    #[test]
    fn all_zero_weights_fall_back_to_uniform() {
        let mut program = five_lines();
        program.set_weights("f.c", vec![0.0; 5]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let point = program.select_point("f.c", PointSelection::Weighted, &mut rng).unwrap();
        assert!(point < 5);
    }

    #[test]
    fn set_weights_validates_input() {
        let mut program = five_lines();
        assert!(matches!(
            program.set_weights("f.c", vec![0.5; 4]),
            Err(ProgramError::InvalidWeights { .. })
        ));
        assert!(matches!(
            program.set_weights("f.c", vec![1.5, 0.0, 0.0, 0.0, 0.0]),
            Err(ProgramError::InvalidWeights { .. })
        ));
        assert!(matches!(
            program.set_weights("g.c", vec![]),
            Err(ProgramError::UnknownFile(_))
        ));
    }

    #[test]
    fn describe_points_lists_previews() {
        let program = five_lines();
        let points = program.describe_points("f.c").unwrap();
        assert_eq!(points.len(), 5);
        assert_eq!(points[3].preview, "l3");
        assert_eq!(points[3].location, "3");
    }

    #[test]
    fn no_sources_is_an_error() {
        let sources: Vec<(String, String)> = Vec::new();
        assert!(matches!(
            Program::from_sources(LineEngine, sources),
            Err(ProgramError::NoTargets)
        ));
    }
}
