//! Line granularity
//!
//! Content is the file's lines (right-trimmed) and a point is a line offset.
//! Deleting blanks the line in place, so offsets only move on insertion.

use crate::engine::{Engine, Placement, Sheet};
use crate::error::ProgramError;

/// Engine over whole source lines
#[derive(Debug, Clone, Copy, Default)]
pub struct LineEngine;

impl Engine for LineEngine {
    type Content = Vec<String>;
    type Location = usize;
    type Fragment = String;

    const NAME: &'static str = "line";

    fn parse(&self, _file: &str, source: &str) -> Result<Sheet<Self>, ProgramError> {
        let lines: Vec<String> = source.lines().map(|l| l.trim_end().to_string()).collect();
        let offsets = (0..lines.len()).collect();
        Ok(Sheet::new(lines, offsets))
    }

    fn render(&self, content: &Self::Content) -> String {
        let mut out = content.join("\n");
        if !content.is_empty() {
            out.push('\n');
        }
        out
    }

    fn describe(&self, content: &Self::Content, location: &usize) -> Option<String> {
        content.get(*location).cloned()
    }

    fn compatible(&self, target: (&Self::Content, &usize), ingredient: (&Self::Content, &usize)) -> bool {
        *target.1 < target.0.len() && *ingredient.1 < ingredient.0.len()
    }

    fn extract(&self, content: &Self::Content, location: &usize) -> Option<String> {
        content.get(*location).cloned()
    }

    fn delete(&self, sheet: &mut Sheet<Self>, point: usize) -> Option<()> {
        let offset = *sheet.location(point)?;
        sheet.content.get_mut(offset)?.clear();
        Some(())
    }

    fn replace(&self, sheet: &mut Sheet<Self>, point: usize, fragment: String) -> Option<()> {
        let offset = *sheet.location(point)?;
        *sheet.content.get_mut(offset)? = fragment;
        Some(())
    }

    fn insert(&self, sheet: &mut Sheet<Self>, point: usize, fragment: String, placement: Placement) -> Option<usize> {
        let offset = *sheet.location(point)?;
        if offset >= sheet.content.len() {
            return None;
        }
        let at = match placement {
            Placement::Before => offset,
            Placement::After => offset + 1,
        };
        sheet.content.insert(at, fragment);
        for shifted in sheet.points.iter_mut().flatten() {
            if *shifted >= at {
                *shifted += 1;
            }
        }
        sheet.points.push(Some(at));
        Some(sheet.points.len() - 1)
    }
}
