//! Scratch staging
//!
//! Each evaluation runs in a fresh copy of the project: the scratch
//! directory is wiped, recreated from the canonical root and then the
//! rendered target files are written over their originals.

use std::fs;
use std::path::{Path, PathBuf};

use gi_program::RenderedFile;
use tracing::trace;
use walkdir::WalkDir;

use crate::error::{EvalError, Result};

/// One scratch directory mirroring a project root
#[derive(Debug, Clone)]
pub struct Scratch {
    source: PathBuf,
    root: PathBuf,
}

impl Scratch {
    /// Scratch copy of `source` at `root`
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            root: root.into(),
        }
    }

    /// Default location: a per-process directory under the system temp dir
    #[must_use]
    pub fn default_root(source: &Path) -> PathBuf {
        let name = source
            .file_name()
            .map_or_else(|| "project".into(), |n| n.to_string_lossy().into_owned());
        std::env::temp_dir().join(format!("gi-{name}-{}", std::process::id()))
    }

    /// Canonical project root
    #[inline]
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Staging directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Wipe the scratch directory and copy the project into it
    ///
    /// # Errors
    /// Returns error on any filesystem failure
    pub fn reset(&self) -> Result<()> {
        self.remove()?;
        fs::create_dir_all(&self.root).map_err(|e| EvalError::io(&self.root, e))?;

        let walker = WalkDir::new(&self.source)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| entry.path() != self.root);
        for entry in walker {
            let entry = entry?;
            let relative = entry.path().strip_prefix(&self.source).unwrap_or(entry.path());
            let dest = self.root.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&dest).map_err(|e| EvalError::io(&dest, e))?;
            } else {
                fs::copy(entry.path(), &dest).map_err(|e| EvalError::io(entry.path(), e))?;
            }
        }
        Ok(())
    }

    /// Write rendered target files into the scratch directory
    ///
    /// # Errors
    /// Returns error if a file cannot be written
    pub fn write(&self, files: &[RenderedFile]) -> Result<()> {
        for file in files {
            let dest = self.root.join(&file.name);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
            }
            fs::write(&dest, &file.contents).map_err(|e| EvalError::io(&dest, e))?;
            trace!(file = %dest.display(), "staged");
        }
        Ok(())
    }

    /// [`reset`](Self::reset) then [`write`](Self::write)
    ///
    /// # Errors
    /// Returns error on any filesystem failure
    pub fn stage(&self, files: &[RenderedFile]) -> Result<()> {
        self.reset()?;
        self.write(files)
    }

    /// Delete the scratch directory if present
    ///
    /// # Errors
    /// Returns error if an existing directory cannot be removed
    pub fn remove(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EvalError::io(&self.root, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.c"), "original\n").unwrap();
        fs::write(dir.path().join("run.sh"), "echo hi\n").unwrap();
        dir
    }

    #[test]
    fn stage_copies_project_and_overwrites_targets() {
        let project = project();
        let out = tempfile::tempdir().unwrap();
        let scratch = Scratch::new(project.path(), out.path().join("scratch"));

        scratch
            .stage(&[RenderedFile {
                name: "src/main.c".into(),
                contents: "patched\n".into(),
            }])
            .unwrap();

        let root = scratch.root();
        assert_eq!(fs::read_to_string(root.join("run.sh")).unwrap(), "echo hi\n");
        assert_eq!(fs::read_to_string(root.join("src/main.c")).unwrap(), "patched\n");
        assert_eq!(
            fs::read_to_string(project.path().join("src/main.c")).unwrap(),
            "original\n"
        );
    }

    #[test]
    fn reset_discards_previous_artifacts() {
        let project = project();
        let out = tempfile::tempdir().unwrap();
        let scratch = Scratch::new(project.path(), out.path().join("scratch"));
        scratch.reset().unwrap();
        fs::write(scratch.root().join("a.out"), "binary").unwrap();

        scratch.reset().unwrap();
        assert!(!scratch.root().join("a.out").exists());
        assert!(scratch.root().join("src/main.c").exists());
    }

    #[test]
    fn nested_scratch_is_not_copied_into_itself() {
        let project = project();
        let scratch = Scratch::new(project.path(), project.path().join(".gi-scratch"));
        scratch.reset().unwrap();
        scratch.reset().unwrap();
        assert!(!scratch.root().join(".gi-scratch").exists());
        assert!(scratch.root().join("run.sh").exists());
    }
}
