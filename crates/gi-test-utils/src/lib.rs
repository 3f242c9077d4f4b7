//! Testing utilities for the GI workspace
//!
//! Shared fixtures: programs from inline sources, scripted evaluators and
//! throwaway project directories.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gi_eval::{Evaluation, Evaluator, ProjectDescriptor, Stage, Status, DEFAULT_DESCRIPTOR};
use gi_program::{LineEngine, MarkupEngine, Patch, Program, StatementEngine};
use tempfile::TempDir;

pub fn line_program(sources: &[(&str, &str)]) -> Program<LineEngine> {
    Program::from_sources(LineEngine, sources.iter().copied()).unwrap()
}

pub fn markup_program(sources: &[(&str, &str)]) -> Program<MarkupEngine> {
    Program::from_sources(MarkupEngine, sources.iter().copied()).unwrap()
}

pub fn statement_program(sources: &[(&str, &str)]) -> Program<StatementEngine> {
    Program::from_sources(StatementEngine, sources.iter().copied()).unwrap()
}

type Script = Box<dyn FnMut(&Patch) -> Evaluation + Send>;

/// Evaluator answering from a closure instead of running processes
pub struct ScriptedEvaluator {
    script: Script,
    calls: Arc<AtomicUsize>,
}

impl ScriptedEvaluator {
    /// `Some(f)` is a viable fitness, `None` a run failure
    pub fn new(mut fitness: impl FnMut(&Patch) -> Option<f64> + Send + 'static) -> Self {
        Self::from_fn(move |patch| match fitness(patch) {
            Some(f) => Evaluation::normal(f, Duration::ZERO),
            None => Evaluation::failure(Status::ParseError, Stage::Run, Duration::ZERO),
        })
    }

    /// Full control over the returned evaluation
    pub fn from_fn(script: impl FnMut(&Patch) -> Evaluation + Send + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fitness is the patch length
    #[allow(clippy::cast_precision_loss)]
    pub fn patch_length() -> Self {
        Self::new(|patch| Some(patch.len() as f64))
    }

    /// Shared counter of `evaluate` calls, readable after the evaluator is moved
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ScriptedEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedEvaluator")
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
    async fn evaluate(&mut self, patch: &Patch) -> Evaluation {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(patch)
    }
}

/// Project directory deleted on drop
#[derive(Debug)]
pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for (name, contents) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, contents).unwrap();
        }
        Self { dir }
    }

    /// Write `descriptor` as `gi.toml`
    pub fn with_descriptor(self, descriptor: &ProjectDescriptor) -> Self {
        fs::write(self.descriptor_path(), toml::to_string(descriptor).unwrap()).unwrap();
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.dir.path().join(DEFAULT_DESCRIPTOR)
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.dir.path().join(name)).unwrap()
    }
}

pub fn temp_project(files: &[(&str, &str)], descriptor: &ProjectDescriptor) -> TempProject {
    TempProject::new(files).with_descriptor(descriptor)
}
