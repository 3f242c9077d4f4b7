//! The evaluation harness
//!
//! [`Harness`] scores a patch by staging the patched program into its
//! scratch directory, building it, and running it once per test instance
//! under a shared time budget.
//!
//! # Pipeline
//!
//! 1. Memo lookup by [`PatchSignature`](gi_program::PatchSignature)
//! 2. Apply the patch (failure: `ParseError` at `Apply`)
//! 3. Stage into scratch
//! 4. Compile (timeout: `TimeOut`; bad exit: `ParseError`)
//! 5. Run every instance against the remaining budget, check the truth
//!    table, parse and sum fitness
//! 6. Subtract the baseline if configured, then memoize

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use gi_program::{Engine, Patch, Program};
use tracing::{debug, info, warn};

use crate::cache::EvaluationCache;
use crate::descriptor::ProjectDescriptor;
use crate::error::Result;
use crate::evaluation::{Evaluation, Evaluator, Stage, Status};
use crate::output::OutputParser;
use crate::process::{self, Outcome};
use crate::scratch::Scratch;
use crate::truth::{TruthTable, Verdict};

/// Evaluator running patched programs through external commands
#[derive(Debug)]
pub struct Harness<E: Engine> {
    program: Arc<Program<E>>,
    descriptor: ProjectDescriptor,
    scratch: Scratch,
    parser: Box<dyn OutputParser>,
    cache: EvaluationCache,
    truth: TruthTable,
    baseline: Option<f64>,
}

impl<E: Engine> Harness<E> {
    /// Create a harness for `program`, staged from `project_root`
    ///
    /// # Errors
    /// Returns error if the descriptor is invalid
    pub fn new(program: Arc<Program<E>>, descriptor: ProjectDescriptor, project_root: impl Into<PathBuf>) -> Result<Self> {
        descriptor.validate()?;
        let project_root = project_root.into();
        let scratch_root = match &descriptor.scratch_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => project_root.join(dir),
            None => Scratch::default_root(&project_root),
        };
        let parser = descriptor.output_parser()?;
        info!(
            root = %project_root.display(),
            scratch = %scratch_root.display(),
            parser = parser.name(),
            instances = descriptor.instances.len(),
            "harness ready"
        );
        Ok(Self {
            program,
            scratch: Scratch::new(project_root, scratch_root),
            parser,
            descriptor,
            cache: EvaluationCache::default(),
            truth: TruthTable::new(),
            baseline: None,
        })
    }

    /// Replace the memo
    #[must_use]
    pub fn with_cache(mut self, cache: EvaluationCache) -> Self {
        self.cache = cache;
        self
    }

    /// Program under improvement
    #[inline]
    #[must_use]
    pub fn program(&self) -> &Program<E> {
        &self.program
    }

    /// Project descriptor
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &ProjectDescriptor {
        &self.descriptor
    }

    /// Truth table recorded so far
    #[inline]
    #[must_use]
    pub fn truth_table(&self) -> &TruthTable {
        &self.truth
    }

    /// Memo of viable evaluations
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &EvaluationCache {
        &self.cache
    }

    /// Staging directory
    #[inline]
    #[must_use]
    pub fn scratch(&self) -> &Scratch {
        &self.scratch
    }

    /// Unpatched fitness, once measured
    #[inline]
    #[must_use]
    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }

    /// Delete the scratch directory
    ///
    /// # Errors
    /// Returns error if it cannot be removed
    pub fn cleanup(&self) -> Result<()> {
        self.scratch.remove()
    }

    async fn ensure_baseline(&mut self) {
        if self.baseline.is_some() {
            return;
        }
        let evaluation = self.run_uncached(&Patch::new()).await;
        match evaluation.fitness {
            Some(fitness) if evaluation.is_viable() => {
                info!(fitness, "baseline measured");
                self.baseline = Some(fitness);
            }
            _ => warn!(status = %evaluation.status, "baseline not viable; fitness stays absolute"),
        }
    }

    async fn run_uncached(&mut self, patch: &Patch) -> Evaluation {
        let started = Instant::now();
        let fail = |status, stage| Evaluation::failure(status, stage, started.elapsed());

        let files = match self.program.apply(patch) {
            Ok(variant) => variant.render(),
            Err(e) => {
                debug!(%patch, error = %e, "patch does not apply");
                return fail(Status::ParseError, Stage::Apply);
            }
        };
        if let Err(e) = self.scratch.stage(&files) {
            warn!(error = %e, "staging failed");
            return fail(Status::ParseError, Stage::Apply);
        }

        let cwd = self.scratch.root();
        let success_code = self.descriptor.success_code;

        if let Some(command) = &self.descriptor.compile_command {
            match process::run_shell(command, cwd, self.descriptor.compile_timeout()).await {
                Ok(Outcome::TimedOut { .. }) => return fail(Status::TimeOut, Stage::Compile),
                Ok(Outcome::Completed(output)) if !output.succeeded(success_code) => {
                    debug!(code = ?output.exit_code, stderr = %output.stderr.trim_end(), "compile failed");
                    return fail(Status::ParseError, Stage::Compile);
                }
                Ok(Outcome::Completed(_)) => {}
                Err(e) => {
                    warn!(error = %e, "compile command could not run");
                    return fail(Status::ParseError, Stage::Compile);
                }
            }
        }

        let instances: Vec<Option<&str>> = if self.descriptor.instances.is_empty() {
            vec![None]
        } else {
            self.descriptor.instances.iter().map(|i| Some(i.as_str())).collect()
        };

        let mut remaining = self.descriptor.run_timeout();
        let mut total = 0.0;
        for instance in instances {
            if remaining.is_zero() {
                return fail(Status::TimeOut, Stage::Run);
            }
            let command = self.descriptor.instance_command(instance);
            let output = match process::run_shell(&command, cwd, remaining).await {
                Ok(Outcome::Completed(output)) => output,
                Ok(Outcome::TimedOut { .. }) => return fail(Status::TimeOut, Stage::Run),
                Err(e) => {
                    warn!(error = %e, "run command could not run");
                    return fail(Status::ParseError, Stage::Run);
                }
            };
            remaining = remaining.saturating_sub(output.elapsed);

            let passed = output.succeeded(success_code);
            if self.descriptor.oracle {
                if self.truth.check(instance.unwrap_or_default(), passed) == Verdict::Diverges {
                    debug!(instance, passed, "instance diverges from truth table");
                    return fail(Status::ParseError, Stage::Fail);
                }
            } else if !passed && !self.parser.reads_exit_code() {
                debug!(instance, code = ?output.exit_code, "run failed");
                return fail(Status::ParseError, Stage::Run);
            }

            match self.parser.fitness(&output) {
                Some(fitness) => total += fitness,
                None => {
                    debug!(instance, parser = self.parser.name(), "no fitness in output");
                    return fail(Status::ParseError, Stage::Run);
                }
            }
        }
        Evaluation::normal(total, started.elapsed())
    }
}

#[async_trait]
impl<E: Engine> Evaluator for Harness<E> {
    async fn evaluate(&mut self, patch: &Patch) -> Evaluation {
        let signature = patch.signature();
        if let Some(hit) = self.cache.get(&signature).await {
            debug!(%patch, "memo hit");
            return hit;
        }
        if self.descriptor.relative_to_baseline {
            self.ensure_baseline().await;
        }

        let mut evaluation = self.run_uncached(patch).await;
        if let (Some(fitness), Some(baseline)) = (evaluation.fitness.as_mut(), self.baseline) {
            *fitness -= baseline;
        }
        debug!(
            %patch,
            status = %evaluation.status,
            stage = ?evaluation.stage,
            fitness = ?evaluation.fitness,
            elapsed = ?evaluation.elapsed,
            "evaluated"
        );
        self.cache.insert(signature, evaluation.clone()).await;
        evaluation
    }
}
