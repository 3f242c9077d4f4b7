//! Project descriptor
//!
//! Everything the harness needs to know about a project: which files are
//! evolved, how to build and run the staged copy, and how to read a
//! fitness value from its output. Loaded from TOML or JSON:
//!
//! ```toml
//! target_files = ["src/sort.py"]
//! run_command = "python3 bench.py {instance}"
//! instances = ["small", "large"]
//! run_timeout_secs = 10.0
//!
//! [fitness.counter]
//! name = "comparisons"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::output::{ElapsedTime, NamedCounter, OutputParser, PassFail, TaggedBlock};

/// Default descriptor file name inside a project root
pub const DEFAULT_DESCRIPTOR: &str = "gi.toml";

/// Placeholder in `run_command` replaced by the instance name
pub const INSTANCE_PLACEHOLDER: &str = "{instance}";

/// How fitness is read from a finished run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessSpec {
    /// Wall-clock seconds of the run
    #[default]
    ElapsedTime,
    /// 0 on the success code, 1 otherwise
    PassFail,
    /// Key of a `[RESULT] {k: v, ...}` block on stdout
    Tagged {
        /// Block marker
        #[serde(default = "default_marker")]
        marker: String,
        /// Key holding the fitness value
        key: String,
    },
    /// Integer from a `name: <n>` line on stdout
    Counter {
        /// Counter name
        name: String,
    },
}

fn default_marker() -> String {
    TaggedBlock::DEFAULT_MARKER.to_string()
}

fn default_compile_timeout() -> f64 {
    60.0
}

fn default_run_timeout() -> f64 {
    15.0
}

/// Project description read from `gi.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectDescriptor {
    /// Evolved files, relative to the project root
    pub target_files: Vec<String>,

    /// Shell command run in the staged copy
    pub run_command: String,

    /// Optional build step run before the instances
    #[serde(default)]
    pub compile_command: Option<String>,

    /// Test instances; the run command is executed once per instance
    #[serde(default)]
    pub instances: Vec<String>,

    /// Compile step limit in seconds
    #[serde(default = "default_compile_timeout")]
    pub compile_timeout_secs: f64,

    /// Budget shared by all instance runs of one evaluation, in seconds
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: f64,

    /// Exit code meaning a usable result
    #[serde(default)]
    pub success_code: i32,

    /// Record each instance's first pass/fail and reject later divergence
    #[serde(default)]
    pub oracle: bool,

    /// Fitness source
    #[serde(default)]
    pub fitness: FitnessSpec,

    /// Subtract the unpatched program's fitness
    #[serde(default)]
    pub relative_to_baseline: bool,

    /// Staging directory (defaults to a per-process temp directory)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl ProjectDescriptor {
    /// Minimal descriptor with defaults for everything optional
    #[must_use]
    pub fn new(target_files: Vec<String>, run_command: impl Into<String>) -> Self {
        Self {
            target_files,
            run_command: run_command.into(),
            compile_command: None,
            instances: Vec::new(),
            compile_timeout_secs: default_compile_timeout(),
            run_timeout_secs: default_run_timeout(),
            success_code: 0,
            oracle: false,
            fitness: FitnessSpec::default(),
            relative_to_baseline: false,
            scratch_dir: None,
        }
    }

    /// Load and validate a descriptor, format chosen by extension
    ///
    /// # Errors
    /// Returns error if the file cannot be read, has an unknown extension,
    /// does not parse, or fails validation
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
        let descriptor = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&text)?,
            Some("json") => Self::from_json_str(&text)?,
            _ => return Err(EvalError::DescriptorFormat(path.to_path_buf())),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Parse TOML
    ///
    /// # Errors
    /// Returns error on malformed TOML
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Parse JSON
    ///
    /// # Errors
    /// Returns error on malformed JSON
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reject descriptors the harness cannot run
    ///
    /// # Errors
    /// Returns error on empty targets, an empty command, non-positive
    /// timeouts or an unusable fitness pattern
    pub fn validate(&self) -> Result<()> {
        if self.target_files.is_empty() {
            return Err(EvalError::invalid("target_files is empty"));
        }
        if self.run_command.trim().is_empty() {
            return Err(EvalError::invalid("run_command is empty"));
        }
        if self.compile_command.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(EvalError::invalid("compile_command is empty"));
        }
        for (name, secs) in [
            ("compile_timeout_secs", self.compile_timeout_secs),
            ("run_timeout_secs", self.run_timeout_secs),
        ] {
            match Duration::try_from_secs_f64(secs) {
                Ok(limit) if !limit.is_zero() => {}
                Ok(_) => return Err(EvalError::invalid(format!("{name} must be positive"))),
                Err(e) => return Err(EvalError::invalid(format!("{name} = {secs}: {e}"))),
            }
        }
        self.output_parser().map(|_| ())
    }

    /// Compile step limit
    ///
    /// Saturates on out-of-range values, which [`validate`](Self::validate)
    /// rejects.
    #[must_use]
    pub fn compile_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.compile_timeout_secs).unwrap_or(Duration::MAX)
    }

    /// Run budget per evaluation
    #[must_use]
    pub fn run_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.run_timeout_secs).unwrap_or(Duration::MAX)
    }

    /// Run command for one instance (or the bare command)
    #[must_use]
    pub fn instance_command(&self, instance: Option<&str>) -> String {
        match instance {
            Some(instance) if self.run_command.contains(INSTANCE_PLACEHOLDER) => {
                self.run_command.replace(INSTANCE_PLACEHOLDER, instance)
            }
            Some(instance) => format!("{} {instance}", self.run_command),
            None => self.run_command.clone(),
        }
    }

    /// Build the configured output parser
    ///
    /// # Errors
    /// Returns error if a marker or counter name yields an invalid pattern
    pub fn output_parser(&self) -> Result<Box<dyn OutputParser>> {
        Ok(match &self.fitness {
            FitnessSpec::ElapsedTime => Box::new(ElapsedTime),
            FitnessSpec::PassFail => Box::new(PassFail::new(self.success_code)),
            FitnessSpec::Tagged { marker, key } => Box::new(TaggedBlock::new(marker, key.clone())?),
            FitnessSpec::Counter { name } => Box::new(NamedCounter::new(name)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn toml_with_defaults() {
        let descriptor = ProjectDescriptor::from_toml_str(
            r#"
            target_files = ["a.c"]
            run_command = "./run.sh"
            "#,
        )
        .unwrap();
        assert_eq!(descriptor, ProjectDescriptor::new(vec!["a.c".into()], "./run.sh"));
        assert_eq!(descriptor.run_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn toml_fitness_variants() {
        let tagged = ProjectDescriptor::from_toml_str(
            r#"
            target_files = ["a.c"]
            run_command = "./run.sh"
            [fitness.tagged]
            key = "runtime"
            "#,
        )
        .unwrap();
        assert_eq!(
            tagged.fitness,
            FitnessSpec::Tagged {
                marker: "[RESULT]".into(),
                key: "runtime".into()
            }
        );

        let pass_fail = ProjectDescriptor::from_toml_str(
            r#"
            target_files = ["a.c"]
            run_command = "./run.sh"
            fitness = "pass_fail"
            "#,
        )
        .unwrap();
        assert_eq!(pass_fail.fitness, FitnessSpec::PassFail);
    }

    #[test]
    fn json_descriptor() {
        let descriptor = ProjectDescriptor::from_json_str(
            r#"{
                "target_files": ["x.xml"],
                "run_command": "make run",
                "oracle": true,
                "success_code": 10,
                "fitness": {"counter": {"name": "Log_count64"}}
            }"#,
        )
        .unwrap();
        assert!(descriptor.oracle);
        assert_eq!(descriptor.success_code, 10);
        assert!(descriptor.validate().is_ok());
    }

    #[test]
    fn instance_substitution() {
        let mut descriptor = ProjectDescriptor::new(vec!["a".into()], "./solve {instance} --quiet");
        assert_eq!(descriptor.instance_command(Some("x.cnf")), "./solve x.cnf --quiet");
        descriptor.run_command = "./solve".into();
        assert_eq!(descriptor.instance_command(Some("x.cnf")), "./solve x.cnf");
        assert_eq!(descriptor.instance_command(None), "./solve");
    }

    #[test]
    fn validation_rejects_unusable_descriptors() {
        let empty_targets = ProjectDescriptor::new(vec![], "./run");
        assert!(matches!(empty_targets.validate(), Err(EvalError::InvalidDescriptor(_))));

        let empty_command = ProjectDescriptor::new(vec!["a".into()], "  ");
        assert!(matches!(empty_command.validate(), Err(EvalError::InvalidDescriptor(_))));

        let mut zero_timeout = ProjectDescriptor::new(vec!["a".into()], "./run");
        zero_timeout.run_timeout_secs = 0.0;
        assert!(matches!(zero_timeout.validate(), Err(EvalError::InvalidDescriptor(_))));

        let mut huge_timeout = ProjectDescriptor::new(vec!["a".into()], "./run");
        huge_timeout.compile_timeout_secs = 1e30;
        assert!(matches!(huge_timeout.validate(), Err(EvalError::InvalidDescriptor(_))));
        assert_eq!(huge_timeout.compile_timeout(), Duration::MAX);

        let mut nan_timeout = ProjectDescriptor::new(vec!["a".into()], "./run");
        nan_timeout.run_timeout_secs = f64::NAN;
        assert!(matches!(nan_timeout.validate(), Err(EvalError::InvalidDescriptor(_))));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = ProjectDescriptor::from_toml_str(
            r#"
            target_files = ["a.c"]
            run_command = "./run.sh"
            run_cmd = "typo"
            "#,
        );
        assert!(matches!(result, Err(EvalError::Toml(_))));
    }
}
