//! Fitness parsers
//!
//! An [`OutputParser`] turns one finished run into a fitness value, or
//! `None` if the output carries no usable measurement.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::Result;
use crate::process::RunOutput;

/// Reads a fitness value from a finished run
pub trait OutputParser: Send + Sync + std::fmt::Debug {
    /// Parser name for logs and reports
    fn name(&self) -> &'static str;

    /// Fitness of `output`, `None` if unparseable
    fn fitness(&self, output: &RunOutput) -> Option<f64>;

    /// Whether the exit code is the measurement itself rather than a
    /// failure signal
    fn reads_exit_code(&self) -> bool {
        false
    }
}

/// `[RESULT] {k1: v1, k2: v2}` block on stdout
#[derive(Debug, Clone)]
pub struct TaggedBlock {
    key: String,
    pattern: Regex,
}

impl TaggedBlock {
    /// Marker used when none is configured
    pub const DEFAULT_MARKER: &'static str = "[RESULT]";

    /// Parser reading `key` from blocks introduced by `marker`
    ///
    /// # Errors
    /// Returns error if the pattern cannot be built
    pub fn new(marker: &str, key: impl Into<String>) -> Result<Self> {
        let pattern = Regex::new(&format!(r"{}\s*\{{(.*?)\}}", regex::escape(marker)))?;
        Ok(Self {
            key: key.into(),
            pattern,
        })
    }

    /// Fields of the first block in `stdout`; empty without a block
    #[must_use]
    pub fn fields(&self, stdout: &str) -> BTreeMap<String, String> {
        let Some(body) = self.pattern.captures(stdout).and_then(|c| c.get(1)) else {
            return BTreeMap::new();
        };
        body.as_str()
            .split(',')
            .filter_map(|field| {
                let (key, value) = field.split_once(':')?;
                Some((key.trim().to_string(), value.trim().to_string()))
            })
            .collect()
    }
}

impl OutputParser for TaggedBlock {
    fn name(&self) -> &'static str {
        "tagged"
    }

    fn fitness(&self, output: &RunOutput) -> Option<f64> {
        self.fields(&output.stdout).get(&self.key)?.parse().ok()
    }
}

/// `<name>: <integer>` line on stdout
#[derive(Debug, Clone)]
pub struct NamedCounter {
    pattern: Regex,
}

impl NamedCounter {
    /// Parser for counter `name`
    ///
    /// # Errors
    /// Returns error if the pattern cannot be built
    pub fn new(name: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(r"(?m)^{}:\s*(\d+)\s*$", regex::escape(name)))?;
        Ok(Self { pattern })
    }
}

impl OutputParser for NamedCounter {
    fn name(&self) -> &'static str {
        "counter"
    }

    #[allow(clippy::cast_precision_loss)]
    fn fitness(&self, output: &RunOutput) -> Option<f64> {
        let count: u64 = self.pattern.captures(&output.stdout)?.get(1)?.as_str().parse().ok()?;
        Some(count as f64)
    }
}

/// Wall-clock seconds of the run
#[derive(Debug, Clone, Copy, Default)]
pub struct ElapsedTime;

impl OutputParser for ElapsedTime {
    fn name(&self) -> &'static str {
        "elapsed_time"
    }

    fn fitness(&self, output: &RunOutput) -> Option<f64> {
        Some(output.elapsed.as_secs_f64())
    }
}

/// 0 when the run exits with the success code, 1 otherwise
#[derive(Debug, Clone, Copy)]
pub struct PassFail {
    success_code: i32,
}

impl PassFail {
    /// Parser judging against `success_code`
    #[must_use]
    pub fn new(success_code: i32) -> Self {
        Self { success_code }
    }
}

impl OutputParser for PassFail {
    fn name(&self) -> &'static str {
        "pass_fail"
    }

    fn fitness(&self, output: &RunOutput) -> Option<f64> {
        Some(if output.succeeded(self.success_code) { 0.0 } else { 1.0 })
    }

    fn reads_exit_code(&self) -> bool {
        true
    }
}
