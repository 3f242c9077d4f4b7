//! Shell commands under a hard timeout
//!
//! Every command runs as `sh -c <command>` in its own process group. When
//! the limit expires the whole group receives SIGKILL and the direct child
//! is reaped before [`run_shell`] returns, so no process outlives the
//! evaluation that started it.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{EvalError, Result};

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// Exit code (`None` if terminated by a signal)
    pub exit_code: Option<i32>,
    /// Captured stdout (lossy UTF-8)
    pub stdout: String,
    /// Captured stderr (lossy UTF-8)
    pub stderr: String,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl RunOutput {
    /// Whether the process exited with `success_code`
    #[inline]
    #[must_use]
    pub fn succeeded(&self, success_code: i32) -> bool {
        self.exit_code == Some(success_code)
    }
}

/// How a command ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Exited on its own
    Completed(RunOutput),
    /// Killed after exceeding its limit
    TimedOut {
        /// Time spent before the kill
        elapsed: Duration,
    },
}

/// Run `command` through `sh -c` in `cwd`, killing it after `limit`
///
/// # Errors
/// Returns error if the shell cannot be spawned or waited on
pub async fn run_shell(command: &str, cwd: &Path, limit: Duration) -> Result<Outcome> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|source| EvalError::Spawn {
        command: command.to_string(),
        source,
    })?;
    let pid = child.id();
    trace!(command, ?pid, ?limit, "spawned");

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let waited = tokio::time::timeout(limit, async {
        tokio::join!(read_pipe(stdout), read_pipe(stderr), child.wait())
    })
    .await;

    match waited {
        Ok((stdout, stderr, status)) => {
            let status = status.map_err(|e| EvalError::io(cwd, e))?;
            let elapsed = started.elapsed();
            debug!(command, code = ?status.code(), ?elapsed, "command finished");
            Ok(Outcome::Completed(RunOutput {
                exit_code: status.code(),
                stdout,
                stderr,
                elapsed,
            }))
        }
        Err(_) => {
            kill_group(pid);
            if let Err(e) = child.kill().await {
                debug!(command, error = %e, "child already gone");
            }
            let elapsed = started.elapsed();
            debug!(command, ?elapsed, "command timed out");
            Ok(Outcome::TimedOut { elapsed })
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            trace!(error = %e, "pipe read interrupted");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        debug!(pid, error = %e, "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}
