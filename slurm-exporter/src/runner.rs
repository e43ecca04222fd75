// Running the Slurm tools.  Collectors never spawn processes themselves; they go through a
// `CommandRunner`, so tests can substitute canned output.

use async_trait::async_trait;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("`{program}` did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("could not run `{program}`: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("`{program}` failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and return its standard output.
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, ExecError>;
}

/// Runs the real binaries, found on PATH, with a wall-clock limit per invocation.  A command that
/// overruns is killed.

pub struct SlurmCommands {
    timeout: Duration,
}

impl SlurmCommands {
    pub fn new(timeout: Duration) -> SlurmCommands {
        SlurmCommands { timeout }
    }
}

#[async_trait]
impl CommandRunner for SlurmCommands {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, ExecError> {
        let cmdline = format!("{} {}", program, args.join(" "));
        debug!(command = %cmdline, "running");

        let mut command = Command::new(program);
        command.args(args).kill_on_drop(true);
        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => {
                error!(command = %cmdline, timeout = ?self.timeout, "command timed out");
                return Err(ExecError::Timeout {
                    program: program.to_string(),
                    timeout: self.timeout,
                });
            }
            Ok(Err(source)) => {
                error!(command = %cmdline, error = %source, "could not start command");
                return Err(ExecError::Spawn {
                    program: program.to_string(),
                    source,
                });
            }
            Ok(Ok(output)) => output,
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            error!(command = %cmdline, status = %output.status, stderr = %stderr, "command failed");
            return Err(ExecError::Failed {
                program: program.to_string(),
                status: output.status,
                stderr,
            });
        }
        if !stderr.is_empty() {
            warn!(command = %cmdline, stderr = %stderr, "command wrote to stderr");
        }
        debug!(command = %cmdline, bytes = output.stdout.len(), "finished");

        // Job names and node reasons are user text and need not be UTF-8.
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[tokio::test]
async fn test_missing_program() {
    let runner = SlurmCommands::new(Duration::from_secs(5));
    let r = runner.run("/nonexistent/sinfo", &["-h"]).await;
    assert!(matches!(r, Err(ExecError::Spawn { .. })));
}

#[cfg(unix)]
#[tokio::test]
async fn test_stdout_is_returned() {
    let runner = SlurmCommands::new(Duration::from_secs(5));
    let out = runner.run("sh", &["-c", "echo 3/13/0/16; echo noise >&2"]).await.unwrap();
    assert!(out == "3/13/0/16\n");
}

#[cfg(unix)]
#[tokio::test]
async fn test_failure_carries_stderr() {
    let runner = SlurmCommands::new(Duration::from_secs(5));
    match runner.run("sh", &["-c", "echo cannot contact controller >&2; exit 1"]).await {
        Err(ExecError::Failed { stderr, .. }) => assert!(stderr == "cannot contact controller"),
        other => panic!("unexpected {other:?}"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_timeout() {
    let runner = SlurmCommands::new(Duration::from_millis(100));
    let r = runner.run("sleep", &["5"]).await;
    assert!(matches!(r, Err(ExecError::Timeout { .. })));
}
