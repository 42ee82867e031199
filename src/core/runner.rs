//! Step runner: the atomic unit every pipeline step builds on.
//!
//! Runs one external command in a given working directory and reports the
//! exit status. The working directory is passed to the subprocess
//! explicitly rather than set process-wide, so runs for different projects
//! can execute concurrently without sharing directory state.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// An external command: program plus argument list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// A step's command failed to start or exited non-zero
#[derive(Debug, Error)]
pub enum StepError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {status}")]
    Exit { command: String, status: i32 },
}

/// Executes a single command in a working directory.
///
/// The seam the orchestrator is tested through: integration tests
/// substitute a recording fake for the subprocess-backed implementation.
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Run `command` in `workdir`; Ok iff the command exits 0.
    ///
    /// No retry, no timeout. Long-running builds are allowed to run
    /// unbounded.
    async fn execute(&self, command: &CommandSpec, workdir: &Path) -> Result<(), StepError>;
}

/// Subprocess-backed runner used in production.
///
/// Stdout/stderr are inherited so build tool output lands in the daemon's
/// log stream, as the original service streamed its shell output.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StepRunner for ProcessRunner {
    async fn execute(&self, command: &CommandSpec, workdir: &Path) -> Result<(), StepError> {
        debug!(command = %command, workdir = %workdir.display(), "executing step command");

        let status = Command::new(&command.program)
            .args(&command.args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| StepError::Spawn {
                command: command.to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(StepError::Exit {
                command: command.to_string(),
                status: status.code().unwrap_or(-1),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display() {
        let command = CommandSpec::new("git", ["pull", "origin", "master"]);
        assert_eq!(command.to_string(), "git pull origin master");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let runner = ProcessRunner::new();
        let command = CommandSpec::new("true", Vec::<String>::new());

        assert!(runner.execute(&command, Path::new("/")).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_carries_command_and_status() {
        let runner = ProcessRunner::new();
        let command = CommandSpec::new("sh", ["-c", "exit 3"]);

        let err = runner.execute(&command, Path::new("/")).await.unwrap_err();
        match err {
            StepError::Exit { command, status } => {
                assert_eq!(status, 3);
                assert!(command.starts_with("sh -c"));
            }
            other => panic!("expected Exit error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let runner = ProcessRunner::new();
        let command = CommandSpec::new("definitely-not-a-real-program", Vec::<String>::new());

        let err = runner.execute(&command, Path::new("/")).await.unwrap_err();
        assert!(matches!(err, StepError::Spawn { .. }));
    }
}
