//! Shell command runner.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::RunError;

/// Output of a successfully completed command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// The command line as given to the runner.
    pub command: String,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Wall-clock time the command took.
    pub duration: Duration,
}

/// Runs shell commands synchronously in a working directory.
///
/// Implementations block until the command exits and return an error for a
/// non-zero exit status.
pub trait CommandRunner: Send + Sync {
    /// Run a single command line in `dir`.
    fn run(&self, dir: &Path, command: &str) -> Result<CommandOutput, RunError>;

    /// Run a multi-line script one line at a time, stopping at the first failure.
    ///
    /// Blank lines are skipped.
    fn run_script(&self, dir: &Path, script: &str) -> Result<Vec<CommandOutput>, RunError> {
        script
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| self.run(dir, line))
            .collect()
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for Arc<R> {
    fn run(&self, dir: &Path, command: &str) -> Result<CommandOutput, RunError> {
        (**self).run(dir, command)
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, dir: &Path, command: &str) -> Result<CommandOutput, RunError> {
        (**self).run(dir, command)
    }
}

/// Runs commands through `sh -c`.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    env: Vec<(String, String)>,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            env: Vec::new(),
        }
    }
}

impl ShellRunner {
    /// Create a runner using `sh`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different shell binary (it must accept `-c <command>`).
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Set an environment variable for every command.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, dir: &Path, command: &str) -> Result<CommandOutput, RunError> {
        if !dir.is_dir() {
            return Err(RunError::MissingDirectory(dir.to_path_buf()));
        }

        info!(dir = %dir.display(), command = %command, "Running command");
        let start = Instant::now();

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .current_dir(dir)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()
            .map_err(|source| RunError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let duration = start.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        debug!(
            command = %command,
            exit_code = ?output.status.code(),
            duration_ms = duration.as_millis() as u64,
            stdout = %stdout.trim(),
            stderr = %stderr.trim(),
            "Command finished"
        );

        if !output.status.success() {
            return Err(RunError::Failed {
                command: command.to_string(),
                exit_code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(CommandOutput {
            command: command.to_string(),
            stdout,
            stderr,
            duration,
        })
    }
}
