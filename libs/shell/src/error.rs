//! Error types for command execution.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from running an external command.
#[derive(Debug, Error)]
pub enum RunError {
    /// The working directory does not exist.
    #[error("working directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// The shell could not be started.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The command ran and exited unsuccessfully.
    #[error("`{command}` failed ({}): {stderr}", exit_label(.exit_code))]
    Failed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
}

impl RunError {
    /// The command this error refers to, if any.
    pub fn command(&self) -> Option<&str> {
        match self {
            RunError::MissingDirectory(_) => None,
            RunError::Spawn { command, .. } | RunError::Failed { command, .. } => Some(command),
        }
    }

    /// Exit code of a command that ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunError::Failed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
