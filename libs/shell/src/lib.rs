//! # itk-shell
//!
//! The command-execution primitive used by itk suites.
//!
//! Commands run synchronously through a shell in a given working directory.
//! A command that exits non-zero is an error; callers propagate it to fail
//! the enclosing test.

mod error;
mod runner;

pub use error::RunError;
pub use runner::{CommandOutput, CommandRunner, ShellRunner};
