//! Ready-made suite components.

use std::path::{Path, PathBuf};

use itk_prefetch::{PrefetchReport, Prefetcher};
use itk_shell::CommandRunner;
use tracing::info;

use crate::{Lifecycle, SuiteError};

/// Prefetches manifest images before the rest of the suite starts.
///
/// Every suite in a process shares the prefetcher's guard, so only the first
/// suite to set up actually touches the cluster. Tear-down is a no-op.
pub struct PrefetchStep<R> {
    prefetcher: Prefetcher<R>,
    report: Option<PrefetchReport>,
}

impl<R: CommandRunner> PrefetchStep<R> {
    pub fn new(prefetcher: Prefetcher<R>) -> Self {
        Self {
            prefetcher,
            report: None,
        }
    }

    /// Report of the prefetch run, once set up.
    pub fn report(&self) -> Option<&PrefetchReport> {
        self.report.as_ref()
    }
}

impl<R: CommandRunner> Lifecycle for PrefetchStep<R> {
    fn name(&self) -> &str {
        "prefetch"
    }

    fn set_up(&mut self) -> Result<(), SuiteError> {
        let report = self.prefetcher.prefetch()?;
        info!(
            images = report.images.len(),
            distributed = report.distributed,
            "Images prefetched"
        );
        self.report = Some(report);
        Ok(())
    }
}

/// Runs commands in a directory at set-up and cleanup commands at tear-down.
///
/// Set-up commands run one by one and stop at the first failure. Cleanup
/// commands run as one script at tear-down, even if set-up failed part-way.
pub struct ScriptStep<R> {
    name: String,
    dir: PathBuf,
    runner: R,
    setup: Vec<String>,
    cleanup: Vec<String>,
}

impl<R: CommandRunner> ScriptStep<R> {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            runner,
            setup: Vec::new(),
            cleanup: Vec::new(),
        }
    }

    /// Append a set-up command.
    pub fn run(mut self, command: impl Into<String>) -> Self {
        self.setup.push(command.into());
        self
    }

    /// Append a cleanup command.
    pub fn cleanup(mut self, command: impl Into<String>) -> Self {
        self.cleanup.push(command.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl<R: CommandRunner> Lifecycle for ScriptStep<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_up(&mut self) -> Result<(), SuiteError> {
        for command in &self.setup {
            self.runner.run(&self.dir, command)?;
        }
        Ok(())
    }

    fn tear_down(&mut self) -> Result<(), SuiteError> {
        if self.cleanup.is_empty() {
            return Ok(());
        }
        self.runner.run_script(&self.dir, &self.cleanup.join("\n"))?;
        Ok(())
    }
}
