//! # itk-testing
//!
//! Fakes and fixtures shared by the itk crates' tests.
//!
//! - [`RecordingRunner`]: a [`CommandRunner`] that records every command
//!   instead of running it, with scripted failures
//! - [`ManifestTree`]: a throwaway directory tree of manifest files
//!
//! Helpers here panic on I/O errors; they only ever run inside tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use itk_shell::{CommandOutput, CommandRunner, RunError};
use tempfile::TempDir;

/// One command seen by a [`RecordingRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    /// Working directory passed to the runner.
    pub dir: PathBuf,
    /// The command line.
    pub command: String,
    /// Whether `dir` existed when the command ran.
    pub dir_existed: bool,
    /// Sorted file names present in `dir` when the command ran.
    pub files: Vec<String>,
}

#[derive(Debug, Clone)]
struct Failure {
    pattern: String,
    exit_code: i32,
    stderr: String,
}

/// Records commands instead of executing them.
///
/// Every command succeeds with empty output unless it contains a pattern
/// registered with [`RecordingRunner::fail_on`]. Failing commands are still
/// recorded.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<RecordedCommand>>,
    failures: Vec<Failure>,
    delay: Duration,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every command containing `pattern` with exit code 1.
    pub fn fail_on(self, pattern: impl Into<String>) -> Self {
        self.fail_with(pattern, 1, "simulated failure")
    }

    /// Fail every command containing `pattern` with the given exit code and stderr.
    pub fn fail_with(
        mut self,
        pattern: impl Into<String>,
        exit_code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        self.failures.push(Failure {
            pattern: pattern.into(),
            exit_code,
            stderr: stderr.into(),
        });
        self
    }

    /// Sleep this long inside every command.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every recorded command, in call order.
    pub fn calls(&self) -> Vec<RecordedCommand> {
        self.lock().clone()
    }

    /// Recorded command lines, in call order.
    pub fn commands(&self) -> Vec<String> {
        self.lock().iter().map(|c| c.command.clone()).collect()
    }

    /// Number of recorded commands containing `pattern`.
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.lock()
            .iter()
            .filter(|c| c.command.contains(pattern))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedCommand>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, dir: &Path, command: &str) -> Result<CommandOutput, RunError> {
        let dir_existed = dir.is_dir();
        let mut files: Vec<String> = match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        };
        files.sort();

        self.lock().push(RecordedCommand {
            dir: dir.to_path_buf(),
            command: command.to_string(),
            dir_existed,
            files,
        });

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        if let Some(failure) = self
            .failures
            .iter()
            .find(|f| command.contains(f.pattern.as_str()))
        {
            return Err(RunError::Failed {
                command: command.to_string(),
                exit_code: Some(failure.exit_code),
                stderr: failure.stderr.clone(),
            });
        }

        Ok(CommandOutput {
            command: command.to_string(),
            stdout: String::new(),
            stderr: String::new(),
            duration: self.delay,
        })
    }
}

/// A temporary directory populated with manifest files.
///
/// ```
/// use itk_testing::ManifestTree;
///
/// let tree = ManifestTree::new()
///     .file("apps/nginx/deployment.yaml", "image: nginx:1.25\n")
///     .file(".git/config", "image: ignored\n");
/// assert!(tree.path().join("apps/nginx/deployment.yaml").exists());
/// ```
#[derive(Debug)]
pub struct ManifestTree {
    dir: TempDir,
}

impl ManifestTree {
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("itk-manifests-")
            .tempdir()
            .unwrap_or_else(|err| panic!("failed to create manifest tree: {err}"));
        Self { dir }
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn file(self, relative: impl AsRef<Path>, content: &str) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|err| panic!("failed to create {}: {err}", parent.display()));
        }
        fs::write(&path, content)
            .unwrap_or_else(|err| panic!("failed to write {}: {err}", path.display()));
        self
    }

    /// Create an empty directory at `relative`.
    pub fn dir(self, relative: impl AsRef<Path>) -> Self {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(&path)
            .unwrap_or_else(|err| panic!("failed to create {}: {err}", path.display()));
        self
    }

    /// Root of the tree.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of `relative` inside the tree.
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(relative)
    }
}

impl Default for ManifestTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_commands_and_workspace_contents() {
        let tree = ManifestTree::new().file("a.yaml", "").file("b.yaml", "");
        let runner = RecordingRunner::new();

        runner.run(tree.path(), "kubectl apply -k .").unwrap();
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].dir_existed);
        assert_eq!(calls[0].files, vec!["a.yaml", "b.yaml"]);
    }

    #[test]
    fn test_missing_dir_is_recorded() {
        let runner = RecordingRunner::new();
        runner.run(Path::new("/nonexistent/itk"), "true").unwrap();
        let calls = runner.calls();
        assert!(!calls[0].dir_existed);
        assert!(calls[0].files.is_empty());
    }

    #[test]
    fn test_fail_on_pattern() {
        let runner = RecordingRunner::new().fail_with("wait", 124, "timed out");
        assert!(runner.run(Path::new("."), "kubectl apply -k .").is_ok());

        let err = runner.run(Path::new("."), "kubectl wait pods").unwrap_err();
        assert_eq!(err.exit_code(), Some(124));
        assert_eq!(runner.count_matching("kubectl"), 2);
    }
}
