//! Error types for the prefetch protocol.

use std::fmt;
use std::io;
use std::path::PathBuf;

use itk_shell::RunError;
use thiserror::Error;

use crate::render::RenderError;
use crate::scanner::ScanError;
use crate::sources::SourceError;

/// Steps of the prefetch protocol, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolStep {
    /// Configuration check.
    Validate,
    /// Manifest tree scan.
    Scan,
    /// Extra source loading.
    Sources,
    /// Manifest rendering.
    Render,
    /// Temporary workspace creation and manifest writing.
    Workspace,
    /// `kubectl apply`.
    Apply,
    /// Readiness wait.
    Wait,
    /// Namespace deletion.
    Cleanup,
}

impl ProtocolStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolStep::Validate => "validate",
            ProtocolStep::Scan => "scan",
            ProtocolStep::Sources => "sources",
            ProtocolStep::Render => "render",
            ProtocolStep::Workspace => "workspace",
            ProtocolStep::Apply => "apply",
            ProtocolStep::Wait => "wait",
            ProtocolStep::Cleanup => "cleanup",
        }
    }

    /// Returns true if the step runs after the cluster has been touched.
    pub fn mutates_cluster(&self) -> bool {
        matches!(
            self,
            ProtocolStep::Apply | ProtocolStep::Wait | ProtocolStep::Cleanup
        )
    }
}

impl fmt::Display for ProtocolStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that fail a prefetch run.
#[derive(Debug, Error)]
pub enum PrefetchError {
    /// The configuration cannot work.
    #[error("invalid prefetch config: {0}")]
    InvalidConfig(String),

    /// Scanning the manifest roots failed.
    #[error("image scan failed: {0}")]
    Scan(#[from] ScanError),

    /// Loading an extra image source failed.
    #[error("image source failed: {0}")]
    Source(#[from] SourceError),

    /// The manifests could not be rendered.
    #[error("manifest rendering failed: {0}")]
    Render(#[from] RenderError),

    /// The temporary workspace could not be prepared.
    #[error("failed to prepare workspace {}: {source}", .path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A cluster command failed or timed out.
    #[error("prefetch {step} failed: {source}")]
    Command {
        step: ProtocolStep,
        #[source]
        source: RunError,
    },

    /// A previous attempt in this process stopped without a result.
    #[error("prefetch was interrupted by an earlier attempt and will not be retried")]
    Interrupted,
}

impl PrefetchError {
    /// The protocol step that failed.
    ///
    /// `None` for [`PrefetchError::Interrupted`]: the attempt that stopped
    /// left no record of where it was.
    pub fn step(&self) -> Option<ProtocolStep> {
        let step = match self {
            PrefetchError::InvalidConfig(_) => ProtocolStep::Validate,
            PrefetchError::Scan(_) => ProtocolStep::Scan,
            PrefetchError::Source(_) => ProtocolStep::Sources,
            PrefetchError::Render(_) => ProtocolStep::Render,
            PrefetchError::Workspace { .. } => ProtocolStep::Workspace,
            PrefetchError::Command { step, .. } => *step,
            PrefetchError::Interrupted => return None,
        };
        Some(step)
    }

    pub(crate) fn command(step: ProtocolStep) -> impl FnOnce(RunError) -> Self {
        move |source| PrefetchError::Command { step, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_of_each_error() {
        assert_eq!(
            PrefetchError::InvalidConfig("x".to_string()).step(),
            Some(ProtocolStep::Validate)
        );
        assert_eq!(PrefetchError::Interrupted.step(), None);

        let wait = PrefetchError::command(ProtocolStep::Wait)(RunError::Failed {
            command: "kubectl rollout status".to_string(),
            exit_code: Some(1),
            stderr: "timed out".to_string(),
        });
        assert_eq!(wait.step(), Some(ProtocolStep::Wait));
        assert!(wait.step().is_some_and(|step| step.mutates_cluster()));
    }
}
