//! Error handling and display for the CLI.

use std::sync::Arc;

use colored::Colorize;
use itk_prefetch::{PrefetchError, ProtocolStep};
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("No manifest roots. Pass --repo or --root.")]
    NoRoots,

    #[error("Prefetch failed: {0}")]
    Prefetch(Arc<PrefetchError>),
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let hint = match err.downcast_ref::<CliError>() {
        Some(CliError::NoRoots) => {
            Some("Hint: Point --repo at a deployments checkout, or set ITK_REPO.".to_string())
        }
        Some(CliError::Prefetch(err)) => prefetch_hint(err),
        None => None,
    };

    if let Some(hint) = hint {
        eprintln!("\n{}", hint.yellow());
    }
}

fn prefetch_hint(err: &PrefetchError) -> Option<String> {
    let Some(step) = err.step() else {
        return Some(
            "Hint: An earlier prefetch attempt in this process stopped part-way; \
             check `kubectl get ns` for a leftover prefetch namespace."
                .to_string(),
        );
    };
    let hint = match step {
        ProtocolStep::Scan | ProtocolStep::Sources => {
            "Hint: Check that every --root and --source path exists and is readable.".to_string()
        }
        ProtocolStep::Apply => {
            "Hint: Check the kube context with `kubectl config current-context`.".to_string()
        }
        ProtocolStep::Wait => {
            "Hint: Some nodes did not finish pulling in time. Raise --timeout or inspect the \
             prefetch pods before the namespace is gone."
                .to_string()
        }
        ProtocolStep::Cleanup => {
            "Hint: The prefetch namespace may still exist; delete it with `kubectl delete ns`."
                .to_string()
        }
        ProtocolStep::Validate | ProtocolStep::Render | ProtocolStep::Workspace => return None,
    };
    Some(hint)
}
