//! The prefetch protocol.
//!
//! 1. Scan the manifest roots and merge extra sources (no cluster I/O yet)
//! 2. Render the manifests into a fresh temporary workspace
//! 3. `kubectl apply -k .`
//! 4. Wait for the daemon set to be ready on every node, bounded by the
//!    configured timeout
//! 5. Delete the namespace
//! 6. Remove the workspace (best-effort)
//!
//! Steps run strictly in order and nothing is retried. The whole sequence
//! runs at most once per [`ExecutionGuard`].

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use itk_imageref::ImageRef;
use itk_shell::CommandRunner;
use tracing::{info, warn};

use crate::guard::{ExecutionGuard, PrefetchOutcome};
use crate::render::{render, ManifestSet, WORKLOAD_NAME};
use crate::{DistributionSet, PrefetchConfig, PrefetchError, ProtocolStep};

/// Summary of a finished prefetch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchReport {
    /// Images pulled on every node, sorted.
    pub images: Vec<ImageRef>,
    /// Malformed references skipped.
    pub dropped: usize,
    /// Namespace used for the prefetch resources.
    pub namespace: String,
    /// False if there was nothing to distribute and the cluster was untouched.
    pub distributed: bool,
    /// Time the protocol took.
    pub elapsed: Duration,
}

/// Images collected from manifests and extra sources.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    /// Unique canonical references.
    pub images: DistributionSet,
    /// Raw references found before deduplication.
    pub scanned: usize,
    /// Malformed references skipped.
    pub dropped: usize,
}

/// Distributes manifest images to every cluster node.
pub struct Prefetcher<R> {
    config: PrefetchConfig,
    runner: R,
    guard: Arc<ExecutionGuard>,
}

impl<R: CommandRunner> Prefetcher<R> {
    /// Create a prefetcher bound to the process-wide guard.
    pub fn new(config: PrefetchConfig, runner: R) -> Self {
        Self {
            config,
            runner,
            guard: ExecutionGuard::process(),
        }
    }

    /// Use a specific guard instead of the process-wide one.
    pub fn with_guard(mut self, guard: Arc<ExecutionGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn config(&self) -> &PrefetchConfig {
        &self.config
    }

    pub fn guard(&self) -> &Arc<ExecutionGuard> {
        &self.guard
    }

    /// Run the protocol unless this guard already ran it.
    ///
    /// Concurrent callers block until the single run finishes and all of
    /// them get its outcome.
    pub fn prefetch(&self) -> PrefetchOutcome {
        self.guard.run_once(|| self.execute())
    }

    /// Scan, canonicalize and deduplicate every configured image.
    pub fn inventory(&self) -> Result<Inventory, PrefetchError> {
        let scanner = self.config.scanner();
        let mut raw = scanner.scan(self.config.manifest_roots.as_slice())?;
        for source in &self.config.extra_sources {
            raw.extend(source.load(&scanner)?);
        }

        let mut images = DistributionSet::new();
        let dropped = images.extend_raw(&raw);

        info!(
            scanned = raw.len(),
            unique = images.len(),
            dropped = dropped,
            "Collected test images"
        );

        Ok(Inventory {
            images,
            scanned: raw.len(),
            dropped,
        })
    }

    /// Render the manifests for a set of images.
    pub fn manifests(&self, images: &DistributionSet) -> Result<ManifestSet, PrefetchError> {
        Ok(render(images, &self.config.render_options())?)
    }

    fn execute(&self) -> Result<PrefetchReport, PrefetchError> {
        let start = Instant::now();
        self.config.validate()?;

        let Inventory {
            images, dropped, ..
        } = self.inventory()?;

        let report = |distributed| PrefetchReport {
            images: images.clone().into_vec(),
            dropped,
            namespace: self.config.namespace.clone(),
            distributed,
            elapsed: start.elapsed(),
        };

        if images.is_empty() {
            info!("No images to prefetch");
            return Ok(report(false));
        }

        let manifests = self.manifests(&images)?;
        let workspace = tempfile::Builder::new()
            .prefix("prefetch-")
            .tempdir_in(&self.config.workspace_parent)
            .map_err(|source| PrefetchError::Workspace {
                path: self.config.workspace_parent.clone(),
                source,
            })?;

        let result = self.distribute(&manifests, workspace.path());

        let workspace_path = workspace.path().to_path_buf();
        if let Err(err) = workspace.close() {
            warn!(
                path = %workspace_path.display(),
                error = %err,
                "Failed to remove prefetch workspace"
            );
        }

        result?;
        let report = report(true);
        info!(
            images = report.images.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Prefetch complete"
        );
        Ok(report)
    }

    fn distribute(&self, manifests: &ManifestSet, workspace: &Path) -> Result<(), PrefetchError> {
        manifests
            .write_to(workspace)
            .map_err(|source| PrefetchError::Workspace {
                path: workspace.to_path_buf(),
                source,
            })?;

        let kubectl = &self.config.kubectl;
        let namespace = &self.config.namespace;

        info!(
            namespace = %namespace,
            workspace = %workspace.display(),
            "Applying prefetch manifests"
        );
        self.runner
            .run(workspace, &format!("{kubectl} apply -k ."))
            .map_err(PrefetchError::command(ProtocolStep::Apply))?;

        let wait = format!(
            "{kubectl} -n {namespace} rollout status daemonset/{WORKLOAD_NAME} --timeout={}",
            self.config.wait_timeout_arg()
        );
        if let Err(err) = self.runner.run(workspace, &wait) {
            // Best-effort cleanup; the wait error is what gets reported.
            if let Err(cleanup) = self.delete_namespace(workspace) {
                warn!(
                    namespace = %namespace,
                    error = %cleanup,
                    "Failed to delete prefetch namespace"
                );
            }
            return Err(PrefetchError::command(ProtocolStep::Wait)(err));
        }

        self.delete_namespace(workspace)
    }

    fn delete_namespace(&self, workspace: &Path) -> Result<(), PrefetchError> {
        let command = format!("{} delete ns {}", self.config.kubectl, self.config.namespace);
        self.runner
            .run(workspace, &command)
            .map(|_| ())
            .map_err(PrefetchError::command(ProtocolStep::Cleanup))
    }
}
