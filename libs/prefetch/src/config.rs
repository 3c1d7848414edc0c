//! Configuration for the prefetch protocol.
//!
//! Nothing here is read from the environment: the embedding suite or CLI
//! decides where values come from.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::render::RenderOptions;
use crate::scanner::{Scanner, MANIFEST_SUFFIX};
use crate::sources::SourceLocator;
use crate::PrefetchError;

/// Namespace reserved for prefetch resources.
pub const DEFAULT_NAMESPACE: &str = "prefetch";

/// How long to wait for the daemon set to become ready on every node.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(600); // 10 minutes

/// Image running the pull script.
pub const DEFAULT_PULLER_IMAGE: &str = "docker.io/library/busybox:1.36";

/// Host path of `crictl` on cluster nodes.
pub const DEFAULT_CRICTL_PATH: &str = "/usr/local/bin/crictl";

/// Host path of the container runtime socket on cluster nodes.
pub const DEFAULT_RUNTIME_SOCKET: &str = "/run/containerd/containerd.sock";

/// Directory names never scanned.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[".git"];

/// Prefetch configuration.
#[derive(Debug, Clone)]
pub struct PrefetchConfig {
    /// Directories scanned for manifests.
    pub manifest_roots: Vec<PathBuf>,

    /// Directory names skipped with their whole subtree.
    pub excluded_dirs: BTreeSet<String>,

    /// File name suffix of manifests.
    pub manifest_suffix: String,

    /// Extra image lists merged into the distribution set.
    pub extra_sources: Vec<SourceLocator>,

    /// Namespace holding every prefetch resource.
    pub namespace: String,

    /// Bound on the readiness wait.
    pub wait_timeout: Duration,

    /// Parent of the temporary workspace.
    pub workspace_parent: PathBuf,

    /// kubectl binary used for apply/wait/delete.
    pub kubectl: String,

    /// Image running the pull script.
    pub puller_image: String,

    /// Host path of `crictl` on cluster nodes.
    pub crictl_path: String,

    /// Host path of the container runtime socket on cluster nodes.
    pub runtime_socket: String,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            manifest_roots: Vec::new(),
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
            manifest_suffix: MANIFEST_SUFFIX.to_string(),
            extra_sources: Vec::new(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            workspace_parent: std::env::temp_dir(),
            kubectl: "kubectl".to_string(),
            puller_image: DEFAULT_PULLER_IMAGE.to_string(),
            crictl_path: DEFAULT_CRICTL_PATH.to_string(),
            runtime_socket: DEFAULT_RUNTIME_SOCKET.to_string(),
        }
    }
}

impl PrefetchConfig {
    /// Configuration for a checked-out deployment repository.
    ///
    /// Scans the conventional `apps` and `examples/spire` trees.
    pub fn for_deployment_repo(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            manifest_roots: vec![dir.join("apps"), dir.join("examples").join("spire")],
            ..Self::default()
        }
    }

    /// Replace the manifest roots.
    pub fn with_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.manifest_roots = roots.into_iter().map(Into::into).collect();
        self
    }

    /// Skip directories with this name.
    pub fn exclude(mut self, dir_name: impl Into<String>) -> Self {
        self.excluded_dirs.insert(dir_name.into());
        self
    }

    /// Merge an extra image source.
    pub fn with_source(mut self, source: SourceLocator) -> Self {
        self.extra_sources.push(source);
        self
    }

    /// Use a different namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Use a different readiness timeout.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Create temporary workspaces under `dir`.
    pub fn with_workspace_parent(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workspace_parent = dir.into();
        self
    }

    /// Use a different kubectl binary.
    pub fn with_kubectl(mut self, kubectl: impl Into<String>) -> Self {
        self.kubectl = kubectl.into();
        self
    }

    /// Check the configuration before anything touches the cluster.
    pub fn validate(&self) -> Result<(), PrefetchError> {
        if self.manifest_roots.is_empty() && self.extra_sources.is_empty() {
            return Err(PrefetchError::InvalidConfig(
                "no manifest roots or extra sources configured".to_string(),
            ));
        }
        if !is_dns_label(&self.namespace) {
            return Err(PrefetchError::InvalidConfig(format!(
                "namespace '{}' is not a valid DNS-1123 label",
                self.namespace
            )));
        }
        if self.wait_timeout.is_zero() {
            return Err(PrefetchError::InvalidConfig(
                "wait timeout must be greater than zero".to_string(),
            ));
        }
        if self.kubectl.trim().is_empty() {
            return Err(PrefetchError::InvalidConfig(
                "kubectl binary cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Scanner honoring the exclusion set and suffix.
    pub fn scanner(&self) -> Scanner {
        Scanner::new(self.excluded_dirs.clone()).with_suffix(self.manifest_suffix.clone())
    }

    /// Template values for rendering.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            namespace: self.namespace.clone(),
            puller_image: self.puller_image.clone(),
            crictl_path: self.crictl_path.clone(),
            runtime_socket: self.runtime_socket.clone(),
        }
    }

    /// The readiness timeout as a kubectl duration, rounded up to seconds.
    pub fn wait_timeout_arg(&self) -> String {
        let secs = self.wait_timeout.as_secs() + u64::from(self.wait_timeout.subsec_nanos() > 0);
        format!("{secs}s")
    }
}

fn is_dns_label(name: &str) -> bool {
    let bytes = name.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= 63
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        && bytes[0] != b'-'
        && bytes[bytes.len() - 1] != b'-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_deployment_repo() {
        let config = PrefetchConfig::for_deployment_repo("/work/deployments-k8s");
        assert_eq!(
            config.manifest_roots,
            vec![
                PathBuf::from("/work/deployments-k8s/apps"),
                PathBuf::from("/work/deployments-k8s/examples/spire"),
            ]
        );
        assert_eq!(config.namespace, "prefetch");
        assert_eq!(config.wait_timeout, Duration::from_secs(600));
        assert!(config.excluded_dirs.contains(".git"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_input() {
        let err = PrefetchConfig::default().validate().unwrap_err();
        assert!(matches!(err, PrefetchError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_namespace() {
        for bad in ["", "Prefetch", "-prefetch", "prefetch-", "pre_fetch"] {
            let config = PrefetchConfig::for_deployment_repo("/repo").with_namespace(bad);
            assert!(config.validate().is_err(), "namespace '{bad}' accepted");
        }
        let config = PrefetchConfig::for_deployment_repo("/repo").with_namespace("prefetch-2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_timeout() {
        let config =
            PrefetchConfig::for_deployment_repo("/repo").with_wait_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_wait_timeout_arg_rounds_up() {
        let config = PrefetchConfig::default().with_wait_timeout(Duration::from_millis(1500));
        assert_eq!(config.wait_timeout_arg(), "2s");
        assert_eq!(PrefetchConfig::default().wait_timeout_arg(), "600s");
    }

    #[test]
    fn test_sources_alone_are_enough() {
        let config = PrefetchConfig::default().with_source(SourceLocator::local("/images.yaml"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scanner_honors_exclusions() {
        let config = PrefetchConfig::default().exclude("vendor");
        let scanner = config.scanner();
        assert!(scanner.is_excluded("vendor"));
        assert!(scanner.is_excluded(".git"));
        assert!(!scanner.is_excluded("apps"));
    }
}
