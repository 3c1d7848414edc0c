//! Cluster manifests that force every node to pull every image.
//!
//! Four documents composed by a kustomization:
//!
//! - `namespace.yaml`: the isolated namespace, deleted afterwards
//! - `configmap.yaml`: the space-joined image list and the pull script
//! - `daemonset.yaml`: one pod per node that runs the script through the
//!   node's CRI socket and turns ready once every pull has finished
//! - `kustomization.yaml`: applies the three above into the namespace
//!
//! Pulls go through `crictl` on each node rather than through one container
//! per image, so the pod stays schedulable however long the list grows. This
//! requires every node to provide `crictl` and the runtime socket at the
//! host paths in [`RenderOptions`]; a node without them never turns ready and
//! the readiness wait times out.
//!
//! Rendering is pure: nothing here touches the cluster or the file system
//! except [`ManifestSet::write_to`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::DistributionSet;

/// Label value selecting the prefetch pods (`app=prefetch`).
pub const APP_LABEL: &str = "prefetch";

/// Name of the daemon set and config map.
pub const WORKLOAD_NAME: &str = "prefetch";

const NAMESPACE_TEMPLATE: &str = r#"---
apiVersion: v1
kind: Namespace
metadata:
  name: {{namespace}}
"#;

const PULL_SCRIPT: &str = r#"#!/bin/sh
set -e
for image in ${IMAGES}; do
  echo "pulling ${image}"
  crictl pull "${image}"
done
touch /tmp/prefetch-done
exec tail -f /dev/null
"#;

const DAEMONSET_TEMPLATE: &str = r#"---
apiVersion: apps/v1
kind: DaemonSet
metadata:
  name: {{name}}
  labels:
    app: {{app}}
spec:
  selector:
    matchLabels:
      app: {{app}}
  template:
    metadata:
      labels:
        app: {{app}}
    spec:
      tolerations:
        - operator: Exists
      containers:
        - name: prefetch
          image: {{puller_image}}
          imagePullPolicy: IfNotPresent
          command: ["/bin/sh", "/prefetch/prefetch.sh"]
          env:
            - name: IMAGES
              valueFrom:
                configMapKeyRef:
                  name: {{name}}
                  key: images
            - name: CONTAINER_RUNTIME_ENDPOINT
              value: unix:///run/prefetch/runtime.sock
          readinessProbe:
            exec:
              command: ["test", "-f", "/tmp/prefetch-done"]
            periodSeconds: 5
          volumeMounts:
            - name: script
              mountPath: /prefetch
            - name: runtime-socket
              mountPath: /run/prefetch/runtime.sock
            - name: crictl
              mountPath: /usr/local/bin/crictl
      volumes:
        - name: script
          configMap:
            name: {{name}}
        - name: runtime-socket
          hostPath:
            path: {{runtime_socket}}
            type: Socket
        - name: crictl
          hostPath:
            path: {{crictl_path}}
            type: File
"#;

const KUSTOMIZATION_TEMPLATE: &str = r#"---
apiVersion: kustomize.config.k8s.io/v1beta1
kind: Kustomization

namespace: {{namespace}}

resources:
  - namespace.yaml
  - configmap.yaml
  - daemonset.yaml
"#;

/// A manifest could not be encoded.
#[derive(Debug, Error)]
#[error("failed to encode {file_name}: {source}")]
pub struct RenderError {
    pub file_name: &'static str,
    #[source]
    pub source: serde_yaml::Error,
}

/// Values substituted into the templates besides the image list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Namespace holding every prefetch resource.
    pub namespace: String,
    /// Image of the container running the pull script.
    pub puller_image: String,
    /// Host path of the `crictl` binary.
    pub crictl_path: String,
    /// Host path of the container runtime socket.
    pub runtime_socket: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            namespace: crate::config::DEFAULT_NAMESPACE.to_string(),
            puller_image: crate::config::DEFAULT_PULLER_IMAGE.to_string(),
            crictl_path: crate::config::DEFAULT_CRICTL_PATH.to_string(),
            runtime_socket: crate::config::DEFAULT_RUNTIME_SOCKET.to_string(),
        }
    }
}

/// One rendered manifest file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// File name inside the workspace.
    pub file_name: &'static str,
    /// YAML content.
    pub content: String,
}

/// The rendered manifests, kustomization last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSet {
    manifests: Vec<Manifest>,
}

impl ManifestSet {
    /// All manifests in write order.
    pub fn manifests(&self) -> &[Manifest] {
        &self.manifests
    }

    /// Look up a manifest by file name.
    pub fn get(&self, file_name: &str) -> Option<&Manifest> {
        self.manifests.iter().find(|m| m.file_name == file_name)
    }

    /// Write every manifest into `dir`, returning the written paths.
    pub fn write_to(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        self.manifests
            .iter()
            .map(|manifest| {
                let path = dir.join(manifest.file_name);
                fs::write(&path, &manifest.content)?;
                Ok(path)
            })
            .collect()
    }
}

/// Render the prefetch manifests for `images`.
pub fn render(
    images: &DistributionSet,
    options: &RenderOptions,
) -> Result<ManifestSet, RenderError> {
    let fill = |template: &str| {
        template
            .replace("{{namespace}}", &options.namespace)
            .replace("{{name}}", WORKLOAD_NAME)
            .replace("{{app}}", APP_LABEL)
            .replace("{{puller_image}}", &options.puller_image)
            .replace("{{crictl_path}}", &options.crictl_path)
            .replace("{{runtime_socket}}", &options.runtime_socket)
    };

    Ok(ManifestSet {
        manifests: vec![
            Manifest {
                file_name: "namespace.yaml",
                content: fill(NAMESPACE_TEMPLATE),
            },
            Manifest {
                file_name: "configmap.yaml",
                content: config_map(&images.joined())?,
            },
            Manifest {
                file_name: "daemonset.yaml",
                content: fill(DAEMONSET_TEMPLATE),
            },
            Manifest {
                file_name: "kustomization.yaml",
                content: fill(KUSTOMIZATION_TEMPLATE),
            },
        ],
    })
}

/// The config map carrying the image list and the pull script.
///
/// Built as a YAML value so the image list round-trips whatever it contains.
fn config_map(images: &str) -> Result<String, RenderError> {
    let mut metadata = Mapping::new();
    metadata.insert("name".into(), WORKLOAD_NAME.into());

    let mut data = Mapping::new();
    data.insert("images".into(), images.into());
    data.insert("prefetch.sh".into(), PULL_SCRIPT.into());

    let mut doc = Mapping::new();
    doc.insert("apiVersion".into(), "v1".into());
    doc.insert("kind".into(), "ConfigMap".into());
    doc.insert("metadata".into(), Value::Mapping(metadata));
    doc.insert("data".into(), Value::Mapping(data));

    let body = serde_yaml::to_string(&Value::Mapping(doc)).map_err(|source| RenderError {
        file_name: "configmap.yaml",
        source,
    })?;
    Ok(format!("---\n{body}"))
}
