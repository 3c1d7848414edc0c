//! Caller-supplied image lists.
//!
//! Suites can merge extra images into the distribution set, e.g. images only
//! pulled by debugging tools or listed in an `external-images.yaml`. Remote
//! locators must be fetched into local files by the caller first.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_yaml::Value;
use thiserror::Error;
use tracing::debug;

use crate::scanner::{extract_reference, ScanError, Scanner};

/// Errors from loading extra image sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The locator string is empty.
    #[error("image source locator cannot be empty")]
    Empty,

    /// The locator points at a remote resource.
    #[error("remote image source '{0}' must be fetched to a local file first")]
    Remote(String),

    /// A local source file could not be read.
    #[error("failed to read image source {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A local source directory could not be scanned.
    #[error("failed to scan image source: {0}")]
    Scan(#[from] ScanError),
}

/// A local file or directory holding extra image references.
///
/// Parsed from `file://<path>` or a bare path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocator(PathBuf);

impl SourceLocator {
    /// Create a locator for a local path.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// The local path this locator refers to.
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Loads the raw references from this source.
    ///
    /// Directories are scanned like manifest roots. Files are decoded as a
    /// YAML list of references, or a mapping with an `images` list; anything
    /// else is scanned line by line for `image:` values.
    pub fn load(&self, scanner: &Scanner) -> Result<Vec<String>, SourceError> {
        let path = self.path();
        let references = if path.is_dir() {
            scanner.scan(&[path])?
        } else {
            let content = std::fs::read_to_string(path).map_err(|source| SourceError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            parse_source(&content)
        };

        debug!(source = %self, found = references.len(), "Loaded image source");
        Ok(references)
    }
}

impl FromStr for SourceLocator {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            return Err(SourceError::Remote(s.to_string()));
        }

        let path = s.strip_prefix("file://").unwrap_or(s);
        if path.is_empty() {
            return Err(SourceError::Empty);
        }
        Ok(Self::local(path))
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file://{}", self.0.display())
    }
}

/// Extracts raw references from the content of a source file.
pub fn parse_source(content: &str) -> Vec<String> {
    let listed = match serde_yaml::from_str::<Value>(content) {
        Ok(Value::Sequence(items)) => string_items(&items),
        Ok(Value::Mapping(map)) => match map.get("images") {
            Some(Value::Sequence(items)) => string_items(items),
            _ => None,
        },
        _ => None,
    };

    listed.unwrap_or_else(|| {
        content
            .lines()
            .filter_map(extract_reference)
            .map(str::to_string)
            .collect()
    })
}

/// Returns the items if every one is a non-blank string.
fn string_items(items: &[Value]) -> Option<Vec<String>> {
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_locator() {
        let locator: SourceLocator = "file://images/debug.yaml".parse().unwrap();
        assert_eq!(locator.path(), Path::new("images/debug.yaml"));

        let locator: SourceLocator = "/abs/images.yaml".parse().unwrap();
        assert_eq!(locator.path(), Path::new("/abs/images.yaml"));
        assert_eq!(locator.to_string(), "file:///abs/images.yaml");
    }

    #[test]
    fn test_parse_locator_rejects_remote() {
        let err = "https://example.com/external-images.yaml"
            .parse::<SourceLocator>()
            .unwrap_err();
        assert!(matches!(err, SourceError::Remote(_)));
    }

    #[test]
    fn test_parse_locator_rejects_empty() {
        assert!(matches!(
            "file://".parse::<SourceLocator>(),
            Err(SourceError::Empty)
        ));
        assert!(matches!(
            "  ".parse::<SourceLocator>(),
            Err(SourceError::Empty)
        ));
    }

    #[test]
    fn test_parse_source_sequence() {
        let content = "- alpine\n- ghcr.io/org/app:v1\n";
        assert_eq!(parse_source(content), vec!["alpine", "ghcr.io/org/app:v1"]);
    }

    #[test]
    fn test_parse_source_images_mapping() {
        let content = "images:\n  - redis:7\n  - quay.io/prometheus/node-exporter\n";
        assert_eq!(
            parse_source(content),
            vec!["redis:7", "quay.io/prometheus/node-exporter"]
        );
    }

    #[test]
    fn test_parse_source_falls_back_to_image_lines() {
        let content = "---\nkind: Pod\nspec:\n  containers:\n    - image: nginx\n---\nkind: Pod\nspec:\n  containers:\n    - image: busybox\n";
        assert_eq!(parse_source(content), vec!["nginx", "busybox"]);
    }

    #[test]
    fn test_load_file_and_directory() {
        let dir = tempdir().unwrap();
        let list = dir.path().join("extra.yaml");
        fs::write(&list, "- alpine\n").unwrap();
        let tree = dir.path().join("apps");
        fs::create_dir_all(&tree).unwrap();
        fs::write(tree.join("pod.yaml"), "    image: redis\n").unwrap();

        let scanner = Scanner::default();
        assert_eq!(
            SourceLocator::local(&list).load(&scanner).unwrap(),
            vec!["alpine"]
        );
        assert_eq!(
            SourceLocator::local(&tree).load(&scanner).unwrap(),
            vec!["redis"]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = SourceLocator::local(dir.path().join("missing.yaml"))
            .load(&Scanner::default())
            .unwrap_err();
        assert!(matches!(err, SourceError::Read { .. }));
    }
}
