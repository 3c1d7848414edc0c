//! Manifest scanning for image references.
//!
//! Traversal and line matching are separate: [`manifest_files`] lazily yields
//! candidate files, [`scan_references`] extracts `image:` values from text,
//! and [`Scanner`] composes the two over a set of roots.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Suffix of files treated as manifests.
pub const MANIFEST_SUFFIX: &str = ".yaml";

static IMAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"image: (?P<image>.*)").expect("image pattern is valid"));

/// Errors from scanning manifest trees.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Directory traversal failed (missing root, permission denied, loop).
    #[error("failed to walk {}: {source}", display_path(.path))]
    Walk {
        path: Option<PathBuf>,
        #[source]
        source: walkdir::Error,
    },

    /// A manifest file could not be opened or read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Lazily yields files under `root` accepted by `accept`.
///
/// Directories whose name satisfies `exclude` are skipped together with
/// their whole subtree, including `root` itself. Anything that is not a
/// directory is offered to `accept`. Traversal errors are yielded in place.
pub fn manifest_files<E, F>(
    root: &Path,
    exclude: E,
    accept: F,
) -> impl Iterator<Item = Result<PathBuf, ScanError>>
where
    E: Fn(&str) -> bool,
    F: Fn(&Path) -> bool,
{
    WalkDir::new(root)
        .into_iter()
        .filter_entry(move |entry| {
            !(entry.file_type().is_dir() && exclude(&entry.file_name().to_string_lossy()))
        })
        .filter_map(move |entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => None,
            Ok(entry) if accept(entry.path()) => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(source) => Some(Err(ScanError::Walk {
                path: source.path().map(Path::to_path_buf),
                source,
            })),
        })
}

/// Extracts the image reference from one manifest line, if it has one.
///
/// The value runs to the end of the line after `image: `. Surrounding
/// whitespace, a trailing ` #` comment and one pair of matching quotes are
/// removed. Commented-out lines never match.
pub fn extract_reference(line: &str) -> Option<&str> {
    if line.trim_start().starts_with('#') {
        return None;
    }

    let captures = IMAGE_PATTERN.captures(line)?;
    let mut value = captures.name("image")?.as_str();
    if let Some(comment) = value.find(" #") {
        value = &value[..comment];
    }

    let value = strip_quotes(value.trim()).trim();
    (!value.is_empty()).then_some(value)
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Extracts every image reference from manifest text.
pub fn scan_references(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(extract_reference)
        .map(str::to_string)
        .collect()
}

/// Scans manifest roots for raw image references.
#[derive(Debug, Clone)]
pub struct Scanner {
    excluded_dirs: BTreeSet<String>,
    suffix: String,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(BTreeSet::new())
    }
}

impl Scanner {
    /// Create a scanner that skips directories with the given names.
    pub fn new(excluded_dirs: BTreeSet<String>) -> Self {
        Self {
            excluded_dirs,
            suffix: MANIFEST_SUFFIX.to_string(),
        }
    }

    /// Scan files with a different name suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Returns true if a directory with this name is skipped.
    pub fn is_excluded(&self, dir_name: &str) -> bool {
        self.excluded_dirs.contains(dir_name)
    }

    /// Lazily yields the manifest files under `root`.
    pub fn files<'a>(
        &'a self,
        root: &Path,
    ) -> impl Iterator<Item = Result<PathBuf, ScanError>> + 'a {
        manifest_files(
            root,
            |name| self.is_excluded(name),
            |path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().ends_with(self.suffix.as_str()))
                    .unwrap_or(false)
            },
        )
    }

    /// Reads one manifest file and returns its raw references.
    pub fn scan_file(&self, path: &Path) -> Result<Vec<String>, ScanError> {
        let read_err = |source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = BufReader::new(File::open(path).map_err(read_err)?);
        let mut references = Vec::new();
        let mut line = Vec::new();
        // Lines are decoded lossily: stray non-UTF-8 bytes in comments must
        // not hide the references around them.
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).map_err(read_err)? == 0 {
                break;
            }
            if let Some(reference) = extract_reference(&String::from_utf8_lossy(&line)) {
                references.push(reference.to_string());
            }
        }

        debug!(path = %path.display(), found = references.len(), "Scanned manifest");
        Ok(references)
    }

    /// Scans every root and returns all raw references found.
    ///
    /// Any traversal or read failure aborts the whole scan. Output order
    /// follows the directory walk and is not stable across file systems.
    pub fn scan<P: AsRef<Path>>(&self, roots: &[P]) -> Result<Vec<String>, ScanError> {
        let mut references = Vec::new();
        for root in roots {
            for path in self.files(root.as_ref()) {
                references.extend(self.scan_file(&path?)?);
            }
        }
        Ok(references)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[rstest]
    #[case("image: alpine", Some("alpine"))]
    #[case("        image: ghcr.io/org/app:v1", Some("ghcr.io/org/app:v1"))]
    #[case("  - image: nginx:1.25", Some("nginx:1.25"))]
    #[case("image: alpine   ", Some("alpine"))]
    #[case("image: \"redis:7\"", Some("redis:7"))]
    #[case("image: 'redis:7'", Some("redis:7"))]
    #[case("image: busybox # pinned", Some("busybox"))]
    #[case("# image: alpine", None)]
    #[case("image: ", None)]
    #[case("image:alpine", None)]
    #[case("imagePullPolicy: IfNotPresent", None)]
    #[case("name: alpine", None)]
    fn test_extract_reference(#[case] line: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_reference(line), expected);
    }

    #[test]
    fn test_scan_references() {
        let text = "\
apiVersion: apps/v1
kind: Deployment
spec:
  template:
    spec:
      containers:
        - name: app
          image: ghcr.io/org/app:v1
          imagePullPolicy: IfNotPresent
        - name: sidecar
          image: envoyproxy/envoy:v1.29
";
        assert_eq!(
            scan_references(text),
            vec!["ghcr.io/org/app:v1", "envoyproxy/envoy:v1.29"]
        );
    }

    #[test]
    fn test_files_filters_by_suffix_and_exclusion() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        fs::create_dir_all(root.join("vendor/inner")).unwrap();
        fs::write(root.join("a.yaml"), "").unwrap();
        fs::write(root.join("b.yml"), "").unwrap();
        fs::write(root.join("README.md"), "").unwrap();
        fs::write(root.join("nested/deeper/c.yaml"), "").unwrap();
        fs::write(root.join("vendor/inner/d.yaml"), "").unwrap();

        let scanner = Scanner::new(BTreeSet::from(["vendor".to_string()]));
        let mut files: Vec<PathBuf> = scanner
            .files(root)
            .collect::<Result<_, _>>()
            .unwrap();
        files.sort();

        assert_eq!(
            files,
            vec![root.join("a.yaml"), root.join("nested/deeper/c.yaml")]
        );
    }

    #[test]
    fn test_excluded_root_yields_nothing() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("generated");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.yaml"), "image: alpine\n").unwrap();

        let scanner = Scanner::new(BTreeSet::from(["generated".to_string()]));
        assert!(scanner.scan(&[&root]).unwrap().is_empty());
    }

    #[test]
    fn test_custom_suffix() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.yml"), "image: alpine\n").unwrap();
        fs::write(dir.path().join("b.yaml"), "image: redis\n").unwrap();

        let scanner = Scanner::default().with_suffix(".yml");
        assert_eq!(scanner.scan(&[dir.path()]).unwrap(), vec!["alpine"]);
    }

    #[test]
    fn test_scan_missing_root_fails() {
        let dir = tempdir().unwrap();
        let err = Scanner::default()
            .scan(&[dir.path().join("missing")])
            .unwrap_err();
        assert!(matches!(err, ScanError::Walk { .. }));
    }

    #[test]
    fn test_scan_empty_tree() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("config.yaml"), "kind: ConfigMap\n").unwrap();
        assert!(Scanner::default().scan(&[dir.path()]).unwrap().is_empty());
    }

    #[test]
    fn test_scan_file_tolerates_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.yaml");
        fs::write(&path, b"# caf\xe9 config\nimage: alpine\n\xff\xfe\nimage: redis:7").unwrap();

        let references = Scanner::default().scan_file(&path).unwrap();
        assert_eq!(references, vec!["alpine", "redis:7"]);
    }
}
