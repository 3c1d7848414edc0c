//! Canonical image reference type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ReferenceError;

/// Registry assumed when a reference omits its domain.
pub const DEFAULT_DOMAIN: &str = "docker.io";

/// Namespace implied for single-segment repositories on the default registry.
pub const OFFICIAL_LIBRARY: &str = "library";

/// Tag assumed when a reference omits one.
pub const DEFAULT_TAG: &str = "latest";

/// A fully-qualified container image reference.
///
/// The fields map one-to-one onto the serialized `domain/repository:tag`
/// form, so two references are equal exactly when their strings are.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageRef {
    domain: String,
    repository: String,
    tag: String,
}

impl ImageRef {
    /// Resolves a raw reference into its canonical form.
    ///
    /// Follows the runtime shorthand rules: the part before the first `/` is
    /// a domain only if it contains `.` or `:`; single-segment repositories
    /// on [`DEFAULT_DOMAIN`] gain the [`OFFICIAL_LIBRARY`] prefix; a missing
    /// tag becomes [`DEFAULT_TAG`].
    pub fn canonicalize(raw: &str) -> Result<Self, ReferenceError> {
        if raw.is_empty() {
            return Err(ReferenceError::Empty);
        }
        // Canonical references are joined with spaces and word-split by the puller.
        if let Some(character) = raw.chars().find(|c| c.is_whitespace() || c.is_control()) {
            return Err(ReferenceError::InvalidCharacter {
                reference: raw.to_string(),
                character,
            });
        }

        let (domain, remainder) = match raw.split_once('/') {
            Some((head, rest)) if head.contains(['.', ':']) => (head, rest),
            _ => (DEFAULT_DOMAIN, raw),
        };

        let path = if domain == DEFAULT_DOMAIN && !remainder.contains('/') {
            format!("{OFFICIAL_LIBRARY}/{remainder}")
        } else {
            remainder.to_string()
        };

        let segments: Vec<&str> = path.split(':').collect();
        let (repository, tag) = match segments.as_slice() {
            [repository] => (*repository, DEFAULT_TAG),
            [repository, tag] => (*repository, *tag),
            _ => {
                return Err(ReferenceError::TooManyTagSegments {
                    reference: raw.to_string(),
                    segments: segments.len(),
                })
            }
        };

        if repository.split('/').any(str::is_empty) {
            return Err(ReferenceError::EmptyComponent {
                reference: raw.to_string(),
                component: "repository",
            });
        }
        if tag.is_empty() {
            return Err(ReferenceError::EmptyComponent {
                reference: raw.to_string(),
                component: "tag",
            });
        }

        Ok(Self {
            domain: domain.to_string(),
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Registry domain, e.g. `docker.io` or `localhost:5000`.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Repository path without domain or tag, e.g. `library/alpine`.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Tag (or the hex part of a digest reference).
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns true if the image lives on the default registry.
    pub fn is_default_registry(&self) -> bool {
        self.domain == DEFAULT_DOMAIN
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.domain, self.repository, self.tag)
    }
}

impl FromStr for ImageRef {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::canonicalize(s)
    }
}

impl TryFrom<String> for ImageRef {
    type Error = ReferenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::canonicalize(&value)
    }
}

impl From<ImageRef> for String {
    fn from(image: ImageRef) -> Self {
        image.to_string()
    }
}
