//! Error types for image reference canonicalization.

use thiserror::Error;

/// Reasons a raw reference cannot be canonicalized.
///
/// Every variant means "drop this reference": a malformed `image:` line must
/// never abort a whole prefetch run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// The reference string is empty.
    #[error("image reference cannot be empty")]
    Empty,

    /// The repository path has more than one `:` separated tag segment.
    #[error("image reference '{reference}' has {segments} ':' segments, expected at most 2")]
    TooManyTagSegments { reference: String, segments: usize },

    /// The reference contains whitespace or a control character.
    #[error("image reference '{}' contains invalid character {character:?}", .reference.escape_debug())]
    InvalidCharacter { reference: String, character: char },

    /// The domain, repository or tag resolved to an empty string.
    #[error("image reference '{reference}' has an empty {component}")]
    EmptyComponent {
        reference: String,
        component: &'static str,
    },
}

impl ReferenceError {
    /// Returns true if the reference had malformed tag structure.
    pub fn is_malformed_tag(&self) -> bool {
        matches!(self, ReferenceError::TooManyTagSegments { .. })
    }
}
