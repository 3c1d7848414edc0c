//! The deduplicated set of images to distribute.

use std::collections::btree_set;
use std::collections::BTreeSet;

use itk_imageref::{ImageRef, ReferenceError};
use tracing::warn;

/// Unique canonical image references.
///
/// Uniqueness is by canonical string. Iteration is sorted so rendered
/// manifests are deterministic; no caller should depend on the order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionSet {
    images: BTreeSet<ImageRef>,
}

impl DistributionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a canonical reference. Returns false if it was already present.
    pub fn insert(&mut self, image: ImageRef) -> bool {
        self.images.insert(image)
    }

    /// Canonicalize and insert a raw reference.
    pub fn insert_raw(&mut self, raw: &str) -> Result<bool, ReferenceError> {
        ImageRef::canonicalize(raw).map(|image| self.insert(image))
    }

    /// Canonicalize and insert a batch of raw references.
    ///
    /// Malformed references are logged and skipped. Returns how many were
    /// dropped.
    pub fn extend_raw<I, S>(&mut self, raw: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dropped = 0;
        for reference in raw {
            let reference = reference.as_ref();
            if let Err(err) = self.insert_raw(reference) {
                warn!(reference = %reference, error = %err, "Dropping malformed image reference");
                dropped += 1;
            }
        }
        dropped
    }

    /// Returns true if the set contains this image.
    pub fn contains(&self, image: &ImageRef) -> bool {
        self.images.contains(image)
    }

    /// Number of unique images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Returns true if there is nothing to distribute.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Iterate over the images in sorted order.
    pub fn iter(&self) -> btree_set::Iter<'_, ImageRef> {
        self.images.iter()
    }

    /// The images joined by single spaces.
    pub fn joined(&self) -> String {
        self.images
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Consume the set into a sorted list.
    pub fn into_vec(self) -> Vec<ImageRef> {
        self.images.into_iter().collect()
    }
}

impl FromIterator<ImageRef> for DistributionSet {
    fn from_iter<T: IntoIterator<Item = ImageRef>>(iter: T) -> Self {
        Self {
            images: iter.into_iter().collect(),
        }
    }
}

impl Extend<ImageRef> for DistributionSet {
    fn extend<T: IntoIterator<Item = ImageRef>>(&mut self, iter: T) {
        self.images.extend(iter);
    }
}

impl<'a> IntoIterator for &'a DistributionSet {
    type Item = &'a ImageRef;
    type IntoIter = btree_set::Iter<'a, ImageRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}
