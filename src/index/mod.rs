//! Flat L2 vector index, its build-time accumulator, and the persisted pair.

mod builder;
mod flat;
mod store;

pub use builder::IndexBuilder;
pub use flat::{FlatL2Index, MetadataDigest, Neighbor};
pub use store::{load as load_artifacts, persist, ArtifactPaths, BuildLock};

use crate::catalog::ProductMetadata;

/// One embedded product, ready to be appended to the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub metadata: ProductMetadata,
}

impl IndexEntry {
    pub fn new(vector: Vec<f32>, metadata: ProductMetadata) -> Self {
        Self { vector, metadata }
    }
}

/// The index and its metadata, where `metadata[i]` describes vector `i`.
#[derive(Debug, Clone)]
pub struct PersistedIndex {
    pub index: FlatL2Index,
    pub metadata: Vec<ProductMetadata>,
}

impl PersistedIndex {
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}
