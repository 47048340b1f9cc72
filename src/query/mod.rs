//! Read side: embeds a query, searches the loaded index, and maps hits back
//! to product metadata.

use serde::Serialize;

use crate::catalog::ProductMetadata;
use crate::core::errors::RagError;
use crate::embedding::EmbeddingClient;
use crate::index::{self, ArtifactPaths, FlatL2Index, PersistedIndex};

/// One search hit with its 1-based rank and squared L2 distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedProduct {
    pub rank: usize,
    pub distance: f32,
    pub product: ProductMetadata,
}

/// Immutable once loaded; share it behind an `Arc`.
pub struct QueryEngine {
    index: FlatL2Index,
    metadata: Vec<ProductMetadata>,
    embedder: EmbeddingClient,
}

impl QueryEngine {
    /// Wraps an already loaded pair. Positions the metadata does not cover
    /// are dropped at search time.
    pub fn new(persisted: PersistedIndex, embedder: EmbeddingClient) -> Self {
        Self {
            index: persisted.index,
            metadata: persisted.metadata,
            embedder,
        }
    }

    /// Loads and cross-checks the artifacts at `paths`.
    pub fn load(paths: &ArtifactPaths, embedder: EmbeddingClient) -> Result<Self, RagError> {
        let persisted = index::load_artifacts(paths)?;
        tracing::info!(
            "Query engine ready: {} products, dimension {}",
            persisted.metadata.len(),
            persisted.index.dim()
        );
        Ok(Self::new(persisted, embedder))
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.index.dim()
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model()
    }

    /// Up to `top_k` products closest to `text`, nearest first.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ProductMetadata>, RagError> {
        Ok(self
            .search(text, top_k)
            .await?
            .into_iter()
            .map(|hit| hit.product)
            .collect())
    }

    pub async fn search(&self, text: &str, top_k: usize) -> Result<Vec<RankedProduct>, RagError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(text).await?;
        self.search_vector(&vector, top_k)
    }

    /// Searches with a precomputed query vector.
    pub fn search_vector(&self, vector: &[f32], top_k: usize) -> Result<Vec<RankedProduct>, RagError> {
        if vector.len() != self.index.dim() {
            return Err(RagError::DimensionMismatch {
                expected: self.index.dim(),
                actual: vector.len(),
            });
        }

        let neighbors = self.index.search(vector, top_k)?;
        Ok(neighbors
            .into_iter()
            .filter_map(|neighbor| {
                self.metadata
                    .get(neighbor.position)
                    .map(|product| (neighbor.distance, product.clone()))
            })
            .enumerate()
            .map(|(i, (distance, product))| RankedProduct {
                rank: i + 1,
                distance,
                product,
            })
            .collect())
    }
}
