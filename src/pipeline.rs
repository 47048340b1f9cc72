//! Offline build: scraped JSONL → embeddings → persisted index pair.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::{self, LoadStats};
use crate::core::config::{AppPaths, RagSettings};
use crate::core::errors::RagError;
use crate::embedding::{into_batches, EmbeddingClient, EmbeddingStats};
use crate::index::{self, ArtifactPaths, BuildLock, IndexBuilder};

/// Summary of a completed build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub load: LoadStats,
    pub records_loaded: usize,
    pub embedding: EmbeddingStats,
    pub vectors_indexed: usize,
    pub dimension: usize,
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
    pub finished_at: DateTime<Utc>,
}

pub struct IndexPipeline {
    content_dir: PathBuf,
    artifacts: ArtifactPaths,
    embedder: EmbeddingClient,
}

impl IndexPipeline {
    pub fn new(content_dir: PathBuf, artifacts: ArtifactPaths, embedder: EmbeddingClient) -> Self {
        Self {
            content_dir,
            artifacts,
            embedder,
        }
    }

    pub fn from_settings(paths: &AppPaths, settings: &RagSettings, embedder: EmbeddingClient) -> Self {
        Self::new(
            paths.resolve(&settings.paths.content_dir),
            ArtifactPaths::from_settings(paths, settings),
            embedder,
        )
    }

    pub fn artifacts(&self) -> &ArtifactPaths {
        &self.artifacts
    }

    /// Runs a full rebuild. Nothing on disk changes unless every stage
    /// succeeds; a second concurrent build is refused.
    pub async fn run(&self) -> Result<BuildReport, RagError> {
        let _lock = BuildLock::acquire(&self.artifacts)?;

        let loaded = catalog::load_records(&self.content_dir)?;
        let records_loaded = loaded.records.len();
        tracing::info!(
            "Loaded {} records from {} ({} files, {} lines skipped, {} records excluded)",
            records_loaded,
            self.content_dir.display(),
            loaded.stats.files_scanned,
            loaded.stats.lines_skipped,
            loaded.stats.records_excluded
        );
        if records_loaded == 0 {
            return Err(RagError::NoVectors);
        }

        let batches = into_batches(loaded.records, self.embedder.batch_size());
        tracing::info!(
            "Embedding {} records in {} batches with {}",
            records_loaded,
            batches.len(),
            self.embedder.model()
        );
        let outcome = self.embedder.embed_batches(batches).await;
        if outcome.stats.batches_dropped > 0 {
            tracing::warn!(
                "{} of {} batches failed; {} records left out of the index",
                outcome.stats.batches_dropped,
                outcome.stats.batches_total,
                outcome.stats.records_dropped
            );
        }

        let mut builder = IndexBuilder::new();
        builder.extend(outcome.entries)?;
        let built = builder.finish()?;
        let vectors_indexed = built.index.count();
        let dimension = built.index.dim();

        index::persist(&built, &self.artifacts)?;

        Ok(BuildReport {
            load: loaded.stats,
            records_loaded,
            embedding: outcome.stats,
            vectors_indexed,
            dimension,
            index_path: self.artifacts.index_path.clone(),
            metadata_path: self.artifacts.metadata_path.clone(),
            finished_at: Utc::now(),
        })
    }
}
