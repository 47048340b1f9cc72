use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;

use super::batch::EmbeddingBatch;
use crate::core::config::settings::EmbeddingSettings;
use crate::core::errors::RagError;
use crate::index::IndexEntry;
use crate::llm::LlmProvider;

/// Embedding adapter: fixed model, fixed batch ceiling, positional output.
#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn LlmProvider>,
    model: String,
    batch_size: usize,
    concurrency: usize,
}

/// What survived the embedding stage of a build.
#[derive(Debug, Default)]
pub struct EmbeddingOutcome {
    pub entries: Vec<IndexEntry>,
    pub stats: EmbeddingStats,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmbeddingStats {
    pub batches_total: usize,
    pub batches_dropped: usize,
    pub records_dropped: usize,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: &EmbeddingSettings) -> Self {
        Self {
            provider,
            model: settings.model.clone(),
            batch_size: settings.batch_size.max(1),
            concurrency: settings.concurrency.max(1),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Batch ceiling for a single call.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Embeds up to `batch_size` texts in one call. The result has exactly
    /// one vector per input, in input order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() > self.batch_size {
            return Err(RagError::Config(format!(
                "batch of {} exceeds configured ceiling {}",
                texts.len(),
                self.batch_size
            )));
        }

        let vectors = self.provider.embed(texts, &self.model).await?;
        if vectors.len() != texts.len() {
            return Err(RagError::Remote(format!(
                "{} returned {} embeddings for {} inputs",
                self.provider.name(),
                vectors.len(),
                texts.len()
            )));
        }
        if let Some(position) = vectors.iter().position(|v| v.is_empty()) {
            return Err(RagError::Remote(format!(
                "{} returned an empty embedding at position {}",
                self.provider.name(),
                position
            )));
        }

        Ok(vectors)
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Remote("empty response from embedding service".to_string()))
    }

    /// Embeds every batch with at most `concurrency` calls in flight.
    ///
    /// Output follows batch order regardless of completion order. A batch
    /// whose call fails is dropped whole with a warning and is not retried;
    /// re-running the build is the only way to recover it.
    pub async fn embed_batches(&self, batches: Vec<EmbeddingBatch>) -> EmbeddingOutcome {
        let mut outcome = EmbeddingOutcome {
            stats: EmbeddingStats {
                batches_total: batches.len(),
                ..Default::default()
            },
            ..Default::default()
        };

        let client = self;
        let results: Vec<(EmbeddingBatch, Result<Vec<Vec<f32>>, RagError>)> =
            stream::iter(batches)
                .map(move |batch| async move {
                    let result = client.embed_batch(&batch.texts()).await;
                    (batch, result)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        for (batch, result) in results {
            match result {
                Ok(vectors) => {
                    outcome.entries.extend(
                        vectors
                            .into_iter()
                            .zip(batch.records())
                            .map(|(vector, record)| IndexEntry::new(vector, record.metadata())),
                    );
                    tracing::info!(
                        "Embedded batch {} ({} total so far)",
                        batch.number(),
                        outcome.entries.len()
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        "Dropping embedding batch {} ({} records): {}",
                        batch.number(),
                        batch.len(),
                        err
                    );
                    outcome.stats.batches_dropped += 1;
                    outcome.stats.records_dropped += batch.len();
                }
            }
        }

        outcome
    }
}
