//! Adapter over the hosted embedding service.

mod batch;
mod client;

pub use batch::{into_batches, EmbeddingBatch};
pub use client::{EmbeddingClient, EmbeddingOutcome, EmbeddingStats};
