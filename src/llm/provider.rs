use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::RagError;

/// A hosted model endpoint: text in, vectors or text out.
///
/// Constructed once and passed to the components that need it, so tests can
/// hand in a double that never touches the network.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, RagError>;

    /// generate embeddings, one vector per input in input order
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, RagError>;
}
