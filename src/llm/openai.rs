use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::errors::RagError;

/// OpenAI-compatible HTTP provider (`/embeddings`, `/chat/completions`).
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.map(str::trim).filter(|key| !key.is_empty()) {
            let auth = format!("Bearer {}", key);
            let value = HeaderValue::from_str(&auth)
                .map_err(|_| RagError::Config("invalid OpenAI API key".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, RagError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature { obj.insert("temperature".to_string(), json!(t)); }
            if let Some(t) = request.max_tokens { obj.insert("max_tokens".to_string(), json!(t)); }
        }

        let res = self.client.post(&url)
            .json(&body)
            .send()
            .await
            .map_err(RagError::remote)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Remote(format!("chat request failed ({}): {}", status, text)));
        }

        let payload: ChatCompletionResponse = res.json().await.map_err(RagError::remote)?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| RagError::Remote("chat response contained no content".to_string()))
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, RagError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: model_id,
            input: inputs,
        };

        let res = self.client.post(&url)
            .json(&body)
            .send()
            .await
            .map_err(RagError::remote)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Remote(format!("embedding request failed ({}): {}", status, text)));
        }

        let mut parsed: EmbeddingResponse = res.json().await.map_err(RagError::remote)?;
        // position comes from `index`, not array order
        parsed.data.sort_by_key(|entry| entry.index);

        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}
