#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use product_rag::core::config::settings::EmbeddingSettings;
use product_rag::core::errors::RagError;
use product_rag::embedding::EmbeddingClient;
use product_rag::llm::{ChatRequest, LlmProvider};

pub const VOCAB: [&str; 5] = ["camera", "headphones", "tripod", "laptop", "charger"];

/// Deterministic embedding double: normalized keyword counts over `VOCAB`
/// plus a constant bias term so no vector is all zeros.
pub struct KeywordProvider {
    pub embed_calls: AtomicUsize,
    pub chat_reply: Option<String>,
}

impl KeywordProvider {
    pub fn new() -> Self {
        Self {
            embed_calls: AtomicUsize::new(0),
            chat_reply: Some("Go with the first match.".to_string()),
        }
    }

    pub fn failing_chat() -> Self {
        Self {
            embed_calls: AtomicUsize::new(0),
            chat_reply: None,
        }
    }
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut vector: Vec<f32> = VOCAB
        .iter()
        .map(|word| lower.matches(word).count() as f32)
        .collect();
    vector.push(0.1);
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    vector.iter_mut().for_each(|x| *x /= norm);
    vector
}

#[async_trait]
impl LlmProvider for KeywordProvider {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, RagError> {
        self.chat_reply
            .clone()
            .ok_or_else(|| RagError::Remote("chat backend unavailable".to_string()))
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, RagError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(inputs.iter().map(|text| keyword_vector(text)).collect())
    }
}

pub fn embedding_settings(batch_size: usize) -> EmbeddingSettings {
    EmbeddingSettings {
        base_url: "http://unused".to_string(),
        model: "keyword-embedding".to_string(),
        batch_size,
        concurrency: 2,
        timeout: Duration::from_secs(5),
    }
}

pub fn embedder(provider: Arc<KeywordProvider>, batch_size: usize) -> EmbeddingClient {
    EmbeddingClient::new(provider, &embedding_settings(batch_size))
}

pub fn product_line(title: &str, full_text: &str) -> String {
    serde_json::json!({
        "title": title,
        "url": format!("https://shop.test/{}", title.to_lowercase().replace(' ', "-")),
        "summary": "",
        "full_text": full_text,
        "price": "$49.00",
        "rating": 4.2,
        "source": "shop.test"
    })
    .to_string()
}

/// Writes three products across two categories:
/// `audio/a.jsonl` holds the headphones, `photo/b.jsonl` the camera and tripod.
pub fn write_catalog(root: &Path) {
    fs::create_dir_all(root.join("audio")).unwrap();
    fs::create_dir_all(root.join("photo")).unwrap();
    fs::write(
        root.join("audio").join("a.jsonl"),
        format!(
            "{}\n",
            product_line("Studio Headphones", "closed back headphones for mixing")
        ),
    )
    .unwrap();
    fs::write(
        root.join("photo").join("b.jsonl"),
        format!(
            "{}\nnot json at all\n{}\n{}\n",
            product_line("Mirrorless Camera", "compact camera with camera strap"),
            r#"{"title":"No Body","url":"https://shop.test/nobody"}"#,
            product_line("Travel Tripod", "carbon tripod that fits a camera")
        ),
    )
    .unwrap();
}
