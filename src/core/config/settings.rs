use std::env;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct PathSettings {
    pub content_dir: String,
    pub index_file: String,
    pub metadata_file: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingSettings {
    pub base_url: String,
    pub model: String,
    /// Batch ceiling: maximum texts per embedding call.
    pub batch_size: usize,
    /// Maximum embedding calls in flight during a build.
    pub concurrency: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuerySettings {
    pub top_k: usize,
    pub max_top_k: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

/// Typed view over the merged YAML configuration.
#[derive(Debug, Clone, Serialize)]
pub struct RagSettings {
    pub paths: PathSettings,
    pub embedding: EmbeddingSettings,
    pub chat: ChatSettings,
    pub query: QuerySettings,
    pub server: ServerSettings,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl RagSettings {
    pub fn from_config(config: &Value) -> Self {
        let paths = PathSettings {
            content_dir: string_at(config, "paths", "content_dir")
                .unwrap_or_else(|| "scraped_results".to_string()),
            index_file: string_at(config, "paths", "index_file")
                .unwrap_or_else(|| "product.index".to_string()),
            metadata_file: string_at(config, "paths", "metadata_file")
                .unwrap_or_else(|| "product_metadata.json".to_string()),
        };

        let embedding = EmbeddingSettings {
            base_url: string_at(config, "embedding", "base_url")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: string_at(config, "embedding", "model")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            batch_size: u64_at(config, "embedding", "batch_size")
                .unwrap_or(DEFAULT_BATCH_SIZE as u64)
                .clamp(1, 2048) as usize,
            concurrency: u64_at(config, "embedding", "concurrency")
                .unwrap_or(4)
                .clamp(1, 32) as usize,
            timeout: Duration::from_secs(
                u64_at(config, "embedding", "timeout_secs")
                    .unwrap_or(60)
                    .max(1),
            ),
        };

        let chat = ChatSettings {
            base_url: string_at(config, "chat", "base_url")
                .unwrap_or_else(|| embedding.base_url.clone()),
            model: string_at(config, "chat", "model")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            temperature: config
                .get("chat")
                .and_then(|v| v.get("temperature"))
                .and_then(|v| v.as_f64())
                .unwrap_or(0.7)
                .clamp(0.0, 2.0),
            timeout: Duration::from_secs(u64_at(config, "chat", "timeout_secs").unwrap_or(120).max(1)),
        };

        let max_top_k = u64_at(config, "query", "max_top_k").unwrap_or(50).max(1) as usize;
        let query = QuerySettings {
            top_k: (u64_at(config, "query", "top_k").unwrap_or(5).max(1) as usize).min(max_top_k),
            max_top_k,
        };

        let server = ServerSettings {
            host: string_at(config, "server", "host").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: u64_at(config, "server", "port")
                .and_then(|port| u16::try_from(port).ok())
                .unwrap_or(0),
            cors_allowed_origins: config
                .get("server")
                .and_then(|v| v.get("cors_allowed_origins"))
                .and_then(|v| v.as_array())
                .map(|list| {
                    list.iter()
                        .filter_map(|item| item.as_str())
                        .map(str::trim)
                        .filter(|item| !item.is_empty())
                        .map(|item| item.to_string())
                        .collect()
                })
                .unwrap_or_default(),
        };

        let api_key = string_at(config, "openai", "api_key")
            .or_else(|| env::var("OPENAI_API_KEY").ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Self {
            paths,
            embedding,
            chat,
            query,
            server,
            api_key,
        }
    }
}

fn string_at(config: &Value, section: &str, key: &str) -> Option<String> {
    config
        .get(section)
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn u64_at(config: &Value, section: &str, key: &str) -> Option<u64> {
    config
        .get(section)
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_apply_to_empty_config() {
        let settings = RagSettings::from_config(&json!({}));

        assert_eq!(settings.paths.content_dir, "scraped_results");
        assert_eq!(settings.paths.index_file, "product.index");
        assert_eq!(settings.paths.metadata_file, "product_metadata.json");
        assert_eq!(settings.embedding.model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(settings.embedding.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(settings.embedding.concurrency, 4);
        assert_eq!(settings.chat.model, DEFAULT_CHAT_MODEL);
        assert_eq!(settings.chat.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.query.top_k, 5);
        assert_eq!(settings.query.max_top_k, 50);
        assert_eq!(settings.server.port, 0);
    }

    #[test]
    fn explicit_values_are_clamped() {
        let settings = RagSettings::from_config(&json!({
            "embedding": { "batch_size": 10_000, "concurrency": 0, "base_url": "http://localhost:1234/v1" },
            "chat": { "temperature": 9.0 },
            "query": { "top_k": 80, "max_top_k": 20 },
            "openai": { "api_key": "  sk-from-config  " }
        }));

        assert_eq!(settings.embedding.batch_size, 2048);
        assert_eq!(settings.embedding.concurrency, 1);
        assert_eq!(settings.chat.base_url, "http://localhost:1234/v1");
        assert_eq!(settings.chat.temperature, 2.0);
        assert_eq!(settings.query.top_k, 20);
        assert_eq!(settings.api_key.as_deref(), Some("sk-from-config"));
    }
}
