use std::sync::Arc;

use crate::core::config::{AppPaths, ConfigService, RagSettings};
use crate::core::errors::RagError;
use crate::embedding::EmbeddingClient;
use crate::index::ArtifactPaths;
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::query::QueryEngine;
use crate::recommend::ProductAdvisor;

pub mod error;

use error::InitializationError;

/// Shared state behind every route.
///
/// The query engine is loaded once at startup. When the artifacts are
/// missing or corrupt the server still starts; search requests then fail
/// with the recorded artifact error until the process is restarted after a
/// successful build.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: RagSettings,
    pub embedder: EmbeddingClient,
    pub advisor: ProductAdvisor,
    engine: Result<Arc<QueryEngine>, String>,
}

impl AppState {
    /// Loads configuration, connects the OpenAI-compatible providers and
    /// opens the persisted index.
    pub fn initialize(config: ConfigService) -> Result<Arc<Self>, InitializationError> {
        let raw = config
            .load_config()
            .map_err(|e| InitializationError::Config(e.into()))?;
        let settings = RagSettings::from_config(&raw);

        let embedding_provider = OpenAiProvider::new(
            &settings.embedding.base_url,
            settings.api_key.as_deref(),
            settings.embedding.timeout,
        )
        .map_err(|e| InitializationError::Llm(e.into()))?;
        let chat_provider = OpenAiProvider::new(
            &settings.chat.base_url,
            settings.api_key.as_deref(),
            settings.chat.timeout,
        )
        .map_err(|e| InitializationError::Llm(e.into()))?;

        if settings.api_key.is_none() {
            tracing::warn!("No OpenAI API key configured; remote calls will likely be rejected");
        }

        Ok(Arc::new(Self::with_providers(
            config,
            settings,
            Arc::new(embedding_provider),
            Arc::new(chat_provider),
        )))
    }

    /// Assembles state from already constructed providers.
    pub fn with_providers(
        config: ConfigService,
        settings: RagSettings,
        embedding_provider: Arc<dyn LlmProvider>,
        chat_provider: Arc<dyn LlmProvider>,
    ) -> Self {
        let paths = Arc::new(config.paths().clone());
        let embedder = EmbeddingClient::new(embedding_provider, &settings.embedding);
        let advisor = ProductAdvisor::new(chat_provider, &settings.chat);

        let artifacts = ArtifactPaths::from_settings(&paths, &settings);
        let engine = match QueryEngine::load(&artifacts, embedder.clone()) {
            Ok(engine) => Ok(Arc::new(engine)),
            Err(err) => {
                tracing::warn!("Index not available: {}", err);
                Err(match err {
                    RagError::Artifact(msg) => msg,
                    other => other.to_string(),
                })
            }
        };

        Self {
            paths,
            config,
            settings,
            embedder,
            advisor,
            engine,
        }
    }

    pub fn artifacts(&self) -> ArtifactPaths {
        ArtifactPaths::from_settings(&self.paths, &self.settings)
    }

    /// The loaded query engine, or the artifact error recorded at startup.
    pub fn engine(&self) -> Result<Arc<QueryEngine>, RagError> {
        self.engine.clone().map_err(RagError::Artifact)
    }
}
