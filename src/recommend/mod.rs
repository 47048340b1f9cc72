//! Chat-model recommendation over the products a query retrieved.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;

use crate::catalog::ProductMetadata;
use crate::core::config::settings::ChatSettings;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

pub const NO_MATCHES_TEXT: &str = "No matching products were found for this query.";
pub const DEGRADED_TEXT: &str =
    "A recommendation could not be generated right now. The ranked matches above are still valid.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub text: String,
    pub degraded: bool,
}

#[derive(Clone)]
pub struct ProductAdvisor {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f64,
}

impl ProductAdvisor {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: &ChatSettings) -> Self {
        Self {
            provider,
            model: settings.model.clone(),
            temperature: settings.temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Never fails: a chat error yields the degraded text.
    pub async fn recommend(&self, query: &str, products: &[ProductMetadata]) -> Recommendation {
        if products.is_empty() {
            return Recommendation {
                text: NO_MATCHES_TEXT.to_string(),
                degraded: false,
            };
        }

        let request = ChatRequest::new(vec![ChatMessage::user(build_prompt(query, products))])
            .with_temperature(self.temperature);

        match self.provider.chat(request, &self.model).await {
            Ok(text) => Recommendation {
                text,
                degraded: false,
            },
            Err(err) => {
                tracing::warn!("Recommendation via {} failed: {}", self.provider.name(), err);
                Recommendation {
                    text: DEGRADED_TEXT.to_string(),
                    degraded: true,
                }
            }
        }
    }
}

pub fn build_prompt(query: &str, products: &[ProductMetadata]) -> String {
    let mut context = String::new();
    for (i, product) in products.iter().enumerate() {
        if i > 0 {
            context.push_str("\n\n");
        }
        let _ = write!(
            context,
            "Title: {}\nPrice: {}\nRating: {}\nURL: {}\nCategory: {}",
            product.title,
            product.price.as_deref().unwrap_or(""),
            product.rating.as_deref().unwrap_or(""),
            product.url,
            product.category
        );
    }

    format!(
        "You are a smart shopping assistant. A user asked: \"{query}\"\n\n\
         Based on the following product data, recommend the most relevant product(s), \
         explain why, and present it in a helpful tone.\n\n\
         PRODUCT DATA:\n{context}\n\nAnswer:"
    )
}
