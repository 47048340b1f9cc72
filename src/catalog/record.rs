use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A scraped product, validated at the loader boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub full_text: Option<String>,
    pub price: Option<String>,
    pub rating: Option<String>,
    /// Registered domain reported by the scraper. Not indexed.
    pub source: Option<String>,
    pub category: String,
}

impl ProductRecord {
    /// Text submitted to the embedding service for this product.
    pub fn embedding_text(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.title,
            self.summary.as_deref().unwrap_or(""),
            self.full_text.as_deref().unwrap_or("")
        )
    }

    pub fn metadata(&self) -> ProductMetadata {
        ProductMetadata {
            title: self.title.clone(),
            url: self.url.clone(),
            price: self.price.clone(),
            rating: self.rating.clone(),
            category: self.category.clone(),
        }
    }
}

/// The subset of a product persisted in the metadata sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMetadata {
    pub title: String,
    pub url: String,
    pub price: Option<String>,
    pub rating: Option<String>,
    pub category: String,
}

/// One JSONL line as the scraper writes it. Every field is optional here;
/// `into_record` decides what survives.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawProductLine {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    full_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    price: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    rating: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

impl RawProductLine {
    /// Applies the minimum-viable-record filter: a title, a URL and some
    /// full text are required.
    pub(crate) fn into_record(self, category: &str) -> Option<ProductRecord> {
        let title = non_empty(self.title)?;
        let url = non_empty(self.url)?;
        let full_text = non_empty(self.full_text)?;

        Some(ProductRecord {
            title,
            url,
            summary: self.summary,
            full_text: Some(full_text),
            price: non_empty(self.price),
            rating: non_empty(self.rating),
            source: non_empty(self.source),
            category: category.to_string(),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Accepts strings and numbers; anything else reads as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}
