use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::query::RankedProduct;
use crate::recommend::Recommendation;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default = "default_recommend")]
    pub recommend: bool,
}

fn default_recommend() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<RankedProduct>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let query = payload.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let limits = &state.settings.query;
    let top_k = payload
        .top_k
        .unwrap_or(limits.top_k)
        .clamp(1, limits.max_top_k);

    let engine = state.engine()?;
    let results = engine.search(query, top_k).await?;

    let recommendation = if payload.recommend {
        let products: Vec<_> = results.iter().map(|hit| hit.product.clone()).collect();
        Some(state.advisor.recommend(query, &products).await)
    } else {
        None
    };

    tracing::info!("Search '{}' returned {} results", query, results.len());

    Ok(Json(SearchResponse {
        query: query.to_string(),
        results,
        recommendation,
    }))
}
