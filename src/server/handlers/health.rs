use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (indexed_products, dimension, index_error) = match state.engine() {
        Ok(engine) => (engine.len(), Some(engine.dim()), None),
        Err(err) => (0, None, Some(err.to_string())),
    };

    Json(json!({
        "indexed_products": indexed_products,
        "dimension": dimension,
        "embedding_model": state.embedder.model(),
        "chat_model": state.advisor.model(),
        "index_error": index_error,
    }))
}
