use crate::config::SearchEngineConfig;
use crate::engines::SearchMethod;
use crate::error::Result;
use crate::ingestion::atomize_tools;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ReloadRequest {
    /// Tool catalog: a bare array, `{"tools": [...]}` or `{"result": {"tools": [...]}}`
    pub tools: Value,
    #[serde(default)]
    pub config: SearchEngineConfig,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub tools: usize,
    pub methods: Vec<SearchMethod>,
}

/// POST /reload - Replace the corpus of every registered ranker.
///
/// Each ranker keeps answering from its previous index until its new one is
/// built. A failing ranker keeps its old index.
pub async fn reload_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReloadRequest>,
) -> Result<Json<ReloadResponse>> {
    let tools = atomize_tools(&request.tools)?;
    let count = tools.len();

    state.router.reload(tools, &request.config).await?;

    tracing::info!(tools = count, "Corpus reloaded");

    Ok(Json(ReloadResponse {
        tools: count,
        methods: state.router.methods(),
    }))
}
