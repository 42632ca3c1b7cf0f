//! Tool search and method introspection handlers.

use crate::engines::SearchMethod;
use crate::error::{AppError, Result};
use crate::ingestion::SearchResult;
use crate::router::{EngineStatus, SearchRequest as RouterRequest};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Natural language query matched against the tool catalog
    pub query: String,
    /// Number of results (server default when omitted)
    #[serde(default)]
    pub top_k: Option<usize>,
    /// Ranking method name or alias (server default when omitted)
    #[serde(default)]
    pub method: Option<String>,
    /// Per-request deadline in milliseconds, 0 for none
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub method: SearchMethod,
    pub took_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct MethodsResponse {
    pub default: Option<SearchMethod>,
    pub methods: Vec<EngineStatus>,
    pub tools: usize,
}

/// POST /search - Rank catalog tools against a query.
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    if request.query.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Query cannot be empty".to_string(),
        ));
    }

    if let Some(top_k) = request.top_k {
        let max_top_k = state.config.max_top_k;
        if top_k == 0 {
            return Err(AppError::ValidationError(
                "top_k must be at least 1".to_string(),
            ));
        }
        if top_k > max_top_k {
            return Err(AppError::ValidationError(format!(
                "top_k must not exceed {}",
                max_top_k
            )));
        }
    }

    let method = request
        .method
        .as_deref()
        .map(|name| {
            name.parse::<SearchMethod>()
                .map_err(|_| AppError::MethodNotRegistered(name.to_string()))
        })
        .transpose()?;

    let routed = RouterRequest {
        query: request.query,
        top_k: request.top_k,
        method,
        timeout: request.timeout_ms.map(Duration::from_millis),
    };

    let response = state.router.search(routed).await?;

    Ok(Json(SearchResponse {
        results: response.results,
        method: response.method,
        took_ms: response.took.as_secs_f64() * 1000.0,
    }))
}

/// GET /methods - Registered methods with their readiness.
pub async fn methods_handler(State(state): State<Arc<AppState>>) -> Json<MethodsResponse> {
    Json(MethodsResponse {
        default: state.router.default_method(),
        methods: state.router.readiness(),
        tools: state.router.tool_count(),
    })
}
