//! Ollama embedding client.
//!
//! Talks to the `/api/embed` endpoint, which accepts a batch of inputs and
//! returns one embedding per input in request order.

use crate::embedding::provider::EmbeddingProvider;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// HTTP client for an Ollama-compatible embedding server.
///
/// Constructed explicitly and handed to the semantic ranker; there is no
/// process-wide default client.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::info!(base_url = %base_url, timeout_ms = timeout.as_millis() as u64, "Ollama client configured");

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let start = std::time::Instant::now();
        let response = self
            .http
            .post(format!("{}/api/embed", self.base_url))
            .json(&EmbedRequest { model, input: texts })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderUnavailable(format!(
                "ollama returned {} for model '{}': {}",
                status,
                model,
                body.trim()
            )));
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            AppError::ProviderUnavailable(format!("Malformed embedding response: {}", e))
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(AppError::ProviderUnavailable(format!(
                "ollama returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }

        tracing::debug!(
            model,
            inputs = texts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Embedding batch completed"
        );

        Ok(parsed.embeddings)
    }
}
