//! Embedding-based semantic ranker.
//!
//! Tools are serialized with the configured [`EmbeddingFormat`], embedded in
//! one batched provider call and compared to the query by cosine similarity.
//! The query is always embedded with the model the active index was built
//! with, so a model change only takes effect through a reload.

use crate::config::{SearchEngineConfig, DEFAULT_EMBEDDING_MODEL};
use crate::embedding::{cosine_similarity, format_tool, EmbeddingFormat, EmbeddingProvider};
use crate::engines::slot::IndexSlot;
use crate::engines::{rank_descending, run_blocking, Ranker, SearchMethod};
use crate::error::{AppError, Result};
use crate::ingestion::{SearchResult, ToolDefinition};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticSettings {
    pub model: String,
    pub format: EmbeddingFormat,
}

impl Default for SemanticSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            format: EmbeddingFormat::default(),
        }
    }
}

struct SemanticEntry {
    tool: ToolDefinition,
    vector: Vec<f32>,
    text: String,
}

struct SemanticIndex {
    entries: Vec<SemanticEntry>,
    model: String,
    dims: usize,
}

impl SemanticIndex {
    fn rank(&self, query_vector: &[f32], top_k: usize) -> Vec<SearchResult> {
        let mut scored: Vec<(usize, f64)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (idx, cosine_similarity(query_vector, &entry.vector)))
            .collect();
        rank_descending(&mut scored);

        tracing::debug!(model = %self.model, top_k, "Semantic search");

        scored
            .into_iter()
            .take(top_k)
            .map(|(idx, score)| SearchResult::from_tool(&self.entries[idx].tool, score))
            .collect()
    }
}

pub struct SemanticRanker {
    provider: Arc<dyn EmbeddingProvider>,
    slot: IndexSlot<SemanticIndex, SemanticSettings>,
}

impl SemanticRanker {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_settings(provider, SemanticSettings::default())
    }

    pub fn with_settings(provider: Arc<dyn EmbeddingProvider>, settings: SemanticSettings) -> Self {
        Self {
            provider,
            slot: IndexSlot::new(settings),
        }
    }

    /// Model and format of the published index.
    pub async fn settings(&self) -> SemanticSettings {
        self.slot.settings().await
    }

    /// The text that was embedded for `name`, if indexed.
    pub fn indexed_text(&self, name: &str) -> Option<String> {
        let index = self.slot.snapshot()?;
        index
            .entries
            .iter()
            .find(|entry| entry.tool.name == name)
            .map(|entry| entry.text.clone())
    }

    /// Vector width of the published index (0 for an empty corpus).
    pub fn dimensions(&self) -> Option<usize> {
        self.slot.snapshot().map(|index| index.dims)
    }
}

#[async_trait]
impl Ranker for SemanticRanker {
    fn method(&self) -> SearchMethod {
        SearchMethod::Semantic
    }

    fn validate_config(&self, config: &SearchEngineConfig) -> Result<()> {
        match &config.model {
            Some(model) if model.trim().is_empty() => Err(AppError::ValidationError(
                "embedding model must not be empty".to_string(),
            )),
            _ => Ok(()),
        }
    }

    async fn initialize(&self, tools: &[ToolDefinition], config: &SearchEngineConfig) -> Result<()> {
        let writer = self.slot.begin_write().await;

        let mut settings = writer.settings().clone();
        if let Some(model) = &config.model {
            settings.model = model.clone();
        }
        if let Some(format) = config.format {
            settings.format = format;
        }

        let start = std::time::Instant::now();
        let texts: Vec<String> = tools
            .iter()
            .map(|tool| format_tool(tool, settings.format))
            .collect();

        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.provider.embed(&settings.model, &texts).await?
        };

        if vectors.len() != texts.len() {
            return Err(AppError::ProviderUnavailable(format!(
                "{} returned {} vectors for {} tools",
                self.provider.name(),
                vectors.len(),
                texts.len()
            )));
        }

        let dims = vectors.first().map_or(0, Vec::len);
        if let Some(odd) = vectors.iter().find(|v| v.len() != dims) {
            return Err(AppError::DimensionMismatch {
                expected: dims,
                actual: odd.len(),
            });
        }

        let entries = tools
            .iter()
            .zip(vectors)
            .zip(texts)
            .map(|((tool, vector), text)| SemanticEntry {
                tool: tool.clone(),
                vector,
                text,
            })
            .collect();

        let index = SemanticIndex {
            entries,
            model: settings.model.clone(),
            dims,
        };
        let generation = writer.publish(index, settings.clone());

        tracing::info!(
            tools = tools.len(),
            provider = self.provider.name(),
            model = %settings.model,
            format = %settings.format,
            dims,
            generation,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Semantic index built"
        );
        Ok(())
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let index = self
            .slot
            .snapshot()
            .ok_or(AppError::NotInitialized(SearchMethod::Semantic))?;

        if index.entries.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.provider.embed_one(&index.model, query).await?;
        if query_vector.len() != index.dims {
            return Err(AppError::DimensionMismatch {
                expected: index.dims,
                actual: query_vector.len(),
            });
        }

        run_blocking("semantic scoring", move || index.rank(&query_vector, top_k)).await
    }

    fn is_ready(&self) -> bool {
        self.slot.is_ready()
    }

    fn tool_count(&self) -> usize {
        self.slot.snapshot().map_or(0, |index| index.entries.len())
    }

    fn generation(&self) -> u64 {
        self.slot.generation()
    }
}
