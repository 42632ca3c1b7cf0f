//! Ranking backends.
//!
//! Every backend implements [`Ranker`] and owns its index exclusively through
//! an [`IndexSlot`]. Scores are backend-specific and must not be compared
//! across methods.

pub mod bm25;
pub mod pattern;
pub mod semantic;
pub mod slot;

pub use bm25::Bm25Ranker;
pub use pattern::PatternRanker;
pub use semantic::SemanticRanker;
pub use slot::IndexSlot;

use crate::config::SearchEngineConfig;
use crate::error::{AppError, Result};
use crate::ingestion::{SearchResult, ToolDefinition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    /// Lexical BM25 scoring.
    Bm25,
    /// Embedding cosine similarity.
    Semantic,
    /// Name and substring heuristics.
    Pattern,
}

impl SearchMethod {
    pub const ALL: [SearchMethod; 3] = [
        SearchMethod::Bm25,
        SearchMethod::Semantic,
        SearchMethod::Pattern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Bm25 => "bm25",
            SearchMethod::Semantic => "semantic",
            SearchMethod::Pattern => "pattern",
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bm25" | "lexical" => Ok(Self::Bm25),
            "semantic" | "embedding" | "vector" => Ok(Self::Semantic),
            "pattern" | "heuristic" | "regex" => Ok(Self::Pattern),
            other => Err(format!("unknown search method '{other}'")),
        }
    }
}

/// Common contract of every ranking backend.
///
/// `initialize` and `reload` build a complete index before publishing it, so
/// a concurrent `search` scores against either the previous or the new corpus
/// and never a mix of both.
#[async_trait]
pub trait Ranker: Send + Sync {
    fn method(&self) -> SearchMethod;

    /// Reject a config this ranker could never apply. Called by the router
    /// before any ranker starts building, so a bad config changes nothing.
    fn validate_config(&self, _config: &SearchEngineConfig) -> Result<()> {
        Ok(())
    }

    async fn initialize(&self, tools: &[ToolDefinition], config: &SearchEngineConfig)
        -> Result<()>;

    /// Replace the corpus wholesale.
    async fn reload(&self, tools: &[ToolDefinition], config: &SearchEngineConfig) -> Result<()> {
        self.initialize(tools, config).await
    }

    /// Up to `top_k` results, score descending, ties in corpus order.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>>;

    /// False before the first successful initialize and while a reload runs.
    fn is_ready(&self) -> bool;

    /// Number of tools in the published index.
    fn tool_count(&self) -> usize;

    /// Number of indexes published so far.
    fn generation(&self) -> u64;
}

/// Stable descending sort of `(corpus_index, score)` pairs.
pub(crate) fn rank_descending(scored: &mut [(usize, f64)]) {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
}

/// Run CPU-bound index or scoring work on the blocking pool.
pub(crate) async fn run_blocking<F, R>(task: &'static str, work: F) -> Result<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::TaskFailed(format!("{task}: {e}")))
}
