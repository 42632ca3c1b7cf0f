//! Search router: method registry, corpus fan-out and query dispatch.

use crate::config::SearchEngineConfig;
use crate::engines::{Ranker, SearchMethod};
use crate::error::{AppError, RankerFailure, Result};
use crate::ingestion::{SearchResult, ToolDefinition};
use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Number of results returned when a request does not say.
pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: Option<usize>,
    /// Explicit method; the router default when `None`.
    pub method: Option<SearchMethod>,
    /// Deadline for this call; the router default when `None`, none at all
    /// when zero.
    pub timeout: Option<Duration>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: None,
            method: None,
            timeout: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_method(mut self, method: SearchMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub method: SearchMethod,
    /// Wall-clock time spent inside the ranker.
    pub took: Duration,
}

/// Readiness snapshot of one registered ranker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub method: SearchMethod,
    pub ready: bool,
    pub tools: usize,
    pub generation: u64,
}

#[derive(Clone, Copy)]
enum FanOut {
    Initialize,
    Reload,
}

/// Dispatches queries to registered rankers.
///
/// Registration (`register_engine`, `set_default_method`) takes `&mut self`
/// and is meant for setup. Everything else is `&self` and safe to share
/// behind an `Arc`.
pub struct SearchRouter {
    engines: BTreeMap<SearchMethod, Arc<dyn Ranker>>,
    default_method: Option<SearchMethod>,
    default_top_k: usize,
    default_timeout: Option<Duration>,
    corpus: RwLock<Arc<Vec<ToolDefinition>>>,
    corpus_writer: Mutex<()>,
}

impl Default for SearchRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchRouter {
    pub fn new() -> Self {
        Self {
            engines: BTreeMap::new(),
            default_method: None,
            default_top_k: DEFAULT_TOP_K,
            default_timeout: None,
            corpus: RwLock::new(Arc::new(Vec::new())),
            corpus_writer: Mutex::new(()),
        }
    }

    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    /// Deadline for searches that set none. `Duration::ZERO` disables it.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Register `ranker` under its method, replacing any previous one. The
    /// first registered ranker becomes the default.
    pub fn register_engine(&mut self, ranker: Arc<dyn Ranker>) {
        let method = ranker.method();
        if self.engines.insert(method, ranker).is_some() {
            tracing::warn!(%method, "Replacing registered search engine");
        }
        self.default_method.get_or_insert(method);
        tracing::debug!(%method, "Search engine registered");
    }

    pub fn set_default_method(&mut self, method: SearchMethod) -> Result<()> {
        if !self.engines.contains_key(&method) {
            return Err(AppError::MethodNotRegistered(method.to_string()));
        }
        self.default_method = Some(method);
        Ok(())
    }

    /// Hand the corpus to every registered ranker concurrently.
    ///
    /// `config` is checked by every ranker first; an invalid config is
    /// returned as `AppError::ValidationError` and no ranker is touched.
    /// After that, succeeds only if every ranker succeeds. Otherwise returns
    /// `AppError::InitializationFailed` listing each failing ranker; rankers
    /// that did succeed keep their new index.
    pub async fn initialize(
        &self,
        tools: Vec<ToolDefinition>,
        config: &SearchEngineConfig,
    ) -> Result<()> {
        self.fan_out(tools, config, FanOut::Initialize).await
    }

    /// Replace the corpus of every registered ranker.
    pub async fn reload(&self, tools: Vec<ToolDefinition>, config: &SearchEngineConfig) -> Result<()> {
        self.fan_out(tools, config, FanOut::Reload).await
    }

    async fn fan_out(
        &self,
        tools: Vec<ToolDefinition>,
        config: &SearchEngineConfig,
        kind: FanOut,
    ) -> Result<()> {
        if self.engines.is_empty() {
            return Err(AppError::ConfigError(
                "No search engines registered".to_string(),
            ));
        }

        for engine in self.engines.values() {
            if let Err(e) = engine.validate_config(config) {
                tracing::warn!(method = %engine.method(), error = %e, "Rejected ranker config");
                return Err(e);
            }
        }

        let _writer = self.corpus_writer.lock().await;
        let start = Instant::now();

        let tasks = self.engines.values().map(|engine| {
            let tools = tools.as_slice();
            async move {
                let outcome = match kind {
                    FanOut::Initialize => engine.initialize(tools, config).await,
                    FanOut::Reload => engine.reload(tools, config).await,
                };
                (engine.method(), outcome)
            }
        });

        let failures: Vec<RankerFailure> = join_all(tasks)
            .await
            .into_iter()
            .filter_map(|(method, outcome)| {
                outcome.err().map(|error| {
                    tracing::error!(%method, error = %error, "Ranker failed to index corpus");
                    RankerFailure { method, error }
                })
            })
            .collect();

        if !failures.is_empty() {
            return Err(AppError::InitializationFailed(failures));
        }

        let count = tools.len();
        *self.corpus.write() = Arc::new(tools);

        if matches!(kind, FanOut::Reload) {
            metrics::counter!("corpus_reloads_total").increment(1);
        }
        metrics::gauge!("corpus_tools").set(count as f64);
        tracing::info!(
            tools = count,
            engines = self.engines.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Corpus indexed by all engines"
        );
        Ok(())
    }

    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        let method = request
            .method
            .or(self.default_method)
            .ok_or_else(|| AppError::MethodNotRegistered("default".to_string()))?;
        let engine = self
            .engines
            .get(&method)
            .ok_or_else(|| AppError::MethodNotRegistered(method.to_string()))?;

        if !engine.is_ready() {
            return Err(AppError::NotReady(method));
        }

        let top_k = request.top_k.unwrap_or(self.default_top_k);
        // A zero deadline, per request or default, means no deadline.
        let deadline = request
            .timeout
            .or(self.default_timeout)
            .filter(|limit| !limit.is_zero());

        let start = Instant::now();
        let outcome = match deadline {
            Some(limit) => tokio::time::timeout(limit, engine.search(&request.query, top_k))
                .await
                .unwrap_or(Err(AppError::Timeout {
                    method,
                    after: limit,
                })),
            None => engine.search(&request.query, top_k).await,
        };
        let took = start.elapsed();

        metrics::counter!("search_requests_total", "method" => method.as_str()).increment(1);
        metrics::histogram!("search_latency_ms", "method" => method.as_str())
            .record(took.as_secs_f64() * 1000.0);

        let results = match outcome {
            Ok(results) => results,
            Err(err) => {
                metrics::counter!("search_errors_total", "method" => method.as_str()).increment(1);
                return Err(err);
            }
        };

        tracing::debug!(
            %method,
            top_k,
            results = results.len(),
            took_us = took.as_micros() as u64,
            "Search completed"
        );

        Ok(SearchResponse {
            results,
            method,
            took,
        })
    }

    pub async fn search_with(
        &self,
        method: SearchMethod,
        query: &str,
        top_k: usize,
    ) -> Result<SearchResponse> {
        self.search(
            SearchRequest::new(query)
                .with_method(method)
                .with_top_k(top_k),
        )
        .await
    }

    /// Registered methods in stable order.
    pub fn methods(&self) -> Vec<SearchMethod> {
        self.engines.keys().copied().collect()
    }

    pub fn default_method(&self) -> Option<SearchMethod> {
        self.default_method
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Tools of the last corpus every engine indexed successfully.
    pub fn tool_count(&self) -> usize {
        self.corpus.read().len()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.corpus.read().iter().map(|t| t.name.clone()).collect()
    }

    pub fn tools(&self) -> Arc<Vec<ToolDefinition>> {
        Arc::clone(&self.corpus.read())
    }

    /// False for unregistered methods.
    pub fn is_ready(&self, method: SearchMethod) -> bool {
        self.engines.get(&method).is_some_and(|e| e.is_ready())
    }

    pub fn readiness(&self) -> Vec<EngineStatus> {
        self.engines
            .iter()
            .map(|(method, engine)| EngineStatus {
                method: *method,
                ready: engine.is_ready(),
                tools: engine.tool_count(),
                generation: engine.generation(),
            })
            .collect()
    }
}
