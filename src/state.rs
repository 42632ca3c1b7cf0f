use crate::config::{Config, ProviderKind};
use crate::embedding::{EmbeddingProvider, HashingProvider, OllamaClient};
use crate::engines::{Bm25Ranker, PatternRanker, Ranker, SearchMethod, SemanticRanker};
use crate::error::Result;
use crate::ingestion::load_tools_file;
use crate::router::SearchRouter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Application state shared across all request handlers.
pub struct AppState {
    pub router: Arc<SearchRouter>,
    /// Set once the startup corpus is indexed and warmed up.
    pub ready: AtomicBool,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build the router from `config`, index the startup corpus and warm up
    /// every registered method.
    pub async fn new(config: Config) -> Result<Self> {
        let router = build_router(&config)?;

        let tools = match &config.tools_path {
            Some(path) => load_tools_file(path)?,
            None => {
                tracing::warn!("TOOLS_PATH not set, starting with an empty corpus");
                Vec::new()
            }
        };

        router.initialize(tools, &config.engine).await?;

        let state = Self {
            router: Arc::new(router),
            ready: AtomicBool::new(false),
            config: Arc::new(config),
        };

        state.warmup().await;
        state.ready.store(true, Ordering::SeqCst);

        Ok(state)
    }

    /// Wrap an already initialized router, for tests and embedding.
    pub fn from_router(router: SearchRouter, config: Config) -> Self {
        Self {
            router: Arc::new(router),
            ready: AtomicBool::new(true),
            config: Arc::new(config),
        }
    }

    /// Run one query per method so the first real request does not pay for
    /// cold connections. Failures are logged, not fatal.
    async fn warmup(&self) {
        if self.router.tool_count() == 0 {
            return;
        }

        for method in self.router.methods() {
            match self.router.search_with(method, "warmup query", 1).await {
                Ok(_) => tracing::debug!(%method, "Warmup search completed"),
                Err(e) => tracing::warn!(%method, error = %e, "Warmup search failed"),
            }
        }
    }

    /// Startup finished and every registered ranker has a published index
    /// with no reload in flight.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
            && self
                .router
                .methods()
                .into_iter()
                .all(|method| self.router.is_ready(method))
    }
}

/// Embedding provider selected by `EMBEDDING_PROVIDER`.
pub fn build_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.embedding_provider {
        ProviderKind::Ollama => Arc::new(OllamaClient::new(
            config.ollama_url.clone(),
            config.provider_timeout,
        )?),
        ProviderKind::Hashing => Arc::new(HashingProvider::new(config.embedding_dims)),
    };
    Ok(provider)
}

/// Register one ranker per configured method. The provider is only built
/// when the semantic method is enabled.
pub fn build_router(config: &Config) -> Result<SearchRouter> {
    let mut router = SearchRouter::new()
        .with_default_top_k(config.default_top_k)
        .with_default_timeout(config.search_timeout);

    for method in &config.methods {
        let ranker: Arc<dyn Ranker> = match method {
            SearchMethod::Bm25 => Arc::new(Bm25Ranker::default()),
            SearchMethod::Semantic => Arc::new(SemanticRanker::new(build_provider(config)?)),
            SearchMethod::Pattern => Arc::new(PatternRanker::new()),
        };
        router.register_engine(ranker);
    }

    router.set_default_method(config.default_method)?;
    tracing::info!(
        methods = ?router.methods(),
        default = %config.default_method,
        "Search router configured"
    );
    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_state_without_catalog_is_ready_and_empty() {
        let state = AppState::new(Config::default()).await.unwrap();

        assert!(state.is_ready());
        assert_eq!(state.router.tool_count(), 0);
        assert_eq!(state.router.methods(), SearchMethod::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_state_loads_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"tools":[{{"name":"read_file","description":"Read a file"}},{{"name":"list_directory","description":"List entries"}}]}}"#
        )
        .unwrap();

        let config = Config {
            tools_path: Some(file.path().to_path_buf()),
            methods: vec![SearchMethod::Pattern, SearchMethod::Bm25],
            default_method: SearchMethod::Bm25,
            ..Config::default()
        };
        let state = AppState::new(config).await.unwrap();

        assert_eq!(state.router.tool_count(), 2);
        assert_eq!(state.router.default_method(), Some(SearchMethod::Bm25));
        assert!(!state.router.is_ready(SearchMethod::Semantic));
    }

    #[test]
    fn test_default_method_must_be_registered() {
        let config = Config {
            methods: vec![SearchMethod::Pattern],
            default_method: SearchMethod::Semantic,
            ..Config::default()
        };
        assert!(build_router(&config).is_err());
    }
}
