use crate::embedding::EmbeddingFormat;
use crate::engines::SearchMethod;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default embedding model requested from the provider.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// BM25 tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term-frequency saturation
    pub k1: f64,
    /// Document length normalization, 0.0 (none) to 1.0 (full)
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// Partial BM25 override; unset fields keep the ranker's current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bm25Overrides {
    #[serde(default)]
    pub k1: Option<f64>,
    #[serde(default)]
    pub b: Option<f64>,
}

impl Bm25Params {
    pub fn apply(&mut self, overrides: &Bm25Overrides) {
        if let Some(k1) = overrides.k1 {
            self.k1 = k1;
        }
        if let Some(b) = overrides.b {
            self.b = b;
        }
    }
}

/// Per-call ranker configuration passed to `initialize`/`reload`.
///
/// Every field is optional. A ranker applies only the fields that are set and
/// keeps its prior value for the rest, so a reload with an empty config never
/// resets a previously chosen model or format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchEngineConfig {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub format: Option<EmbeddingFormat>,
    #[serde(default)]
    pub bm25: Option<Bm25Overrides>,
}

impl SearchEngineConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_format(mut self, format: EmbeddingFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_bm25(mut self, k1: f64, b: f64) -> Self {
        self.bm25 = Some(Bm25Overrides {
            k1: Some(k1),
            b: Some(b),
        });
        self
    }
}

/// Which embedding provider backs the semantic ranker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Ollama-compatible HTTP server.
    Ollama,
    /// Offline feature-hashing embedder, no model server required.
    Hashing,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" | "http" => Ok(Self::Ollama),
            "hashing" | "hash" | "offline" => Ok(Self::Hashing),
            other => Err(format!("unknown embedding provider '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match env::var("LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    /// Optional path to a tool catalog JSON file loaded at startup.
    pub tools_path: Option<PathBuf>,
    /// Rankers registered with the router, in registration order.
    pub methods: Vec<SearchMethod>,
    pub default_method: SearchMethod,
    pub default_top_k: usize,
    /// Upper bound accepted on `top_k` per request.
    pub max_top_k: usize,
    /// Deadline applied to each search when the request sets none.
    pub search_timeout: Option<Duration>,
    pub embedding_provider: ProviderKind,
    pub ollama_url: String,
    /// Timeout for a single provider HTTP call.
    pub provider_timeout: Duration,
    /// Vector width of the hashing provider.
    pub embedding_dims: usize,
    /// Initial ranker configuration (model, format, BM25 parameters).
    pub engine: SearchEngineConfig,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let methods = parse_methods(
            &env::var("SEARCH_METHODS").unwrap_or_else(|_| "bm25,semantic,pattern".to_string()),
        )?;

        let default_method: SearchMethod = env::var("DEFAULT_METHOD")
            .unwrap_or_else(|_| "bm25".to_string())
            .parse()
            .map_err(anyhow::Error::msg)?;

        // 0 disables the deadline, same as `timeout_ms: 0` on a request.
        let search_timeout_ms: u64 = env::var("SEARCH_TIMEOUT_MS")
            .unwrap_or_else(|_| "0".to_string())
            .parse()?;

        let format = match env::var("EMBEDDING_FORMAT") {
            Ok(raw) => Some(raw.parse::<EmbeddingFormat>().map_err(anyhow::Error::msg)?),
            Err(_) => None,
        };

        let bm25 = Bm25Overrides {
            k1: env::var("BM25_K1").ok().map(|s| s.parse()).transpose()?,
            b: env::var("BM25_B").ok().map(|s| s.parse()).transpose()?,
        };

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            shutdown_timeout_secs: env::var("SHUTDOWN_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            tools_path: env::var("TOOLS_PATH").ok().map(PathBuf::from),
            methods,
            default_method,
            default_top_k: env::var("DEFAULT_TOP_K")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            max_top_k: env::var("MAX_TOP_K")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,
            search_timeout: (search_timeout_ms > 0).then(|| Duration::from_millis(search_timeout_ms)),
            embedding_provider: env::var("EMBEDDING_PROVIDER")
                .unwrap_or_else(|_| "ollama".to_string())
                .parse()
                .map_err(anyhow::Error::msg)?,
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            provider_timeout: Duration::from_secs(
                env::var("PROVIDER_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
            ),
            embedding_dims: env::var("EMBEDDING_DIMS")
                .unwrap_or_else(|_| "384".to_string())
                .parse()?,
            engine: SearchEngineConfig {
                model: Some(
                    env::var("EMBEDDING_MODEL")
                        .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
                ),
                format,
                bm25: (bm25 != Bm25Overrides::default()).then_some(bm25),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks that single-variable parsing cannot catch.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_top_k == 0 {
            anyhow::bail!("MAX_TOP_K must be at least 1");
        }
        if self.default_top_k == 0 || self.default_top_k > self.max_top_k {
            anyhow::bail!(
                "DEFAULT_TOP_K must be within 1..={}, got {}",
                self.max_top_k,
                self.default_top_k
            );
        }
        if !self.methods.contains(&self.default_method) {
            anyhow::bail!(
                "DEFAULT_METHOD '{}' is not listed in SEARCH_METHODS",
                self.default_method
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_secs: 30,
            tools_path: None,
            methods: SearchMethod::ALL.to_vec(),
            default_method: SearchMethod::Bm25,
            default_top_k: 5,
            max_top_k: 100,
            search_timeout: None,
            embedding_provider: ProviderKind::Hashing,
            ollama_url: "http://localhost:11434".to_string(),
            provider_timeout: Duration::from_secs(30),
            embedding_dims: 384,
            engine: SearchEngineConfig::default(),
        }
    }
}

/// Parse a comma-separated method list, ignoring blanks and repeats.
pub fn parse_methods(raw: &str) -> anyhow::Result<Vec<SearchMethod>> {
    let mut methods = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let method: SearchMethod = part.parse().map_err(anyhow::Error::msg)?;
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    if methods.is_empty() {
        anyhow::bail!("SEARCH_METHODS must name at least one method");
    }
    Ok(methods)
}
