//! Toolrank - ranking service for tool catalogs
//!
//! Indexes a corpus of tool definitions with interchangeable ranking backends
//! (BM25, embedding similarity, name heuristics) and routes queries to them.
//! The library exposes the engines and router for integration tests and for
//! embedding in other applications.

pub mod config;
pub mod embedding;
pub mod engines;
pub mod error;
pub mod handlers;
pub mod ingestion;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use config::{Config, SearchEngineConfig};
pub use embedding::{EmbeddingFormat, EmbeddingProvider};
pub use engines::{Bm25Ranker, PatternRanker, Ranker, SearchMethod, SemanticRanker};
pub use error::{AppError, Result};
pub use handlers::{health_handler, methods_handler, ready_handler, reload_handler, search_handler};
pub use ingestion::{atomize_tools, SearchResult, ToolDefinition};
pub use router::{SearchRequest, SearchResponse, SearchRouter};
pub use state::AppState;
