pub mod format;
pub mod hashing;
pub mod ollama;
pub mod provider;

pub use format::{estimate_tokens, format_tool, EmbeddingFormat};
pub use hashing::HashingProvider;
pub use ollama::OllamaClient;
pub use provider::{cosine_similarity, EmbeddingProvider};
