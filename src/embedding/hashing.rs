//! Offline feature-hashing embedder.
//!
//! FNV-1a hashed unigrams and bigrams folded into a fixed-width vector and
//! L2-normalized. Deterministic and model-free, so the semantic ranker can run
//! without an embedding server. The `model` argument is ignored.

use crate::embedding::provider::EmbeddingProvider;
use crate::error::Result;
use async_trait::async_trait;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub struct HashingProvider {
    dims: usize,
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self { dims: 384 }
    }
}

impl HashingProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let tokens: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() > 1)
            .map(str::to_string)
            .collect();

        let mut embedding = vec![0.0f32; self.dims];
        for token in &tokens {
            self.accumulate(&mut embedding, token, 1.0);
        }
        for window in tokens.windows(2) {
            self.accumulate(&mut embedding, &format!("{} {}", window[0], window[1]), 0.5);
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }
        embedding
    }

    fn accumulate(&self, embedding: &mut [f32], feature: &str, weight: f32) {
        let hash = fnv1a(feature.as_bytes());
        let idx = (hash % self.dims as u64) as usize;
        // High bit picks the sign.
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        embedding[idx] += sign * weight;
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn embed(&self, _model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn test_embedding_is_normalized_and_deterministic() {
        let provider = HashingProvider::new(64);
        let a = provider.embed_text("Read a file from disk");
        let b = provider.embed_text("Read a file from disk");

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let provider = HashingProvider::new(16);
        assert!(provider.embed_text("").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_overlapping_text_is_closer() {
        let provider = HashingProvider::default();
        let query = provider.embed_text("read file contents");
        let near = provider.embed_text("read file contents from disk");
        let far = provider.embed_text("send slack message to channel");

        assert!(cosine_similarity(&query, &near) > cosine_similarity(&query, &far));
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let provider = HashingProvider::new(32);
        let texts = vec!["alpha beta".to_string(), "gamma delta".to_string()];
        let vectors = provider.embed("ignored", &texts).await.unwrap();

        assert_eq!(vectors[0], provider.embed_text("alpha beta"));
        assert_eq!(vectors[1], provider.embed_text("gamma delta"));
    }
}
