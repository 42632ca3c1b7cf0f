//! Embedding provider seam.

use crate::error::{AppError, Result};
use async_trait::async_trait;

/// A batch text-to-vector service.
///
/// Implementations must preserve order: `vectors[i]` is the embedding of
/// `texts[i]`. Unavailability is reported as `AppError::ProviderUnavailable`,
/// never papered over with placeholder vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short identifier used in logs (e.g. `ollama`).
    fn name(&self) -> &str;

    async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_one(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(model, &[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(AppError::ProviderUnavailable(format!(
                "{} returned {} vectors for 1 text",
                self.name(),
                vectors.len()
            )));
        }
        Ok(vectors.swap_remove(0))
    }
}

/// Cosine similarity of two vectors.
///
/// Returns 0.0 when either vector has zero norm, and clamps to `[-1, 1]` to
/// absorb floating point drift. Callers are responsible for checking lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    #[async_trait]
    impl EmbeddingProvider for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn embed(&self, _model: &str, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0], vec![2.0]])
        }
    }

    #[test]
    fn test_self_similarity_is_one() {
        let v = [0.3f32, -1.2, 4.0, 0.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_norm_is_zero_not_nan() {
        let zero = [0.0f32; 3];
        assert_eq!(cosine_similarity(&zero, &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_opposite_vectors() {
        let sim = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]);
        assert!((sim + 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_embed_one_rejects_wrong_vector_count() {
        let err = Broken.embed_one("m", "text").await.unwrap_err();
        assert!(matches!(err, AppError::ProviderUnavailable(_)));
    }
}
