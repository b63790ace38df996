//! Embedding provider trait for generating vector embeddings from text.

use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap a specific embedding backend behind a unified async
/// interface. Every call is treated as a remote round-trip that may fail or
/// stall; the engine paces calls during a build and bounds each with a timeout.
///
/// # Example
///
/// ```rust,ignore
/// use pantry_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Short provider name used in errors and logs.
    fn name(&self) -> &str {
        "embedding"
    }
}

/// Check that `embedding` has the dimensionality `provider` advertises.
pub(crate) fn check_dimensions(provider: &dyn EmbeddingProvider, embedding: &[f32]) -> Result<()> {
    let expected = provider.dimensions();
    if embedding.len() != expected {
        return Err(RagError::EmbeddingError {
            provider: provider.name().to_string(),
            message: format!(
                "expected {expected}-dimensional embedding, got {}",
                embedding.len()
            ),
        });
    }
    Ok(())
}

/// A deterministic, offline embedder based on hashed word counts.
///
/// Each lowercase alphanumeric token is hashed into one of `dimensions`
/// buckets and the resulting count vector is L2-normalised, so texts sharing
/// vocabulary score higher under cosine similarity. Useful for development,
/// demos and tests where no embedding API is available.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// Create a provider producing vectors of length `dimensions`.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = Fnv1a::default();
        token.hash(&mut hasher);
        (hasher.finish() % self.dimensions as u64) as usize
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.dimensions == 0 {
            return Err(RagError::EmbeddingError {
                provider: self.name().to_string(),
                message: "dimensions must be greater than zero".into(),
            });
        }

        let mut embedding = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
        {
            embedding[self.bucket(&token)] += 1.0;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// FNV-1a, stable across processes unlike `DefaultHasher`.
struct Fnv1a(u64);

impl Default for Fnv1a {
    fn default() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }
}

impl Hasher for Fnv1a {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= u64::from(*byte);
            self.0 = self.0.wrapping_mul(0x0100_0000_01b3);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embeddings_are_normalised_and_deterministic() {
        let provider = HashEmbeddingProvider::new(32);
        let a = provider.embed("Fresh basil wilts in the fridge").await.unwrap();
        let b = provider.embed("fresh BASIL wilts in the fridge!").await.unwrap();
        assert_eq!(a.len(), 32);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn text_without_tokens_embeds_to_zero_vector() {
        let provider = HashEmbeddingProvider::new(8);
        let embedding = provider.embed("  ... !!").await.unwrap();
        assert!(embedding.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn dimension_check_names_the_provider() {
        let provider = HashEmbeddingProvider::new(4);
        let err = check_dimensions(&provider, &[1.0, 0.0]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Embedding error (hash): expected 4-dimensional embedding, got 2"
        );
        assert!(check_dimensions(&provider, &[0.0; 4]).is_ok());
    }
}
