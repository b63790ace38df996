//! Chunk records and the immutable, exactly-searched index snapshot.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// One segment of the reference document with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Sequence number assigned at build time.
    pub id: usize,
    /// The chunk text. Never empty.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
}

/// A retrieved chunk paired with its cosine similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    /// The chunk text.
    pub text: String,
    /// Raw cosine similarity, in `-1.0..=1.0`.
    pub similarity: f32,
}

/// An ordered, read-only collection of [`Chunk`]s sharing one dimensionality.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    chunks: Vec<Chunk>,
    dimensions: usize,
}

impl Index {
    /// Build an index, checking the chunk invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexBuildError`] if a chunk has empty text, an
    /// embedding of the wrong length, or an id not greater than its predecessor's.
    pub fn new(chunks: Vec<Chunk>, dimensions: usize) -> Result<Self> {
        let invalid = |message: String| RagError::IndexBuildError { message, source: None };

        let mut previous_id = None;
        for chunk in &chunks {
            if chunk.text.trim().is_empty() {
                return Err(invalid(format!("chunk {} has empty text", chunk.id)));
            }
            if chunk.embedding.len() != dimensions {
                return Err(invalid(format!(
                    "chunk {} has {} dimensions, index expects {dimensions}",
                    chunk.id,
                    chunk.embedding.len()
                )));
            }
            if previous_id.is_some_and(|prev| chunk.id <= prev) {
                return Err(invalid(format!("chunk id {} is out of order", chunk.id)));
            }
            previous_id = Some(chunk.id);
        }

        Ok(Self { chunks, dimensions })
    }

    /// The indexed chunks in id order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimensionality shared by every chunk.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Rank every chunk against `query` and return the best `top_k`.
    ///
    /// Exact linear scan. Results are ordered by descending similarity, ties
    /// broken by ascending chunk id.
    pub fn rank(&self, query: &[f32], top_k: usize) -> Vec<RetrievalResult> {
        if top_k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(&Chunk, f32)> = self
            .chunks
            .iter()
            .map(|chunk| (chunk, cosine_similarity(&chunk.embedding, query)))
            .collect();

        scored.sort_by(|(a, score_a), (b, score_b)| {
            score_b.partial_cmp(score_a).unwrap_or(Ordering::Equal).then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(chunk, similarity)| RetrievalResult { text: chunk.text.clone(), similarity })
            .collect()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the result is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() { similarity } else { 0.0 }
}
