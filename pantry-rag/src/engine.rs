//! The context engine: index lifecycle and retrieval.
//!
//! [`ContextEngine`] owns the in-memory index. It is built once per process
//! and shared by handle (`Arc<ContextEngine>`); the index is only reachable
//! through [`initialize`](ContextEngine::initialize) and the retrieval methods.
//!
//! # Example
//!
//! ```rust,ignore
//! use pantry_rag::{ContextEngine, FileSource, HashEmbeddingProvider, RagConfig};
//!
//! let engine = ContextEngine::builder()
//!     .config(RagConfig::from_env()?)
//!     .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
//!     .build()?;
//!
//! engine.initialize(&FileSource::new("food-storage.txt")).await?;
//! let results = engine.get_context("how long does rice keep", 3).await?;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::chunking::{Chunker, SentenceChunker};
use crate::config::RagConfig;
use crate::embedding::{EmbeddingProvider, check_dimensions};
use crate::error::{RagError, Result};
use crate::index::{Chunk, Index, RetrievalResult};
use crate::pacing::{FixedDelay, Pacer};
use crate::source::DocumentSource;

/// Lifecycle state of the engine's index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum IndexStatus {
    /// No build has been attempted.
    Uninitialized,
    /// A build is running.
    Initializing,
    /// An index is available for queries.
    Ready,
    /// The last build failed and no earlier index exists.
    Failed(String),
}

/// Outcome of a successful build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSummary {
    /// Description of the indexed document.
    pub source: String,
    /// Number of chunks indexed.
    pub chunk_count: usize,
    /// Embedding dimensionality.
    pub dimensions: usize,
    /// Wall-clock build time, including pacing delays.
    pub elapsed: Duration,
}

struct EngineState {
    index: Option<Arc<Index>>,
    status: IndexStatus,
}

/// Builds, holds and queries the in-memory context index.
///
/// Builds are serialized; queries read an immutable `Arc<Index>` snapshot and
/// never observe a partially built index.
pub struct ContextEngine {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn Chunker>,
    pacer: Arc<dyn Pacer>,
    state: RwLock<EngineState>,
    build_lock: Mutex<()>,
    next_chunk_id: AtomicUsize,
}

impl ContextEngine {
    /// Create a new [`ContextEngineBuilder`].
    pub fn builder() -> ContextEngineBuilder {
        ContextEngineBuilder::default()
    }

    /// Return a reference to the engine configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn status(&self) -> IndexStatus {
        self.read_state().status.clone()
    }

    /// Whether queries can be answered.
    ///
    /// Stays `true` while a rebuild of an existing index is running.
    pub fn is_ready(&self) -> bool {
        self.read_state().index.is_some()
    }

    /// Number of chunks in the current index, if one is ready.
    pub fn chunk_count(&self) -> Option<usize> {
        self.snapshot().map(|index| index.len())
    }

    /// The current index snapshot, if one is ready.
    pub fn snapshot(&self) -> Option<Arc<Index>> {
        self.read_state().index.clone()
    }

    /// Build the index from `source`, replacing any existing index.
    ///
    /// Chunks are embedded one at a time, in order, with the configured
    /// [`Pacer`] awaited between calls. Concurrent calls run one after another.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexBuildError`] if text extraction or any
    /// embedding call fails, or the document yields no chunks. The engine then
    /// keeps serving the previous index if there was one, and reports
    /// [`IndexStatus::Failed`] otherwise.
    pub async fn initialize(&self, source: &dyn DocumentSource) -> Result<IndexSummary> {
        let _build = self.build_lock.lock().await;
        let started = Instant::now();
        let mut restore = RestoreOnDrop::new(self, IndexStatus::Initializing);

        let result = self.build_index(source).await;
        restore.disarm();

        match result {
            Ok(index) => {
                let summary = IndexSummary {
                    source: source.describe(),
                    chunk_count: index.len(),
                    dimensions: index.dimensions(),
                    elapsed: started.elapsed(),
                };
                let mut state = self.write_state();
                state.index = Some(Arc::new(index));
                state.status = IndexStatus::Ready;
                drop(state);

                info!(
                    source = %summary.source,
                    chunk_count = summary.chunk_count,
                    dimensions = summary.dimensions,
                    elapsed = ?summary.elapsed,
                    "context index ready"
                );
                Ok(summary)
            }
            Err(e) => {
                let mut state = self.write_state();
                if state.index.is_some() {
                    warn!(error = %e, "index rebuild failed, keeping previous index");
                    state.status = IndexStatus::Ready;
                } else {
                    state.status = IndexStatus::Failed(e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Rank indexed chunks by cosine similarity to `query`.
    ///
    /// Returns at most `top_k` results, most similar first. `top_k == 0`
    /// returns an empty `Vec` without calling the embedding provider.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotInitializedError`] if no index is ready, or
    /// [`RagError::EmbeddingError`] if embedding the query fails. Neither
    /// affects the index.
    pub async fn retrieve_relevant(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        let index = self.snapshot().ok_or(RagError::NotInitializedError)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embed(query).await.map_err(|e| {
            warn!(error = %e, "query embedding failed");
            e
        })?;

        let results = index.rank(&query_embedding, top_k);
        debug!(top_k, result_count = results.len(), "retrieved context");
        Ok(results)
    }

    /// Retrieve grounding context for `query`. Same contract as
    /// [`retrieve_relevant`](Self::retrieve_relevant).
    pub async fn get_context(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        self.retrieve_relevant(query, top_k).await
    }

    async fn build_index(&self, source: &dyn DocumentSource) -> Result<Index> {
        let description = source.describe();
        let text = source.extract_text().await.map_err(|e| {
            error!(source = %description, error = %e, "failed to read document");
            RagError::index_build(format!("failed to extract text from '{description}'"), e)
        })?;

        let texts = self.chunker.chunk(&text);
        if texts.is_empty() {
            error!(source = %description, "document contains no indexable text");
            return Err(RagError::IndexBuildError {
                message: format!("'{description}' contains no indexable text"),
                source: None,
            });
        }

        let total = texts.len();
        let dimensions = self.embedding_provider.dimensions();
        let first_id = self.next_chunk_id.fetch_add(total, Ordering::SeqCst);
        info!(source = %description, chunk_count = total, dimensions, "building context index");

        let mut chunks = Vec::with_capacity(total);
        for (position, text) in texts.into_iter().enumerate() {
            let id = first_id + position;
            if position > 0 {
                self.pacer.pause(id).await;
            }

            let embedding = self.embed(&text).await.map_err(|e| {
                error!(chunk_id = id, completed = position, total, error = %e, "embedding failed");
                RagError::index_build(
                    format!("embedding failed for chunk {id} after {position} of {total} chunks"),
                    e,
                )
            })?;
            debug!(chunk_id = id, completed = position + 1, total, "embedded chunk");
            chunks.push(Chunk { id, text, embedding });
        }

        Index::new(chunks, dimensions)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let provider = self.embedding_provider.as_ref();
        let embedding = match self.config.embed_timeout() {
            Some(limit) => tokio::time::timeout(limit, provider.embed(text)).await.map_err(
                |_| RagError::EmbeddingError {
                    provider: provider.name().to_string(),
                    message: format!("timed out after {}ms", limit.as_millis()),
                },
            )??,
            None => provider.embed(text).await?,
        };
        check_dimensions(provider, &embedding)?;
        Ok(embedding)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sets a status for the duration of a build and puts the previous one back
/// if the build future is dropped before finishing.
struct RestoreOnDrop<'a> {
    engine: &'a ContextEngine,
    previous: Option<IndexStatus>,
}

impl<'a> RestoreOnDrop<'a> {
    fn new(engine: &'a ContextEngine, status: IndexStatus) -> Self {
        let previous = std::mem::replace(&mut engine.write_state().status, status);
        Self { engine, previous: Some(previous) }
    }

    fn disarm(&mut self) {
        self.previous = None;
    }
}

impl Drop for RestoreOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            warn!("index build cancelled, restoring previous status");
            self.engine.write_state().status = previous;
        }
    }
}

/// Builder for constructing a [`ContextEngine`].
///
/// Only the embedding provider is required. The chunker and pacer default to
/// a [`SentenceChunker`] and a [`FixedDelay`] derived from the config.
///
/// # Example
///
/// ```rust,ignore
/// let engine = ContextEngine::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .pacer(Arc::new(NoDelay))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct ContextEngineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
    pacer: Option<Arc<dyn Pacer>>,
}

impl ContextEngineBuilder {
    /// Set the engine configuration. Defaults to [`RagConfig::default`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Override the chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the pacing strategy used between embedding calls.
    pub fn pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    /// Build the [`ContextEngine`] in the [`IndexStatus::Uninitialized`] state.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if no embedding provider is set.
    pub fn build(self) -> Result<ContextEngine> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(SentenceChunker::new(config.chunk_size, config.chunk_overlap))
        });
        let pacer = self.pacer.unwrap_or_else(|| Arc::new(FixedDelay::new(config.embed_delay())));

        Ok(ContextEngine {
            config,
            embedding_provider,
            chunker,
            pacer,
            state: RwLock::new(EngineState { index: None, status: IndexStatus::Uninitialized }),
            build_lock: Mutex::new(()),
            next_chunk_id: AtomicUsize::new(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::embedding::HashEmbeddingProvider;
    use crate::pacing::NoDelay;
    use crate::source::TextSource;

    /// Stalls forever on any text containing "stall".
    struct StallingProvider;

    #[async_trait]
    impl EmbeddingProvider for StallingProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("stall") {
                std::future::pending::<()>().await;
            }
            Ok(vec![1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn engine_with(provider: Arc<dyn EmbeddingProvider>, timeout_ms: Option<u64>) -> ContextEngine {
        let config = RagConfig::builder()
            .chunk_size(20)
            .chunk_overlap(0)
            .embed_timeout_ms(timeout_ms)
            .build()
            .unwrap();
        ContextEngine::builder()
            .config(config)
            .embedding_provider(provider)
            .pacer(Arc::new(NoDelay))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_embedding_provider() {
        assert!(matches!(ContextEngine::builder().build(), Err(RagError::ConfigError(_))));
    }

    #[tokio::test]
    async fn new_engine_is_uninitialized() {
        let engine = engine_with(Arc::new(HashEmbeddingProvider::new(8)), None);
        assert_eq!(engine.status(), IndexStatus::Uninitialized);
        assert!(!engine.is_ready());
        assert_eq!(engine.chunk_count(), None);
        assert!(matches!(
            engine.get_context("anything", 3).await,
            Err(RagError::NotInitializedError)
        ));
    }

    #[tokio::test]
    async fn blank_document_fails_first_build() {
        let engine = engine_with(Arc::new(HashEmbeddingProvider::new(8)), None);
        let err = engine.initialize(&TextSource::new("blank", "   ")).await.unwrap_err();
        assert!(matches!(err, RagError::IndexBuildError { .. }));
        assert!(matches!(engine.status(), IndexStatus::Failed(_)));
        assert!(!engine.is_ready());
    }

    #[tokio::test]
    async fn chunk_ids_are_never_reused_across_rebuilds() {
        let engine = engine_with(Arc::new(HashEmbeddingProvider::new(8)), None);
        let source = TextSource::new("doc", "Rice keeps a year. Oats keep six months.");

        engine.initialize(&source).await.unwrap();
        let first: Vec<usize> = engine.snapshot().unwrap().chunks().iter().map(|c| c.id).collect();
        engine.initialize(&source).await.unwrap();
        let second: Vec<usize> =
            engine.snapshot().unwrap().chunks().iter().map(|c| c.id).collect();

        assert_eq!(first, vec![0, 1]);
        assert_eq!(second, vec![2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn query_timeout_fails_only_that_query() {
        let engine = engine_with(Arc::new(StallingProvider), Some(50));
        let source = TextSource::new("doc", "Flour is dry goods. Sugar is sweet.");
        engine.initialize(&source).await.unwrap();

        let err = engine.get_context("stall please", 2).await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "unexpected error: {err}");
        assert!(engine.is_ready());
        assert_eq!(engine.get_context("flour", 2).await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_build_restores_previous_status() {
        let engine = engine_with(Arc::new(StallingProvider), None);
        let source = TextSource::new("doc", "Good sentence. Then stall here.");

        let cancelled =
            tokio::time::timeout(Duration::from_millis(10), engine.initialize(&source)).await;
        assert!(cancelled.is_err());
        assert_eq!(engine.status(), IndexStatus::Uninitialized);
        assert!(!engine.is_ready());
    }

    #[tokio::test]
    async fn wrong_dimensionality_aborts_build() {
        struct Lying;

        #[async_trait]
        impl EmbeddingProvider for Lying {
            async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                Ok(vec![1.0])
            }

            fn dimensions(&self) -> usize {
                3
            }
        }

        let engine = engine_with(Arc::new(Lying), None);
        let err = engine.initialize(&TextSource::new("doc", "One.")).await.unwrap_err();
        assert!(err.to_string().contains("chunk 0"), "unexpected error: {err}");
    }
}
