//! Retrieval-augmented context engine for pantry recipe suggestions.
//!
//! This crate indexes one reference document in memory and retrieves the
//! passages most relevant to a query, to ground generated recipes:
//!
//! - [`SentenceChunker`]: sentence-respecting chunking with word overlap
//! - [`ContextEngine`]: paced, serialized index builds and exact cosine retrieval
//! - [`format_context_for_prompt`]: numbered, scored context blocks for prompts
//! - [`RecipeAssistant`]: grounded generation that degrades to ungrounded on failure
//!
//! Enable the `openai` feature for [`openai::OpenAIEmbeddingProvider`].

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod format;
pub mod index;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pacing;
pub mod recipe;
pub mod source;

pub use chunking::{Chunker, SentenceChunker, chunk_text};
pub use config::RagConfig;
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider};
pub use engine::{ContextEngine, ContextEngineBuilder, IndexStatus, IndexSummary};
pub use error::{RagError, Result};
pub use format::{NO_RELEVANT_CONTEXT, format_context_for_prompt};
pub use index::{Chunk, Index, RetrievalResult, cosine_similarity};
pub use pacing::{FixedDelay, NoDelay, Pacer};
pub use recipe::{PantryItem, RecipeAssistant, TextGenerator, build_recipe_prompt};
pub use source::{DocumentSource, FileSource, TextSource};
