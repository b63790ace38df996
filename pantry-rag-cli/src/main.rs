//! Command-line driver for the pantry recipe context engine.
//!
//! # Commands
//!
//! ```bash
//! # Show how a reference document is chunked
//! pantry-rag chunk food-storage.txt
//!
//! # Index a document and print the grounding context for a query
//! pantry-rag query food-storage.txt "how long does rice keep" --top-k 3
//! ```
//!
//! Defaults come from the `PANTRY_RAG_*` environment variables; flags override them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pantry_rag::{
    ContextEngine, DocumentSource, EmbeddingProvider, FileSource, HashEmbeddingProvider,
    RagConfig, format_context_for_prompt,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pantry-rag")]
#[command(about = "Index a reference document and retrieve grounding context")]
#[command(version)]
struct Cli {
    /// Soft upper bound on chunk size in characters
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Approximate characters repeated between consecutive chunks
    #[arg(long, global = true)]
    chunk_overlap: Option<usize>,

    /// Delay between embedding calls while indexing, in milliseconds
    #[arg(long, global = true)]
    delay_ms: Option<u64>,

    /// Embedding backend
    #[arg(long, global = true, value_enum, default_value_t = Provider::Hash)]
    provider: Provider,

    /// Vector size for the hash provider (or truncation size for OpenAI)
    #[arg(long, global = true)]
    dimensions: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the chunks produced for a document
    Chunk {
        /// Plain-text document to chunk
        input: PathBuf,
    },

    /// Index a document and print the context retrieved for a query
    Query {
        /// Plain-text document to index
        input: PathBuf,

        /// Query to retrieve context for
        query: String,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print raw results as JSON instead of the prompt block
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Provider {
    /// Offline hashed bag-of-words embeddings
    Hash,
    /// OpenAI embeddings API (needs the `openai` feature and `OPENAI_API_KEY`)
    Openai,
}

impl Cli {
    fn config(&self) -> Result<RagConfig> {
        let base = RagConfig::from_env().context("invalid PANTRY_RAG_* environment")?;
        let config = RagConfig::builder()
            .chunk_size(self.chunk_size.unwrap_or(base.chunk_size))
            .chunk_overlap(self.chunk_overlap.unwrap_or(base.chunk_overlap))
            .top_k(base.top_k)
            .embed_delay_ms(self.delay_ms.unwrap_or(base.embed_delay_ms))
            .embed_timeout_ms(base.embed_timeout_ms)
            .build()?;
        Ok(config)
    }

    fn embedding_provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self.provider {
            Provider::Hash => {
                let provider = self
                    .dimensions
                    .map(HashEmbeddingProvider::new)
                    .unwrap_or_default();
                Ok(Arc::new(provider))
            }
            Provider::Openai => openai_provider(self.dimensions),
        }
    }
}

#[cfg(feature = "openai")]
fn openai_provider(dimensions: Option<usize>) -> Result<Arc<dyn EmbeddingProvider>> {
    let mut provider = pantry_rag::openai::OpenAIEmbeddingProvider::from_env()?;
    if let Some(dims) = dimensions {
        provider = provider.with_dimensions(dims);
    }
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "openai"))]
fn openai_provider(_dimensions: Option<usize>) -> Result<Arc<dyn EmbeddingProvider>> {
    anyhow::bail!("the openai provider requires building with `--features openai`")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config()?;

    match &cli.command {
        Command::Chunk { input } => {
            let text = FileSource::new(input).extract_text().await?;
            let chunks = pantry_rag::chunk_text(&text, config.chunk_size, config.chunk_overlap);
            info!(chunk_count = chunks.len(), "chunked document");
            for (i, chunk) in chunks.iter().enumerate() {
                println!("--- chunk {i} ({} chars) ---", chunk.chars().count());
                println!("{chunk}");
            }
        }
        Command::Query { input, query, top_k, json } => {
            let top_k = top_k.unwrap_or(config.top_k);
            let engine = ContextEngine::builder()
                .config(config)
                .embedding_provider(cli.embedding_provider()?)
                .build()?;

            engine.initialize(&FileSource::new(input)).await?;
            let results = engine.get_context(query, top_k).await?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!("{}", format_context_for_prompt(&results));
            }
        }
    }

    Ok(())
}
