//! Configuration for the context engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Environment variable overriding [`RagConfig::chunk_size`].
pub const ENV_CHUNK_SIZE: &str = "PANTRY_RAG_CHUNK_SIZE";
/// Environment variable overriding [`RagConfig::chunk_overlap`].
pub const ENV_CHUNK_OVERLAP: &str = "PANTRY_RAG_CHUNK_OVERLAP";
/// Environment variable overriding [`RagConfig::top_k`].
pub const ENV_TOP_K: &str = "PANTRY_RAG_TOP_K";
/// Environment variable overriding [`RagConfig::embed_delay_ms`].
pub const ENV_EMBED_DELAY_MS: &str = "PANTRY_RAG_EMBED_DELAY_MS";
/// Environment variable overriding [`RagConfig::embed_timeout_ms`]. `0` disables the timeout.
pub const ENV_EMBED_TIMEOUT_MS: &str = "PANTRY_RAG_EMBED_TIMEOUT_MS";

/// Configuration parameters for indexing and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Soft upper bound on chunk size in characters.
    pub chunk_size: usize,
    /// Approximate number of characters carried over between consecutive chunks.
    pub chunk_overlap: usize,
    /// Default number of results returned for a query.
    pub top_k: usize,
    /// Delay inserted between consecutive embedding calls during a build.
    pub embed_delay_ms: u64,
    /// Upper bound on a single embedding call. `None` waits indefinitely.
    pub embed_timeout_ms: Option<u64>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
            embed_delay_ms: 100,
            embed_timeout_ms: Some(30_000),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Load the defaults overridden by `PANTRY_RAG_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a variable cannot be parsed or the
    /// resulting configuration is inconsistent.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(size) = parse_var::<usize, _>(&lookup, ENV_CHUNK_SIZE)? {
            builder = builder.chunk_size(size);
        }
        if let Some(overlap) = parse_var::<usize, _>(&lookup, ENV_CHUNK_OVERLAP)? {
            builder = builder.chunk_overlap(overlap);
        }
        if let Some(k) = parse_var::<usize, _>(&lookup, ENV_TOP_K)? {
            builder = builder.top_k(k);
        }
        if let Some(delay) = parse_var::<u64, _>(&lookup, ENV_EMBED_DELAY_MS)? {
            builder = builder.embed_delay_ms(delay);
        }
        if let Some(timeout) = parse_var::<u64, _>(&lookup, ENV_EMBED_TIMEOUT_MS)? {
            builder = builder.embed_timeout_ms((timeout > 0).then_some(timeout));
        }
        builder.build()
    }

    /// The pacing delay as a [`Duration`].
    pub fn embed_delay(&self) -> Duration {
        Duration::from_millis(self.embed_delay_ms)
    }

    /// The per-call embedding timeout as a [`Duration`], if any.
    pub fn embed_timeout(&self) -> Option<Duration> {
        self.embed_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e| RagError::ConfigError(format!("invalid value '{raw}' for {key}: {e}")))
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the soft upper bound on chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the default number of results returned for a query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the delay between consecutive embedding calls during a build.
    pub fn embed_delay_ms(mut self, delay: u64) -> Self {
        self.config.embed_delay_ms = delay;
        self
    }

    /// Set the per-call embedding timeout. `None` disables it.
    pub fn embed_timeout_ms(mut self, timeout: Option<u64>) -> Self {
        self.config.embed_timeout_ms = timeout;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        Ok(self.config)
    }
}
