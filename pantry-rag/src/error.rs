//! Error types for the `pantry-rag` crate.

use thiserror::Error;

/// Errors that can occur while building or querying the context index.
#[derive(Debug, Error)]
pub enum RagError {
    /// A build attempt failed. The index keeps whatever state it had before.
    #[error("Index build error: {message}")]
    IndexBuildError {
        /// A description of how far the build got and what failed.
        message: String,
        /// The underlying failure, if any.
        #[source]
        source: Option<Box<RagError>>,
    },

    /// A single embedding call failed.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Retrieval was attempted before any index became ready.
    #[error("Context index is not initialized")]
    NotInitializedError,

    /// Raw text could not be extracted from the document source.
    #[error("Document source error: {0}")]
    DocumentSourceError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The text-generation collaborator failed.
    #[error("Generation error: {0}")]
    GenerationError(String),
}

impl RagError {
    pub(crate) fn index_build(message: impl Into<String>, source: RagError) -> Self {
        Self::IndexBuildError { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Whether a caller can reasonably carry on without the failed operation.
    ///
    /// Per-query failures (embedding, not initialized) are recoverable; the
    /// caller may retry or proceed without grounding context.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EmbeddingError { .. } | Self::NotInitializedError)
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn build_error_exposes_cause() {
        let err = RagError::index_build(
            "embedding failed at chunk 2",
            RagError::EmbeddingError { provider: "mock".into(), message: "rate limited".into() },
        );
        assert_eq!(err.to_string(), "Index build error: embedding failed at chunk 2");
        let cause = err.source().map(ToString::to_string);
        assert_eq!(cause.as_deref(), Some("Embedding error (mock): rate limited"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn query_errors_are_recoverable() {
        assert!(RagError::NotInitializedError.is_recoverable());
        assert!(
            RagError::EmbeddingError { provider: "x".into(), message: "timeout".into() }
                .is_recoverable()
        );
        assert!(!RagError::ConfigError("bad".into()).is_recoverable());
    }
}
