//! Document sources that supply the raw text to index.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// Supplies the raw text of the reference document.
///
/// Extraction from rich formats (PDF, HTML) belongs in an implementation of
/// this trait; the engine only ever sees plain text.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Produce the document text.
    async fn extract_text(&self) -> Result<String>;

    /// Human-readable description used in logs and errors.
    fn describe(&self) -> String;
}

/// Text that has already been extracted.
#[derive(Debug, Clone)]
pub struct TextSource {
    name: String,
    text: String,
}

impl TextSource {
    /// Wrap `text`, labelled `name` in logs.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into() }
    }
}

#[async_trait]
impl DocumentSource for TextSource {
    async fn extract_text(&self) -> Result<String> {
        Ok(self.text.clone())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// A UTF-8 plain-text file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Read from `path` when the index is built.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    async fn extract_text(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            RagError::DocumentSourceError(format!("failed to read '{}': {e}", self.path.display()))
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
