//! Rendering retrieved chunks into a prompt-ready context block.

use crate::index::RetrievalResult;

/// Returned by [`format_context_for_prompt`] when there are no results.
pub const NO_RELEVANT_CONTEXT: &str = "No relevant context found in the reference document.";

/// Separator placed between rendered chunks.
pub const CHUNK_DELIMITER: &str = "\n\n---\n\n";

/// Render `results` as numbered blocks with their similarity scores.
///
/// ```rust
/// use pantry_rag::{RetrievalResult, format_context_for_prompt};
///
/// let block = format_context_for_prompt(&[RetrievalResult {
///     text: "Store onions away from potatoes.".into(),
///     similarity: 0.8123,
/// }]);
/// assert_eq!(block, "[Context 1] (relevance: 0.812)\nStore onions away from potatoes.");
/// ```
pub fn format_context_for_prompt(results: &[RetrievalResult]) -> String {
    if results.is_empty() {
        return NO_RELEVANT_CONTEXT.to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            format!("[Context {}] (relevance: {:.3})\n{}", i + 1, result.similarity, result.text)
        })
        .collect::<Vec<_>>()
        .join(CHUNK_DELIMITER)
}
