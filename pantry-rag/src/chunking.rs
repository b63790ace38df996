//! Sentence-respecting document chunking.
//!
//! This module provides the [`Chunker`] trait and [`SentenceChunker`], which
//! accumulates sentences into chunks of roughly `chunk_size` characters and
//! seeds every chunk after the first with trailing words of its predecessor.

/// Characters per word assumed when converting a character overlap into words.
pub const AVERAGE_WORD_CHARS: usize = 5;

/// A strategy for splitting document text into chunk texts.
///
/// Implementations never produce empty chunks. Embeddings and ids are
/// attached later by the engine.
pub trait Chunker: Send + Sync {
    /// Split `text` into an ordered sequence of chunks.
    ///
    /// Returns an empty `Vec` if the text has no content.
    fn chunk(&self, text: &str) -> Vec<String>;
}

/// Splits text on sentence boundaries with word-based overlap.
///
/// Sentences are delimited by `.`, `!` and `?`. A chunk is closed when the
/// next sentence would push it past `chunk_size` characters; a single long
/// sentence is never split. A chunk is therefore at most `chunk_size`
/// characters, or the carried-over words plus the sentence that opened it,
/// whichever is longer.
///
/// # Example
///
/// ```rust
/// use pantry_rag::{Chunker, SentenceChunker};
///
/// let chunker = SentenceChunker::new(40, 10);
/// let chunks = chunker.chunk("Rinse the rice. Soak it for an hour. Steam until tender.");
/// assert_eq!(chunks.len(), 2);
/// assert!(chunks[1].starts_with("an hour."));
/// ```
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SentenceChunker {
    /// Create a new `SentenceChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: soft upper bound on characters per chunk
    /// * `chunk_overlap`: approximate characters repeated from the previous chunk
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    /// Number of trailing words carried into the next chunk.
    pub fn overlap_words(&self) -> usize {
        self.chunk_overlap / AVERAGE_WORD_CHARS
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.chunk_size, self.chunk_overlap)
    }
}

/// Split `text` into sentence-aligned chunks of roughly `chunk_size` characters.
///
/// See [`SentenceChunker`] for the policy.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let overlap_words = chunk_overlap / AVERAGE_WORD_CHARS;
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0;

    for sentence in split_sentences(text) {
        let sentence_chars = sentence.chars().count();
        if buffer_chars + sentence_chars > chunk_size && !buffer.trim().is_empty() {
            let seed = trailing_words(&buffer, overlap_words);
            push_trimmed(&mut chunks, &buffer);
            buffer = seed;
            buffer_chars = buffer.chars().count();
        }
        buffer.push_str(sentence);
        buffer_chars += sentence_chars;
    }

    push_trimmed(&mut chunks, &buffer);
    chunks
}

/// Split text into sentence-like units, keeping terminators and leading whitespace.
///
/// A run of terminators (`?!`, `...`) stays with its sentence. Trailing text
/// without a terminator becomes the final unit, so text without any
/// punctuation is a single unit.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut in_terminators = false;

    for (i, c) in text.char_indices() {
        let is_terminator = matches!(c, '.' | '!' | '?');
        if in_terminators && !is_terminator {
            sentences.push(&text[start..i]);
            start = i;
        }
        in_terminators = is_terminator;
    }

    let rest = &text[start..];
    if !rest.trim().is_empty() {
        sentences.push(rest);
    }
    sentences
}

fn trailing_words(text: &str, count: usize) -> String {
    if count == 0 {
        return String::new();
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    words[words.len().saturating_sub(count)..].join(" ")
}

fn push_trimmed(chunks: &mut Vec<String>, buffer: &str) {
    let trimmed = buffer.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_input_yield_no_chunks() {
        assert!(chunk_text("", 100, 20).is_empty());
        assert!(chunk_text("   \n\t ", 100, 20).is_empty());
    }

    #[test]
    fn text_without_punctuation_is_one_chunk() {
        let text = "two cups flour one cup sugar a pinch of salt";
        assert_eq!(chunk_text(text, 10, 5), vec![text.to_string()]);
    }

    #[test]
    fn short_text_fits_in_one_chunk() {
        let chunks = chunk_text("Store eggs in the fridge. Keep bread dry.", 1000, 200);
        assert_eq!(chunks, vec!["Store eggs in the fridge. Keep bread dry.".to_string()]);
    }

    #[test]
    fn splits_keep_terminator_runs_and_trailing_fragment() {
        let sentences = split_sentences("Ready?! Yes... and then some");
        assert_eq!(sentences, vec!["Ready?!", " Yes...", " and then some"]);
    }

    #[test]
    fn next_chunk_is_seeded_with_trailing_words() {
        // overlap 10 chars -> 2 words carried over
        let text = "Milk keeps a week. Cheese keeps a month. Honey keeps for years.";
        let chunks = chunk_text(text, 30, 10);
        assert_eq!(
            chunks,
            vec![
                "Milk keeps a week.".to_string(),
                "a week. Cheese keeps a month.".to_string(),
                "a month. Honey keeps for years.".to_string(),
            ]
        );
    }

    #[test]
    fn overlap_below_one_word_disables_seeding() {
        let text = "Milk keeps a week. Cheese keeps a month.";
        let chunks = chunk_text(text, 20, 4);
        assert_eq!(
            chunks,
            vec!["Milk keeps a week.".to_string(), "Cheese keeps a month.".to_string()]
        );
    }

    #[test]
    fn long_sentence_is_not_split() {
        let long = "This single sentence is far longer than the configured chunk size.";
        let text = format!("Short one. {long} Tail.");
        let chunks = chunk_text(&text, 20, 0);
        assert_eq!(chunks, vec!["Short one.".to_string(), long.to_string(), "Tail.".to_string()]);
    }

    #[test]
    fn seed_and_opening_sentence_may_exceed_chunk_size() {
        let first = "Xxxxxxxxxxxxxxx yyyyyyyyyyyyyyy zzzzzzzzzzzzzzz.";
        let chunks = chunk_text(&format!("{first} Short."), 40, 15);
        assert_eq!(chunks, vec![first.to_string(), format!("{first} Short.")]);
        // three carried words (48 chars) plus " Short." (7 chars)
        assert_eq!(chunks[1].chars().count(), 55);
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 17 chars, 31 bytes
        let text = "ééééééé. ééééééé.";
        assert_eq!(chunk_text(text, 17, 0).len(), 1);
    }

    #[test]
    fn chunker_trait_uses_configured_policy() {
        let chunker = SentenceChunker::new(1000, 200);
        assert_eq!(chunker.overlap_words(), 40);
        assert_eq!(chunker.chunk("One. Two. Three."), vec!["One. Two. Three.".to_string()]);
    }
}
