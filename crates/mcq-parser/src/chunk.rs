//! Word-window chunking
//!
//! Long documents are split into windows of `chunk_size` words. Each window
//! starts `chunk_size - overlap` words after the previous one, so consecutive
//! chunks share `overlap` words. The last window may be shorter.

use mcq_core::{McqError, Result};
use serde::{Deserialize, Serialize};

/// A window of words taken from the source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk index within the document
    pub index: usize,

    /// Chunk text (words joined by single spaces)
    pub text: String,

    /// Offset of the first word in the source word sequence
    pub start: usize,

    /// Number of words in this chunk
    pub word_count: usize,

    /// Leading words shared with the predecessor
    pub overlap: usize,
}

impl Chunk {
    /// Offset one past the last word
    pub fn end(&self) -> usize {
        self.start + self.word_count
    }

    /// Words contributed by this chunk and not by its predecessor
    pub fn fresh_words(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace().skip(self.overlap)
    }
}

/// Split text into overlapping word windows
///
/// Text of at most `chunk_size` words comes back untouched as a single
/// chunk. Fails with `InvalidConfiguration` when the window would not
/// advance (`overlap >= chunk_size`).
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(McqError::InvalidConfiguration(format!(
            "overlap ({overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }

    let words: Vec<&str> = text.split_whitespace().collect();

    if words.len() <= chunk_size {
        return Ok(vec![Chunk {
            index: 0,
            text: text.to_string(),
            start: 0,
            word_count: words.len(),
            overlap: 0,
        }]);
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut covered = 0usize;

    while start < words.len() {
        let end = (start + chunk_size).min(words.len());
        let word_count = end - start;

        chunks.push(Chunk {
            index: chunks.len(),
            text: words[start..end].join(" "),
            start,
            word_count,
            overlap: covered.saturating_sub(start).min(word_count),
        });

        covered = covered.max(end);
        start += step;
    }

    Ok(chunks)
}

/// Rebuild the word sequence from chunks by dropping shared prefixes
pub fn reconstruct_words(chunks: &[Chunk]) -> Vec<String> {
    chunks
        .iter()
        .flat_map(|c| c.fresh_words().map(str::to_string))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
