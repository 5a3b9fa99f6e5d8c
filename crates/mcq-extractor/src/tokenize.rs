//! Sentence and word segmentation
//!
//! Built on Unicode text segmentation (UAX #29). Word tokens keep their byte
//! offset into the source so spans can be recovered verbatim.

use unicode_segmentation::UnicodeSegmentation;

/// A word token borrowed from the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    /// Byte offset in the source
    pub start: usize,
}

impl<'a> Token<'a> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    /// Starts with an uppercase letter
    pub fn is_capitalized(&self) -> bool {
        self.text.chars().next().is_some_and(char::is_uppercase)
    }

    pub fn is_numeric(&self) -> bool {
        self.text
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    }
}

/// Split text into trimmed sentences with their byte offsets
pub fn sentences(text: &str) -> Vec<(usize, &str)> {
    text.split_sentence_bound_indices()
        .filter_map(|(idx, s)| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            let lead = s.len() - s.trim_start().len();
            Some((idx + lead, trimmed))
        })
        .collect()
}

/// Word tokens; punctuation and whitespace segments are dropped
pub fn words(text: &str) -> Vec<Token<'_>> {
    text.split_word_bound_indices()
        .filter(|(_, w)| w.chars().any(char::is_alphanumeric))
        .map(|(start, text)| Token { text, start })
        .collect()
}

/// Conservative suffix-stripping stemmer used for topic grouping
pub fn light_stem(word: &str) -> String {
    let w = word.to_lowercase();
    let len = w.chars().count();

    let strip = |suffix: &str, replacement: &str, min_stem: usize| -> Option<String> {
        let stem = w.strip_suffix(suffix)?;
        (stem.chars().count() >= min_stem).then(|| format!("{stem}{replacement}"))
    };

    if len <= 3 {
        return w;
    }

    strip("ies", "y", 2)
        .or_else(|| strip("sses", "ss", 2))
        .or_else(|| strip("ing", "", 3))
        .or_else(|| strip("edly", "", 3))
        .or_else(|| strip("ed", "", 3))
        .or_else(|| strip("ly", "", 3))
        .or_else(|| {
            if w.ends_with("ss") || w.ends_with("us") || w.ends_with("is") {
                None
            } else {
                strip("s", "", 3)
            }
        })
        .unwrap_or(w)
}
