//! Noun-phrase span detection
//!
//! Without a part-of-speech model, noun phrases are approximated as maximal
//! runs of content words: adjacent tokens that are not stopwords, not obvious
//! verb or adverb forms, and not separated by punctuation.

use std::collections::HashSet;

use crate::stopwords::StopwordSet;
use crate::tokenize::words;

/// Frequent verb forms that the suffix rules miss
const COMMON_VERBS: &[&str] = &[
    "become", "became", "becomes", "began", "begin", "begins", "begun", "bring", "brought",
    "build", "built", "came", "come", "comes", "find", "found", "gave", "give", "given",
    "gives", "go", "goes", "gone", "got", "held", "hold", "holds", "keep", "kept", "knew",
    "know", "known", "lead", "leads", "led", "left", "made", "make", "makes", "said",
    "saw", "say", "says", "see", "seen", "sees", "set", "show", "shown", "shows", "stood",
    "take", "taken", "takes", "took", "told", "use", "uses", "went", "won", "wrote",
    "written", "also", "often", "still", "yet", "however", "many", "much", "several",
];

/// A phrase occurrence in the source text
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseSpan {
    /// Surface text as written
    pub text: String,
    /// Lowercased words
    pub words: Vec<String>,
    /// Index of the first word among all word tokens of the text
    pub position: usize,
    /// Byte offset in the source
    pub start: usize,
}

/// Finds noun-phrase-like spans
#[derive(Debug, Clone, Default)]
pub struct NounPhraseChunker {
    stopwords: StopwordSet,
}

impl NounPhraseChunker {
    pub fn new(stopwords: StopwordSet) -> Self {
        Self { stopwords }
    }

    fn is_content_word(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        if self.stopwords.contains(&lower) || COMMON_VERBS.contains(&lower.as_str()) {
            return false;
        }
        if !word.chars().any(char::is_alphabetic) {
            return false;
        }
        let capitalized = word.chars().next().is_some_and(char::is_uppercase);
        if !capitalized
            && lower.chars().count() > 4
            && (lower.ends_with("ly") || lower.ends_with("ing") || lower.ends_with("ed"))
        {
            return false;
        }
        true
    }

    /// All content-word runs, in text order
    pub fn spans(&self, text: &str) -> Vec<PhraseSpan> {
        let tokens = words(text);
        let mut spans = Vec::new();
        let mut current: Option<(usize, usize)> = None;

        let flush = |run: Option<(usize, usize)>, spans: &mut Vec<PhraseSpan>| {
            if let Some((first, last)) = run {
                let start = tokens[first].start;
                let end = tokens[last].end();
                spans.push(PhraseSpan {
                    text: text[start..end].to_string(),
                    words: tokens[first..=last]
                        .iter()
                        .map(|t| t.text.to_lowercase())
                        .collect(),
                    position: first,
                    start,
                });
            }
        };

        for (i, token) in tokens.iter().enumerate() {
            if !self.is_content_word(token.text) {
                flush(current.take(), &mut spans);
                continue;
            }

            current = match current {
                Some((first, last)) => {
                    let gap = text[tokens[last].end()..token.start].trim();
                    if gap.is_empty() || gap == "-" {
                        Some((first, i))
                    } else {
                        flush(Some((first, last)), &mut spans);
                        Some((i, i))
                    }
                }
                None => Some((i, i)),
            };
        }
        flush(current, &mut spans);

        spans
    }

    /// Distinct phrase texts in first-occurrence order
    pub fn noun_phrases(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.spans(text)
            .into_iter()
            .filter(|s| seen.insert(s.text.to_lowercase()))
            .map(|s| s.text)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_sentence() {
        let chunker = NounPhraseChunker::default();
        let phrases = chunker
            .noun_phrases("Paris is the capital of France. The Eiffel Tower is located in Paris.");
        assert_eq!(phrases, vec!["Paris", "capital", "France", "Eiffel Tower"]);
    }

    #[test]
    fn test_punctuation_breaks_runs() {
        let chunker = NounPhraseChunker::default();
        let spans = chunker.spans("Apples, pears and plums grow quickly.");
        let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Apples", "pears", "plums grow"]);
        assert_eq!(spans[1].position, 1);
        assert_eq!(spans[2].words, vec!["plums", "grow"]);
    }

    #[test]
    fn test_hyphenated_words_join() {
        let chunker = NounPhraseChunker::default();
        let phrases = chunker.noun_phrases("A red-brick landmark stands here.");
        assert_eq!(phrases, vec!["red-brick landmark stands"]);
    }
}
