//! MCQ Extractor - Answer candidate extraction
//!
//! Finds and ranks the phrases that can become correct answers:
//! - Rule-based Named Entity Recognition (NER)
//! - Noun-phrase spans
//! - Multipartite graph keyphrase ranking
//! - Keyword ranking by embedding similarity
//!
//! Also provides the English stopword list and the thesaurus-backed
//! lexical resource used for distractors.

use std::collections::HashSet;

use mcq_core::{ExtractedPhrase, PhraseExtractor, Result};

pub mod keyphrase;
pub mod lexicon;
pub mod ner;
pub mod noun_phrase;
pub mod ranker;
pub mod stopwords;
pub mod tokenize;

pub use keyphrase::MultipartiteRanker;
pub use lexicon::Lexicon;
pub use ner::{EntitySpan, RuleBasedNer};
pub use noun_phrase::NounPhraseChunker;
pub use ranker::{
    CandidateSource, EntitySource, ExtractionReport, KeyphraseSource, KeywordRanker,
    NounPhraseSource, SourceFailure,
};
pub use stopwords::StopwordSet;
pub use tokenize::sentences;

/// Entity spans followed by the noun phrases that are not entities
pub struct RuleBasedExtractor {
    ner: RuleBasedNer,
    chunker: NounPhraseChunker,
}

impl RuleBasedExtractor {
    pub fn new() -> Self {
        Self {
            ner: RuleBasedNer::new(),
            chunker: NounPhraseChunker::default(),
        }
    }

    pub fn with_stopwords(stopwords: StopwordSet) -> Self {
        Self {
            ner: RuleBasedNer::new(),
            chunker: NounPhraseChunker::new(stopwords),
        }
    }
}

impl Default for RuleBasedExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PhraseExtractor for RuleBasedExtractor {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedPhrase>> {
        let entities = self.ner.recognize(text);
        let entity_texts: HashSet<String> =
            entities.iter().map(|e| e.text.to_lowercase()).collect();

        let mut phrases: Vec<ExtractedPhrase> = entities
            .into_iter()
            .map(|e| ExtractedPhrase::entity(e.text, e.entity_type))
            .collect();

        phrases.extend(
            self.chunker
                .noun_phrases(text)
                .into_iter()
                .filter(|p| !entity_texts.contains(&p.to_lowercase()))
                .map(ExtractedPhrase::noun_phrase),
        );

        Ok(phrases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcq_core::EntityType;

    #[test]
    fn test_extract_entities_and_noun_phrases() {
        let extractor = RuleBasedExtractor::new();
        let phrases = extractor
            .extract("Paris is the capital of France. The Eiffel Tower is located in Paris.")
            .unwrap();

        let france = phrases.iter().find(|p| p.text == "France").unwrap();
        assert_eq!(france.entity_type, Some(EntityType::Location));

        let capital = phrases.iter().find(|p| p.text == "capital").unwrap();
        assert_eq!(capital.entity_type, None);

        // Entities are not repeated as noun phrases
        assert!(!phrases
            .iter()
            .any(|p| p.text == "France" && p.entity_type.is_none()));
    }

    #[test]
    fn test_empty_text() {
        let extractor = RuleBasedExtractor::new();
        assert!(extractor.extract("").unwrap().is_empty());
    }
}
