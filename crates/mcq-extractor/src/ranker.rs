//! Keyword ranking
//!
//! Merges answer candidates from independent sources, filters and
//! deduplicates them, then orders them by embedding similarity to the whole
//! text. A failing source is logged and recorded; the others still contribute.

use std::collections::HashSet;
use std::sync::Arc;

use mcq_core::{
    CandidateKeyword, Embedder, ExtractedPhrase, LexicalResource, PhraseExtractor, Result,
};
use mcq_vector::cosine_similarity;

use crate::keyphrase::MultipartiteRanker;

/// Phrases of at most this many characters are dropped
pub const MIN_KEYWORD_CHARS: usize = 3;

/// Longest noun phrase, in tokens, accepted as a candidate
pub const MAX_NOUN_PHRASE_TOKENS: usize = 3;

// ============================================================================
// Candidate sources
// ============================================================================

/// A source of answer candidates
pub trait CandidateSource: Send + Sync {
    /// Source name used in logs and reports
    fn name(&self) -> &str;

    /// Candidates for `text`; `n` is the number of keywords finally wanted
    fn candidates(&self, text: &str, n: usize) -> Result<Vec<ExtractedPhrase>>;
}

/// Statistical keyphrases, `2n` of them
pub struct KeyphraseSource {
    ranker: MultipartiteRanker,
}

impl KeyphraseSource {
    pub fn new(ranker: MultipartiteRanker) -> Self {
        Self { ranker }
    }
}

impl CandidateSource for KeyphraseSource {
    fn name(&self) -> &str {
        "keyphrase"
    }

    fn candidates(&self, text: &str, n: usize) -> Result<Vec<ExtractedPhrase>> {
        Ok(self
            .ranker
            .keyphrases(text, n.saturating_mul(2))
            .into_iter()
            .map(ExtractedPhrase::noun_phrase)
            .collect())
    }
}

/// Named-entity spans in the answer categories
pub struct EntitySource {
    extractor: Arc<dyn PhraseExtractor>,
}

impl EntitySource {
    pub fn new(extractor: Arc<dyn PhraseExtractor>) -> Self {
        Self { extractor }
    }
}

impl CandidateSource for EntitySource {
    fn name(&self) -> &str {
        "entity"
    }

    fn candidates(&self, text: &str, _n: usize) -> Result<Vec<ExtractedPhrase>> {
        Ok(self
            .extractor
            .extract(text)?
            .into_iter()
            .filter(|p| p.entity_type.is_some_and(|t| t.is_answer_category()))
            .collect())
    }
}

/// Short noun-phrase spans
pub struct NounPhraseSource {
    extractor: Arc<dyn PhraseExtractor>,
}

impl NounPhraseSource {
    pub fn new(extractor: Arc<dyn PhraseExtractor>) -> Self {
        Self { extractor }
    }
}

impl CandidateSource for NounPhraseSource {
    fn name(&self) -> &str {
        "noun_phrase"
    }

    fn candidates(&self, text: &str, _n: usize) -> Result<Vec<ExtractedPhrase>> {
        Ok(self
            .extractor
            .extract(text)?
            .into_iter()
            .filter(|p| p.entity_type.is_none() && p.token_count() <= MAX_NOUN_PHRASE_TOKENS)
            .collect())
    }
}

// ============================================================================
// Ranker
// ============================================================================

/// A source that failed during one extraction
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    pub source: String,
    pub message: String,
}

/// Ranked keywords plus the sources that failed
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub keywords: Vec<CandidateKeyword>,
    pub failures: Vec<SourceFailure>,
}

impl ExtractionReport {
    pub fn texts(&self) -> Vec<String> {
        self.keywords.iter().map(|k| k.text.clone()).collect()
    }
}

/// Orders answer candidates by relevance to a text
pub struct KeywordRanker {
    sources: Vec<Box<dyn CandidateSource>>,
    embedder: Arc<dyn Embedder>,
    lexicon: Arc<dyn LexicalResource>,
}

impl KeywordRanker {
    /// Ranker over the keyphrase, entity and noun-phrase sources
    pub fn new(
        extractor: Arc<dyn PhraseExtractor>,
        embedder: Arc<dyn Embedder>,
        lexicon: Arc<dyn LexicalResource>,
    ) -> Self {
        let sources: Vec<Box<dyn CandidateSource>> = vec![
            Box::new(KeyphraseSource::new(MultipartiteRanker::default())),
            Box::new(EntitySource::new(extractor.clone())),
            Box::new(NounPhraseSource::new(extractor)),
        ];
        Self::with_sources(sources, embedder, lexicon)
    }

    pub fn with_sources(
        sources: Vec<Box<dyn CandidateSource>>,
        embedder: Arc<dyn Embedder>,
        lexicon: Arc<dyn LexicalResource>,
    ) -> Self {
        Self {
            sources,
            embedder,
            lexicon,
        }
    }

    /// Up to `n` keywords, most relevant first
    pub async fn extract_keywords(&self, text: &str, n: usize) -> Result<Vec<String>> {
        Ok(self.rank(text, n).await?.texts())
    }

    /// Rank candidates and report failed sources
    pub async fn rank(&self, text: &str, n: usize) -> Result<ExtractionReport> {
        let mut report = ExtractionReport::default();
        if text.trim().is_empty() || n == 0 {
            return Ok(report);
        }

        let mut pool = Vec::new();
        for source in &self.sources {
            match source.candidates(text, n) {
                Ok(found) => {
                    tracing::debug!(source = source.name(), count = found.len(), "Candidates found");
                    pool.extend(found);
                }
                Err(e) => {
                    tracing::warn!("Candidate source {} failed: {}", source.name(), e);
                    report.failures.push(SourceFailure {
                        source: source.name().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let candidates = self.filter_candidates(pool);
        if candidates.is_empty() {
            return Ok(report);
        }

        let text_embedding = self.embedder.embed(text).await?;
        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let mut keywords: Vec<CandidateKeyword> = candidates
            .into_iter()
            .zip(embeddings.iter())
            .map(|(phrase, embedding)| CandidateKeyword {
                score: cosine_similarity(embedding, &text_embedding),
                text: phrase.text,
                entity_type: phrase.entity_type,
            })
            .collect();

        keywords.sort_by(|a, b| b.score.total_cmp(&a.score));
        keywords.truncate(n);

        report.keywords = keywords;
        Ok(report)
    }

    /// Drop stopwords and short phrases, then dedupe case-insensitively
    fn filter_candidates(&self, pool: Vec<ExtractedPhrase>) -> Vec<ExtractedPhrase> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut kept: Vec<ExtractedPhrase> = Vec::new();

        for phrase in pool {
            let text = phrase.text.trim();
            if text.chars().count() <= MIN_KEYWORD_CHARS || self.lexicon.is_stopword(text) {
                continue;
            }

            let key = text.to_lowercase();
            if seen.insert(key.clone()) {
                kept.push(ExtractedPhrase {
                    text: text.to_string(),
                    entity_type: phrase.entity_type,
                });
            } else if phrase.entity_type.is_some() {
                // Keep the first surface form but remember its entity type
                if let Some(existing) = kept
                    .iter_mut()
                    .find(|k| k.entity_type.is_none() && k.text.to_lowercase() == key)
                {
                    existing.entity_type = phrase.entity_type;
                }
            }
        }

        kept
    }
}
