//! Distractor generation
//!
//! Wrong options are pooled from three independent sources:
//! - word-sense neighbours of the answer (or of its significant tokens)
//! - thesaurus synonyms, hypernyms and hyponyms
//! - other ranked keywords of the same context
//!
//! A failing source contributes nothing. The pool is then filtered against
//! the answer for overlap, meaning and spelling, and topped up with generic
//! fallback options when too few survive.

use std::sync::Arc;

use mcq_core::{
    DistractorCandidate, DistractorConfig, Embedder, LexicalResource, SenseIndex, StringSimilarity,
};
use mcq_extractor::KeywordRanker;
use mcq_vector::{cosine_similarity, sense_term};

use crate::random::RandomSource;

/// Neighbours taken for a single-token answer
const SINGLE_TOKEN_NEIGHBOURS: usize = 10;
/// Neighbours taken per significant token of a multi-token answer
const PER_TOKEN_NEIGHBOURS: usize = 5;
/// Tokens this short never get their own sense lookup
const MIN_SIGNIFICANT_TOKEN_CHARS: usize = 4;

/// Distractors chosen for one answer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistractorSet {
    /// Final options, closest to the answer's length first
    pub options: Vec<String>,
    /// Candidates that passed filtering, in acceptance order
    pub accepted: Vec<DistractorCandidate>,
    /// Generic fallback strings that were added
    pub fallbacks: usize,
}

impl DistractorSet {
    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

pub struct DistractorGenerator {
    lexicon: Arc<dyn LexicalResource>,
    senses: Option<Arc<dyn SenseIndex>>,
    embedder: Arc<dyn Embedder>,
    similarity: Arc<dyn StringSimilarity>,
    ranker: Arc<KeywordRanker>,
    random: Arc<RandomSource>,
    config: DistractorConfig,
    context_keywords: usize,
}

impl DistractorGenerator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lexicon: Arc<dyn LexicalResource>,
        senses: Option<Arc<dyn SenseIndex>>,
        embedder: Arc<dyn Embedder>,
        similarity: Arc<dyn StringSimilarity>,
        ranker: Arc<KeywordRanker>,
        random: Arc<RandomSource>,
        config: DistractorConfig,
        context_keywords: usize,
    ) -> Self {
        Self {
            lexicon,
            senses,
            embedder,
            similarity,
            ranker,
            random,
            config,
            context_keywords,
        }
    }

    /// Up to `count` distractors for `answer`
    ///
    /// Fewer are returned only when the fallback options themselves clash
    /// with the answer or with accepted candidates.
    pub async fn generate_distractors(
        &self,
        answer: &str,
        context: &str,
        count: usize,
    ) -> DistractorSet {
        let mut pool = self.sense_candidates(answer);
        pool.extend(self.lexical_candidates(answer));
        pool.extend(self.context_candidates(answer, context).await);
        tracing::debug!(answer, pool = pool.len(), "Distractor pool assembled");

        let accepted = self.filter(answer, pool, count * 2).await;

        let mut options: Vec<String> = accepted.iter().map(|c| c.text.clone()).collect();
        let mut fallbacks = 0;
        if options.len() < count {
            let answer_lower = answer.to_lowercase();
            for fallback in &self.config.fallback_options {
                if options.len() >= count {
                    break;
                }
                let lower = fallback.to_lowercase();
                if overlaps(&lower, &answer_lower)
                    || options.iter().any(|o| o.to_lowercase() == lower)
                {
                    continue;
                }
                options.push(fallback.clone());
                fallbacks += 1;
            }
        }

        self.random.shuffle(&mut options);
        let answer_len = answer.chars().count();
        options.sort_by_key(|o| o.chars().count().abs_diff(answer_len));
        options.truncate(count);

        DistractorSet {
            options,
            accepted,
            fallbacks,
        }
    }

    fn sense_candidates(&self, answer: &str) -> Vec<String> {
        let Some(senses) = &self.senses else {
            return Vec::new();
        };

        let tokens: Vec<String> = answer.split_whitespace().map(str::to_lowercase).collect();
        let lookups: Vec<(&str, usize)> = if tokens.len() == 1 {
            vec![(answer, SINGLE_TOKEN_NEIGHBOURS)]
        } else {
            tokens
                .iter()
                .filter(|t| t.chars().count() >= MIN_SIGNIFICANT_TOKEN_CHARS)
                .filter(|t| !self.lexicon.is_stopword(t))
                .map(|t| (t.as_str(), PER_TOKEN_NEIGHBOURS))
                .collect()
        };

        let mut found = Vec::new();
        for (word, n) in lookups {
            let neighbours = senses.best_sense(word).and_then(|sense| match sense {
                Some(sense) => senses.nearest(&sense, n),
                None => Ok(Vec::new()),
            });
            match neighbours {
                Ok(neighbours) => found.extend(
                    neighbours
                        .into_iter()
                        .map(|(key, _)| sense_term(&key).replace('_', " ")),
                ),
                Err(e) => tracing::warn!("Sense lookup failed for '{}': {}", word, e),
            }
        }
        found
    }

    fn lexical_candidates(&self, answer: &str) -> Vec<String> {
        match self.lexicon.related_terms(answer) {
            Ok(terms) => terms.all().map(|t| t.replace('_', " ")).collect(),
            Err(e) => {
                tracing::warn!("Lexical lookup failed for '{}': {}", answer, e);
                Vec::new()
            }
        }
    }

    async fn context_candidates(&self, answer: &str, context: &str) -> Vec<String> {
        match self
            .ranker
            .extract_keywords(context, self.context_keywords)
            .await
        {
            Ok(keywords) => keywords
                .into_iter()
                .filter(|k| !k.eq_ignore_ascii_case(answer))
                .collect(),
            Err(e) => {
                tracing::warn!("Context keywords failed for '{}': {}", answer, e);
                Vec::new()
            }
        }
    }

    /// Candidates surviving every filter, in pool order, at most `limit`
    async fn filter(
        &self,
        answer: &str,
        pool: Vec<String>,
        limit: usize,
    ) -> Vec<DistractorCandidate> {
        let answer_lower = answer.to_lowercase();
        let answer_embedding = match self.embedder.embed(answer).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                tracing::debug!("Answer embedding failed, skipping semantic filter: {}", e);
                None
            }
        };

        let mut accepted: Vec<DistractorCandidate> = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        for candidate in pool {
            if accepted.len() >= limit {
                break;
            }
            let text = candidate.trim();
            let lower = text.to_lowercase();
            if lower.is_empty() || seen.contains(&lower) || overlaps(&lower, &answer_lower) {
                continue;
            }

            let semantic_similarity = match &answer_embedding {
                Some(target) => match self.embedder.embed(text).await {
                    Ok(embedding) => Some(cosine_similarity(&embedding, target)),
                    Err(e) => {
                        tracing::debug!("Embedding '{}' failed: {}", text, e);
                        None
                    }
                },
                None => None,
            };
            if let Some(sim) = semantic_similarity {
                if sim > self.config.max_semantic_similarity
                    || sim < self.config.min_semantic_similarity
                {
                    continue;
                }
            }

            let edit_similarity = self.similarity.edit_similarity(&lower, &answer_lower);
            if edit_similarity > self.config.max_edit_similarity {
                continue;
            }

            seen.push(lower);
            accepted.push(DistractorCandidate {
                text: text.to_string(),
                semantic_similarity,
                edit_similarity,
            });
        }

        accepted
    }
}

/// Equal, or one contains the other (inputs already lowercased)
fn overlaps(candidate: &str, answer: &str) -> bool {
    candidate.contains(answer) || answer.contains(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mcq_core::{ExtractedPhrase, McqError, RelatedTerms, Result};
    use mcq_extractor::{CandidateSource, Lexicon};
    use mcq_vector::{NormalizedLevenshtein, SenseEntry, VectorSenseIndex};

    /// Vectors keyed by exact text; unknown text fails to embed
    struct TableEmbedder(Vec<(&'static str, Vec<f32>)>);

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.0
                .iter()
                .find(|(key, _)| *key == text)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| McqError::EmbeddingFailure(text.to_string()))
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    struct Keywords(Vec<&'static str>);

    impl CandidateSource for Keywords {
        fn name(&self) -> &str {
            "keywords"
        }

        fn candidates(&self, _text: &str, _n: usize) -> Result<Vec<ExtractedPhrase>> {
            Ok(self.0.iter().map(|k| ExtractedPhrase::noun_phrase(*k)).collect())
        }
    }

    struct NoThesaurus;

    impl LexicalResource for NoThesaurus {
        fn related_terms(&self, _word: &str) -> Result<RelatedTerms> {
            Err(McqError::MissingResource(vec!["thesaurus".to_string()]))
        }

        fn is_stopword(&self, word: &str) -> bool {
            word == "the"
        }
    }

    /// Same vector for every text, so ranking keeps source order
    struct ConstEmbedder;

    #[async_trait]
    impl Embedder for ConstEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn embedder() -> Arc<TableEmbedder> {
        // Cosine to "Paris" = first component
        Arc::new(TableEmbedder(vec![
            ("Paris", vec![1.0, 0.0]),
            ("London", vec![0.6, 0.8]),
            ("Berlin", vec![0.5, 0.866]),
            ("Rome", vec![0.8, 0.6]),
            ("Parus", vec![0.6, 0.8]),
            ("Lutetia", vec![0.95, 0.312]),
            ("banana", vec![0.0, 1.0]),
            ("capital", vec![0.4, 0.916]),
            ("France", vec![0.7, 0.714]),
        ]))
    }

    fn ranker(keywords: Vec<&'static str>) -> Arc<KeywordRanker> {
        Arc::new(KeywordRanker::with_sources(
            vec![Box::new(Keywords(keywords))],
            Arc::new(ConstEmbedder),
            Arc::new(Lexicon::english()),
        ))
    }

    fn generator(
        lexicon: Arc<dyn LexicalResource>,
        senses: Option<Arc<dyn SenseIndex>>,
        keywords: Vec<&'static str>,
    ) -> DistractorGenerator {
        DistractorGenerator::new(
            lexicon,
            senses,
            embedder(),
            Arc::new(NormalizedLevenshtein::new()),
            ranker(keywords),
            Arc::new(RandomSource::seeded(3)),
            DistractorConfig::default(),
            10,
        )
    }

    fn senses() -> Arc<dyn SenseIndex> {
        let entry = |key: &str, vector: Vec<f32>| SenseEntry {
            key: key.to_string(),
            freq: 10,
            vector,
        };
        Arc::new(VectorSenseIndex::from_entries(vec![
            entry("paris|GPE", vec![1.0, 0.0]),
            entry("london|GPE", vec![0.9, 0.1]),
            entry("berlin|GPE", vec![0.8, 0.2]),
            entry("lutetia|GPE", vec![0.99, 0.01]),
        ]))
    }

    #[test]
    fn test_overlaps() {
        assert!(overlaps("paris", "paris"));
        assert!(overlaps("paris france", "paris"));
        assert!(overlaps("par", "paris"));
        assert!(!overlaps("london", "paris"));
    }

    #[tokio::test]
    async fn test_filters_overlap_meaning_and_spelling() {
        let distractors = generator(
            Arc::new(NoThesaurus),
            None,
            vec!["Paris", "Paris France", "Lutetia", "banana", "Parus", "London", "Rome"],
        );

        let set = distractors.generate_distractors("Paris", "ctx", 3).await;
        let accepted: Vec<&str> = set.accepted.iter().map(|c| c.text.as_str()).collect();

        // Lutetia too close in meaning, banana too far, Parus too close in spelling
        assert_eq!(accepted, vec!["London", "Rome"]);
        assert_eq!(set.fallbacks, 1);
        assert_eq!(set.len(), 3);
        assert!(set.options.contains(&"London".to_string()));
        assert!(set.options.contains(&"Rome".to_string()));
    }

    #[tokio::test]
    async fn test_sense_neighbours_use_surface_form() {
        let lexicon = Arc::new(Lexicon::english());
        let distractors = generator(lexicon, Some(senses()), vec![]);

        let set = distractors.generate_distractors("Paris", "ctx", 3).await;
        let accepted: Vec<&str> = set.accepted.iter().map(|c| c.text.as_str()).collect();

        assert!(accepted.contains(&"london"));
        assert!(accepted.contains(&"berlin"));
        assert!(!accepted.iter().any(|a| a.contains('|')));
    }

    #[tokio::test]
    async fn test_unembeddable_candidates_skip_semantic_check() {
        let distractors = generator(Arc::new(NoThesaurus), None, vec!["Marseille", "Lyon"]);

        let set = distractors.generate_distractors("Paris", "ctx", 3).await;
        let accepted: Vec<&str> = set.accepted.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(accepted, vec!["Marseille", "Lyon"]);
        assert!(set.accepted.iter().all(|c| c.semantic_similarity.is_none()));
    }

    #[tokio::test]
    async fn test_fallbacks_fill_empty_pool() {
        let distractors = generator(Arc::new(NoThesaurus), None, vec![]);

        let set = distractors.generate_distractors("Paris", "ctx", 3).await;
        assert_eq!(set.fallbacks, 3);
        let mut options = set.options.clone();
        options.sort();
        assert_eq!(
            options,
            vec!["All of the above", "Cannot be determined", "None of the above"]
        );
    }

    #[tokio::test]
    async fn test_options_sorted_by_length_gap() {
        let distractors = generator(
            Arc::new(NoThesaurus),
            None,
            vec!["London", "Rome", "Berlin", "capital", "France"],
        );

        let set = distractors.generate_distractors("Paris", "ctx", 3).await;
        assert_eq!(set.accepted.len(), 5);
        assert_eq!(set.fallbacks, 0);
        assert_eq!(set.len(), 3);

        let gaps: Vec<usize> = set
            .options
            .iter()
            .map(|o| o.chars().count().abs_diff(5))
            .collect();
        assert!(gaps.windows(2).all(|w| w[0] <= w[1]));
        assert!(gaps.iter().all(|g| *g <= 1));
    }
}
