//! End-to-end pipeline runs against deterministic model stubs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mcq_core::{
    AppConfig, ChunkParams, Embedder, GenerationRequest, McqError, Result, SequenceGenerator,
    OPTION_COUNT,
};
use mcq_extractor::{KeywordRanker, Lexicon, RuleBasedExtractor};
use mcq_generator::{
    render_json, McqPipeline, ModelServices, RandomSource, SkipReason, UnitOutcome,
};
use mcq_vector::{NormalizedLevenshtein, SenseEntry, VectorSenseIndex};

const PARIS: &str = "Paris is the capital of France. The Eiffel Tower is located in Paris.";

const DIMENSION: usize = 64;

/// Bag of character trigrams hashed into a fixed vector, plus a shared bias
/// component so unrelated words still land inside the distractor band
struct TrigramEmbedder {
    calls: AtomicUsize,
}

fn bucket(gram: &[char]) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for c in gram {
        hash ^= *c as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    1 + (hash % (DIMENSION as u64 - 1)) as usize
}

#[async_trait]
impl Embedder for TrigramEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let chars: Vec<char> = text.to_lowercase().chars().collect();
        let mut vector = vec![0.0; DIMENSION];
        vector[0] = 2.0;
        if chars.len() < 3 {
            vector[bucket(&chars)] += 1.0;
        } else {
            for gram in chars.windows(3) {
                vector[bucket(gram)] += 1.0;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }
}

/// Answers by prompt shape: echoes summaries, fixed questions and explanations
struct PromptGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl SequenceGenerator for PromptGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request.prompt.as_str();

        if let Some(text) = prompt.strip_prefix("summarize: ") {
            return Ok(vec![text.to_string()]);
        }
        if ["explain:", "elaborate", "justify"]
            .iter()
            .any(|p| prompt.starts_with(p))
        {
            return Ok(vec!["The passage states this directly.".to_string()]);
        }
        Ok(vec![
            "question: Which place does the passage describe".to_string(),
            "What does the passage describe".to_string(),
        ])
    }

    fn name(&self) -> &str {
        "prompt-stub"
    }
}

struct OfflineGenerator;

#[async_trait]
impl SequenceGenerator for OfflineGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<Vec<String>> {
        Err(McqError::GenerationFailure("model offline".to_string()))
    }

    fn name(&self) -> &str {
        "offline"
    }
}

struct SlowGenerator;

#[async_trait]
impl SequenceGenerator for SlowGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<Vec<String>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(vec!["late".to_string()])
    }

    fn name(&self) -> &str {
        "slow"
    }
}

struct Harness {
    generator: Arc<PromptGenerator>,
    embedder: Arc<TrigramEmbedder>,
}

impl Harness {
    fn new() -> Self {
        Self {
            generator: Arc::new(PromptGenerator {
                calls: AtomicUsize::new(0),
            }),
            embedder: Arc::new(TrigramEmbedder {
                calls: AtomicUsize::new(0),
            }),
        }
    }

    fn services(&self, generator: Arc<dyn SequenceGenerator>) -> ModelServices {
        let entry = |key: &str, freq: u64, vector: Vec<f32>| SenseEntry {
            key: key.to_string(),
            freq,
            vector,
        };
        let senses = VectorSenseIndex::from_entries(vec![
            entry("paris|GPE", 50, vec![1.0, 0.1, 0.0]),
            entry("london|GPE", 40, vec![0.9, 0.3, 0.1]),
            entry("berlin|GPE", 30, vec![0.8, 0.4, 0.2]),
            entry("france|GPE", 45, vec![0.7, 0.2, 0.6]),
        ]);

        ModelServices {
            generator,
            embedder: self.embedder.clone(),
            extractor: Arc::new(RuleBasedExtractor::new()),
            lexicon: Arc::new(Lexicon::english()),
            senses: Some(Arc::new(senses)),
            similarity: Arc::new(NormalizedLevenshtein::new()),
        }
    }

    fn pipeline(&self, seed: u64) -> McqPipeline {
        McqPipeline::with_random_source(
            self.services(self.generator.clone()),
            &AppConfig::default(),
            RandomSource::seeded(seed),
        )
    }

    fn ranker(&self) -> KeywordRanker {
        KeywordRanker::new(
            Arc::new(RuleBasedExtractor::new()),
            self.embedder.clone(),
            Arc::new(Lexicon::english()),
        )
    }
}

#[tokio::test]
async fn test_single_question_from_short_text() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(7);

    let mcqs = pipeline
        .generate(PARIS, ChunkParams::new(2000, 200, 1))
        .await
        .unwrap();

    assert_eq!(mcqs.len(), 1);
    let mcq = &mcqs[0];

    let keywords = harness.ranker().extract_keywords(PARIS, 10).await.unwrap();
    assert!(keywords.contains(&mcq.answer), "{} not in {:?}", mcq.answer, keywords);

    assert!(mcq.question.ends_with('?'));
    assert_eq!(mcq.options.len(), OPTION_COUNT);
    assert_eq!(mcq.options[mcq.correct_index], mcq.answer);
    assert!(!mcq.explanation.is_empty());

    let answer = mcq.answer.to_lowercase();
    for option in mcq.options.iter().filter(|o| **o != mcq.answer) {
        let lower = option.to_lowercase();
        assert!(!lower.contains(&answer) && !answer.contains(&lower));
    }
}

#[tokio::test]
async fn test_empty_input_is_not_an_error() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(1);

    let mcqs = pipeline.generate("", ChunkParams::default()).await.unwrap();
    assert!(mcqs.is_empty());

    let mcqs = pipeline.generate("  \n\t ", ChunkParams::default()).await.unwrap();
    assert!(mcqs.is_empty());
    assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_bad_chunk_parameters_fail_before_model_calls() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(1);

    let result = pipeline.generate(PARIS, ChunkParams::new(10, 15, 1)).await;

    assert!(matches!(result, Err(McqError::InvalidConfiguration(_))));
    assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_keyword_ranking_is_idempotent() {
    let harness = Harness::new();
    let ranker = harness.ranker();

    let first = ranker.extract_keywords(PARIS, 10).await.unwrap();
    let second = ranker.extract_keywords(PARIS, 10).await.unwrap();

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_seeded_runs_are_reproducible() {
    let harness = Harness::new();
    let params = ChunkParams::new(2000, 200, 3);

    let first = harness.pipeline(99).generate(PARIS, params).await.unwrap();
    let second = harness.pipeline(99).generate(PARIS, params).await.unwrap();

    assert!(!first.is_empty());
    assert_eq!(render_json(&first).unwrap(), render_json(&second).unwrap());
}

#[tokio::test]
async fn test_quota_bounds_each_chunk() {
    let harness = Harness::new();
    let text = [PARIS; 8].join(" ");
    let params = ChunkParams::new(20, 5, 1);

    let report = harness.pipeline(3).generate_report(&text, params).await.unwrap();

    assert!(report.chunks > 1);
    assert!(!report.mcqs.is_empty());
    assert!(report.mcqs.len() <= report.chunks);
    for mcq in &report.mcqs {
        assert_eq!(mcq.options[mcq.correct_index], mcq.answer);
    }
}

#[tokio::test]
async fn test_generator_outage_skips_every_keyword() {
    let harness = Harness::new();
    let pipeline = McqPipeline::with_random_source(
        harness.services(Arc::new(OfflineGenerator)),
        &AppConfig::default(),
        RandomSource::seeded(5),
    );

    let report = pipeline
        .generate_report(PARIS, ChunkParams::new(2000, 200, 3))
        .await
        .unwrap();

    assert!(report.mcqs.is_empty());
    assert_eq!(report.chunks, 1);
    assert!(!report.skips.is_empty());
    assert_eq!(
        report.count_skips(|r| matches!(r, SkipReason::ExplanationUnavailable { .. })),
        report.skips.len()
    );
}

#[tokio::test]
async fn test_synthesize_skips_without_explanation() {
    let harness = Harness::new();
    let pipeline = McqPipeline::with_random_source(
        harness.services(Arc::new(OfflineGenerator)),
        &AppConfig::default(),
        RandomSource::seeded(5),
    );

    let outcome = pipeline.synthesize(PARIS, "Paris").await;

    assert!(
        matches!(outcome, UnitOutcome::Skipped(SkipReason::ExplanationUnavailable { .. })),
        "{outcome:?}"
    );
}

#[tokio::test]
async fn test_run_timeout() {
    let harness = Harness::new();
    let pipeline = McqPipeline::with_random_source(
        harness.services(Arc::new(SlowGenerator)),
        &AppConfig::default(),
        RandomSource::seeded(5),
    );

    let result = pipeline
        .generate_with_timeout(PARIS, ChunkParams::default(), Duration::from_millis(50))
        .await;

    assert!(matches!(result, Err(McqError::Timeout(_))));
}
