//! MCQ Generator - Multiple-choice question pipeline
//!
//! Turns document text into MCQ records:
//! - Word-window chunking of the document
//! - Per-chunk summarization and keyword ranking
//! - Question, distractor and explanation generation per keyword
//! - Record assembly with the answer shuffled among the options
//!
//! Failures local to one keyword or one chunk are recorded as skips in the
//! run report; only bad parameters and missing resources end a run.
//!
//! Author: hephaex@gmail.com

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mcq_core::{
    AppConfig, ChunkParams, DistractorConfig, Embedder, GenerationConfig, LexicalResource,
    McqError, McqRecord, PhraseExtractor, Result, SenseIndex, SequenceGenerator,
    StringSimilarity, OPTION_COUNT,
};
use mcq_extractor::{KeywordRanker, Lexicon, RuleBasedExtractor};
use mcq_parser::{chunk_text, normalize_whitespace, Chunk};
use mcq_vector::{create_embedding_client, NormalizedLevenshtein, VectorSenseIndex};
use serde::Serialize;

pub mod cache;
pub mod distractor;
pub mod explanation;
pub mod llm;
pub mod outcome;
pub mod question;
pub mod random;
pub mod render;
pub mod summary;

pub use cache::{CacheStats, CacheStatsReport, CachedEmbedder, EmbeddingCache};
pub use distractor::{DistractorGenerator, DistractorSet};
pub use explanation::ExplanationGenerator;
pub use llm::{create_generator, OllamaGenerator, OpenAiGenerator};
pub use outcome::{SkipReason, SkipRecord, UnitOutcome};
pub use question::{GeneratedQuestion, QuestionGenerator, QuestionSource};
pub use random::RandomSource;
pub use render::{render_json, render_text};
pub use summary::Summarizer;

// ============================================================================
// Model Services
// ============================================================================

/// External collaborators of a run
#[derive(Clone)]
pub struct ModelServices {
    pub generator: Arc<dyn SequenceGenerator>,
    pub embedder: Arc<dyn Embedder>,
    pub extractor: Arc<dyn PhraseExtractor>,
    pub lexicon: Arc<dyn LexicalResource>,
    pub senses: Option<Arc<dyn SenseIndex>>,
    pub similarity: Arc<dyn StringSimilarity>,
}

impl ModelServices {
    /// Default collaborators built from configuration
    ///
    /// Configured resources that are absent fail the build when
    /// `resources.required` is set and are skipped otherwise.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let missing = config.resources.missing();
        if !missing.is_empty() {
            let names = display_paths(&missing);
            if config.resources.required {
                return Err(McqError::MissingResource(names));
            }
            tracing::warn!("Continuing without missing resources: {}", names.join(", "));
        }

        let mut resources = config.resources.clone();
        for slot in [
            &mut resources.thesaurus_path,
            &mut resources.sense_vectors_path,
            &mut resources.stopwords_path,
        ] {
            if slot.as_ref().is_some_and(|p| missing.contains(p)) {
                *slot = None;
            }
        }

        let generator: Arc<dyn SequenceGenerator> = Arc::from(create_generator(&config.llm)?);
        let mut embedder: Arc<dyn Embedder> = Arc::from(create_embedding_client(&config.llm)?);
        if config.cache.enabled {
            let cache = EmbeddingCache::with_config(&config.cache);
            embedder = Arc::new(CachedEmbedder::new(embedder, cache));
        }

        let lexicon = Lexicon::from_config(&resources)?;
        let extractor = RuleBasedExtractor::with_stopwords(lexicon.stopwords().clone());
        let senses = match &resources.sense_vectors_path {
            Some(path) => {
                let index = VectorSenseIndex::from_file(path)?;
                tracing::info!(entries = index.len(), "Sense vectors loaded");
                Some(Arc::new(index) as Arc<dyn SenseIndex>)
            }
            None => None,
        };

        tracing::info!(
            generator = generator.name(),
            thesaurus_entries = lexicon.thesaurus_len(),
            "Model services ready"
        );

        Ok(Self {
            generator,
            embedder,
            extractor: Arc::new(extractor),
            lexicon: Arc::new(lexicon),
            senses,
            similarity: Arc::new(NormalizedLevenshtein::new()),
        })
    }
}

fn display_paths(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

// ============================================================================
// Run Report
// ============================================================================

/// Pipeline states of a document run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Chunking,
    PerChunkProcessing,
    Aggregating,
    Done,
}

/// Everything a document run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    /// Records in presentation order
    pub mcqs: Vec<McqRecord>,
    /// Number of chunks processed
    pub chunks: usize,
    /// Keywords and chunks that produced nothing
    pub skips: Vec<SkipRecord>,
}

impl GenerationReport {
    /// Skips matching a predicate
    pub fn count_skips(&self, pred: impl Fn(&SkipReason) -> bool) -> usize {
        self.skips.iter().filter(|s| pred(&s.reason)).count()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Document text in, MCQ records out
pub struct McqPipeline {
    generation: GenerationConfig,
    random: Arc<RandomSource>,
    summarizer: Summarizer,
    ranker: Arc<KeywordRanker>,
    questions: QuestionGenerator,
    distractors: DistractorGenerator,
    explanations: ExplanationGenerator,
}

impl McqPipeline {
    /// Create a pipeline drawing randomness from the OS
    pub fn new(services: ModelServices, config: &AppConfig) -> Self {
        Self::with_random_source(services, config, RandomSource::from_entropy())
    }

    /// Create a pipeline with a caller-supplied random source
    pub fn with_random_source(
        services: ModelServices,
        config: &AppConfig,
        random: RandomSource,
    ) -> Self {
        let random = Arc::new(random);
        let ranker = Arc::new(KeywordRanker::new(
            services.extractor.clone(),
            services.embedder.clone(),
            services.lexicon.clone(),
        ));

        Self {
            generation: config.generation.clone(),
            summarizer: Summarizer::new(
                services.generator.clone(),
                config.generation.summary_max_length,
            ),
            questions: QuestionGenerator::new(
                services.generator.clone(),
                services.embedder.clone(),
                services.extractor.clone(),
                random.clone(),
            ),
            distractors: DistractorGenerator::new(
                services.lexicon,
                services.senses,
                services.embedder,
                services.similarity,
                ranker.clone(),
                random.clone(),
                distractor_config(&config.distractor),
                config.generation.context_keywords,
            ),
            explanations: ExplanationGenerator::new(services.generator, random.clone()),
            ranker,
            random,
        }
    }

    /// MCQ records for `text`
    pub async fn generate(&self, text: &str, params: ChunkParams) -> Result<Vec<McqRecord>> {
        Ok(self.generate_report(text, params).await?.mcqs)
    }

    /// Whole run bounded by `timeout`
    pub async fn generate_with_timeout(
        &self,
        text: &str,
        params: ChunkParams,
        timeout: Duration,
    ) -> Result<GenerationReport> {
        tokio::time::timeout(timeout, self.generate_report(text, params))
            .await
            .map_err(|_| McqError::Timeout(timeout.as_secs()))?
    }

    /// MCQ records plus what was skipped along the way
    pub async fn generate_report(
        &self,
        text: &str,
        params: ChunkParams,
    ) -> Result<GenerationReport> {
        params.validate()?;

        let mut report = GenerationReport::default();
        if text.trim().is_empty() {
            tracing::info!("Empty input, nothing to generate");
            return Ok(report);
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut state = PipelineState::Chunking;
        loop {
            tracing::debug!(?state, "Pipeline state");
            state = match state {
                PipelineState::Chunking => {
                    chunks = chunk_text(text, params.chunk_size, params.overlap)?;
                    tracing::info!(
                        chars = text.chars().count(),
                        chunks = chunks.len(),
                        "Document chunked"
                    );
                    PipelineState::PerChunkProcessing
                }
                PipelineState::PerChunkProcessing => {
                    for chunk in &chunks {
                        self.process_chunk(chunk, params.questions_per_chunk, &mut report)
                            .await;
                    }
                    report.chunks = chunks.len();
                    PipelineState::Aggregating
                }
                PipelineState::Aggregating => {
                    self.random.shuffle(&mut report.mcqs);
                    PipelineState::Done
                }
                PipelineState::Done => break,
            };
        }

        tracing::info!(
            mcqs = report.mcqs.len(),
            skipped = report.skips.len(),
            "Generation complete"
        );
        Ok(report)
    }

    async fn process_chunk(&self, chunk: &Chunk, quota: usize, report: &mut GenerationReport) {
        tracing::info!(chunk = chunk.index, words = chunk.word_count, "Processing chunk");
        let text = normalize_whitespace(&chunk.text);

        let summary = match self.summarizer.summarize(&text).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(chunk = chunk.index, "Summary failed, using chunk text: {}", e);
                text
            }
        };

        let mut keywords = match self
            .ranker
            .extract_keywords(&summary, self.generation.keywords_per_chunk)
            .await
        {
            Ok(keywords) => keywords,
            Err(e) => {
                tracing::warn!(chunk = chunk.index, "Keyword extraction failed: {}", e);
                report.skips.push(SkipRecord {
                    chunk: chunk.index,
                    keyword: None,
                    reason: SkipReason::KeywordExtractionFailed {
                        message: e.to_string(),
                    },
                });
                return;
            }
        };

        if keywords.is_empty() {
            report.skips.push(SkipRecord {
                chunk: chunk.index,
                keyword: None,
                reason: SkipReason::NoKeywords,
            });
            return;
        }
        tracing::debug!(chunk = chunk.index, keywords = ?keywords, "Keywords ranked");

        self.random.shuffle(&mut keywords);

        let mut produced = 0;
        for keyword in keywords {
            if produced >= quota {
                break;
            }
            match self.synthesize(&summary, &keyword).await {
                UnitOutcome::Produced(record) => {
                    report.mcqs.push(record);
                    produced += 1;
                }
                UnitOutcome::Skipped(reason) => {
                    tracing::debug!(chunk = chunk.index, keyword = %keyword, "Skipped: {}", reason);
                    report.skips.push(SkipRecord {
                        chunk: chunk.index,
                        keyword: Some(keyword),
                        reason,
                    });
                }
            }
        }
    }

    /// One MCQ record for `answer`, or why there is none
    pub async fn synthesize(&self, context: &str, answer: &str) -> UnitOutcome<McqRecord> {
        let question = self.questions.generate_question(context, answer).await;
        if question.text.trim().chars().count() < 10 {
            return UnitOutcome::Skipped(SkipReason::QuestionTooShort);
        }

        let required = OPTION_COUNT - 1;
        let count = self.generation.num_distractors.max(required);
        let distractors = self
            .distractors
            .generate_distractors(answer, context, count)
            .await;
        if distractors.len() < required {
            return UnitOutcome::Skipped(SkipReason::TooFewDistractors {
                found: distractors.len(),
                required,
            });
        }

        let explanation = match self
            .explanations
            .explain(context, answer, &question.text)
            .await
        {
            Ok(explanation) => explanation,
            Err(e) => {
                return UnitOutcome::Skipped(SkipReason::ExplanationUnavailable {
                    message: e.to_string(),
                })
            }
        };

        let mut options = Vec::with_capacity(OPTION_COUNT);
        options.push(answer.to_string());
        options.extend(distractors.options.into_iter().take(required));
        self.random.shuffle(&mut options);

        match McqRecord::from_options(question.text, answer, options, explanation) {
            Ok(record) => UnitOutcome::Produced(record),
            Err(e) => UnitOutcome::Skipped(SkipReason::InvalidRecord {
                message: e.to_string(),
            }),
        }
    }
}

fn distractor_config(config: &DistractorConfig) -> DistractorConfig {
    let mut config = config.clone();
    if config.min_semantic_similarity > config.max_semantic_similarity {
        tracing::warn!(
            min = config.min_semantic_similarity,
            max = config.max_semantic_similarity,
            "Semantic similarity band is inverted, swapping bounds"
        );
        std::mem::swap(
            &mut config.min_semantic_similarity,
            &mut config.max_semantic_similarity,
        );
    }
    config
}
