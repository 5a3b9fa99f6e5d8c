//! MCQ Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the MCQ workspace:
//! - MCQ records and the candidate types that feed them
//! - Common error types and the structured error payload
//! - Narrow capability traits, one per external collaborator
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, CacheConfig, ConfigError, DistractorConfig, GenerationConfig, LlmConfig,
    LlmProvider, LoggingConfig, ResourceConfig,
};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for MCQ generation
#[derive(Error, Debug)]
pub enum McqError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Extraction failed ({source_name}): {message}")]
    ExtractionFailure {
        source_name: String,
        message: String,
    },

    #[error("Generation failed: {0}")]
    GenerationFailure(String),

    #[error("Embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error("Missing resources: {}", .0.join(", "))]
    MissingResource(Vec<String>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, McqError>;

/// Coarse classification of a failure as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Models or lexical resources are not available
    MissingResources,
    /// Something failed while processing valid input
    ProcessingError,
    /// The caller supplied unusable input or parameters
    BadInput,
}

/// Structured error payload reported to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Failure class
    pub kind: ErrorKind,
    /// Machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details (e.g. the missing resource paths)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorPayload {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&McqError> for ErrorPayload {
    fn from(err: &McqError) -> Self {
        let message = err.to_string();
        match err {
            McqError::MissingResource(paths) => {
                Self::new(ErrorKind::MissingResources, "MISSING_RESOURCES", message)
                    .with_details(paths.clone())
            }
            McqError::InvalidConfiguration(_) => {
                Self::new(ErrorKind::BadInput, "INVALID_CONFIGURATION", message)
            }
            McqError::InvalidInput(_) => Self::new(ErrorKind::BadInput, "BAD_INPUT", message),
            McqError::Config(_) => Self::new(ErrorKind::BadInput, "CONFIG_ERROR", message),
            McqError::Timeout(_) => Self::new(ErrorKind::ProcessingError, "TIMEOUT", message),
            McqError::ExtractionFailure { .. }
            | McqError::GenerationFailure(_)
            | McqError::EmbeddingFailure(_)
            | McqError::Io(_)
            | McqError::Other(_) => {
                Self::new(ErrorKind::ProcessingError, "PROCESSING_ERROR", message)
            }
        }
    }
}

// ============================================================================
// Entity Types
// ============================================================================

/// Coarse semantic category assigned to a recognized phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Product,
    Event,
    WorkOfArt,
    Law,
    Language,
    Date,
    Money,
    Percent,
    Quantity,
    Unknown,
}

impl EntityType {
    /// Categories whose spans are accepted as answer candidates
    pub const ANSWER_CATEGORIES: [EntityType; 12] = [
        Self::Person,
        Self::Organization,
        Self::Location,
        Self::Product,
        Self::Event,
        Self::WorkOfArt,
        Self::Law,
        Self::Language,
        Self::Date,
        Self::Money,
        Self::Percent,
        Self::Quantity,
    ];

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Organization => "Organization",
            Self::Location => "Location",
            Self::Product => "Product",
            Self::Event => "Event",
            Self::WorkOfArt => "WorkOfArt",
            Self::Law => "Law",
            Self::Language => "Language",
            Self::Date => "Date",
            Self::Money => "Money",
            Self::Percent => "Percent",
            Self::Quantity => "Quantity",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether spans of this type may become answers
    pub fn is_answer_category(&self) -> bool {
        Self::ANSWER_CATEGORIES.contains(self)
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Candidate Models
// ============================================================================

/// A phrase produced by an extractor
///
/// `entity_type` is `None` for plain noun-phrase spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPhrase {
    pub text: String,
    pub entity_type: Option<EntityType>,
}

impl ExtractedPhrase {
    pub fn entity(text: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            text: text.into(),
            entity_type: Some(entity_type),
        }
    }

    pub fn noun_phrase(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entity_type: None,
        }
    }

    /// Number of whitespace-separated tokens
    pub fn token_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// A ranked answer candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateKeyword {
    /// Surface form as it first appeared
    pub text: String,

    /// Entity category, if the phrase came from an entity span
    pub entity_type: Option<EntityType>,

    /// Relevance to the source text (higher is more central)
    pub score: f32,
}

/// A possible wrong option and how it relates to the answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistractorCandidate {
    pub text: String,

    /// Cosine similarity of embeddings, absent when embedding failed
    pub semantic_similarity: Option<f32>,

    /// Normalized edit similarity to the answer
    pub edit_similarity: f32,
}

/// Synonyms, hypernyms and hyponyms of a word
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedTerms {
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub hypernyms: Vec<String>,
    #[serde(default)]
    pub hyponyms: Vec<String>,
}

impl RelatedTerms {
    /// Synonyms, then hypernyms, then hyponyms
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.synonyms
            .iter()
            .chain(self.hypernyms.iter())
            .chain(self.hyponyms.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.synonyms.is_empty() && self.hypernyms.is_empty() && self.hyponyms.is_empty()
    }
}

// ============================================================================
// Chunking Parameters
// ============================================================================

/// Caller-supplied parameters for a document run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkParams {
    /// Words per chunk
    pub chunk_size: usize,

    /// Words shared by consecutive chunks
    pub overlap: usize,

    /// Upper bound on questions produced per chunk
    pub questions_per_chunk: usize,
}

impl ChunkParams {
    pub fn new(chunk_size: usize, overlap: usize, questions_per_chunk: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            questions_per_chunk,
        }
    }

    /// Check the parameter invariants
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(McqError::InvalidConfiguration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(McqError::InvalidConfiguration(format!(
                "overlap ({}) must be less than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        if self.questions_per_chunk == 0 {
            return Err(McqError::InvalidConfiguration(
                "questions_per_chunk must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self::new(2000, 200, 3)
    }
}

// ============================================================================
// MCQ Record
// ============================================================================

/// Number of options in every generated question
pub const OPTION_COUNT: usize = 4;

/// A complete multiple-choice question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McqRecord {
    pub question: String,
    pub answer: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
}

impl McqRecord {
    /// Build a record from already-ordered options
    ///
    /// `correct_index` is taken from the position of the literal answer.
    pub fn from_options(
        question: impl Into<String>,
        answer: impl Into<String>,
        options: Vec<String>,
        explanation: impl Into<String>,
    ) -> Result<Self> {
        let answer = answer.into();
        let correct_index = options
            .iter()
            .position(|o| *o == answer)
            .ok_or_else(|| {
                McqError::GenerationFailure(format!("answer '{answer}' missing from options"))
            })?;

        let record = Self {
            question: question.into(),
            answer,
            options,
            correct_index,
            explanation: explanation.into(),
        };
        record.validate()?;
        Ok(record)
    }

    /// Check the record invariants
    pub fn validate(&self) -> Result<()> {
        if !self.question.ends_with('?') {
            return Err(McqError::GenerationFailure(format!(
                "question does not end with '?': {}",
                self.question
            )));
        }
        if self.options.len() != OPTION_COUNT {
            return Err(McqError::GenerationFailure(format!(
                "expected {OPTION_COUNT} options, got {}",
                self.options.len()
            )));
        }

        let distinct: HashSet<String> = self.options.iter().map(|o| o.to_lowercase()).collect();
        if distinct.len() != self.options.len() {
            return Err(McqError::GenerationFailure(
                "options are not pairwise distinct".to_string(),
            ));
        }

        if self.options.get(self.correct_index) != Some(&self.answer) {
            return Err(McqError::GenerationFailure(
                "correct_index does not point at the answer".to_string(),
            ));
        }
        Ok(())
    }

    /// Letter of the correct option (A-D)
    pub fn correct_letter(&self) -> char {
        option_letter(self.correct_index)
    }
}

/// Letter label for an option position
pub fn option_letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

// ============================================================================
// Capability Traits
// ============================================================================

/// Parameters for a single sequence generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub beams: u32,
    pub max_length: u32,
    pub temperature: f32,
    pub num_outputs: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            beams: 1,
            max_length: 64,
            temperature: 1.0,
            num_outputs: 1,
        }
    }

    pub fn with_beams(mut self, beams: u32) -> Self {
        self.beams = beams;
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_num_outputs(mut self, num_outputs: u32) -> Self {
        self.num_outputs = num_outputs;
        self
    }
}

/// Prompt text in, generated completions out
#[async_trait::async_trait]
pub trait SequenceGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Text in, fixed-length vector out
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts; the default embeds them one at a time
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    fn dimension(&self) -> usize;
}

/// Entity and noun-phrase spans of a text
pub trait PhraseExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedPhrase>>;
}

/// Synonym/hypernym/hyponym lookup and stopword filtering
pub trait LexicalResource: Send + Sync {
    fn related_terms(&self, word: &str) -> Result<RelatedTerms>;

    fn is_stopword(&self, word: &str) -> bool;
}

/// Word-sense nearest neighbours
pub trait SenseIndex: Send + Sync {
    fn best_sense(&self, word: &str) -> Result<Option<String>>;

    fn nearest(&self, sense: &str, n: usize) -> Result<Vec<(String, f32)>>;
}

/// String similarity in [0, 1], 1 meaning identical
pub trait StringSimilarity: Send + Sync {
    fn edit_similarity(&self, a: &str, b: &str) -> f32;
}

// ============================================================================
// Tests
// ============================================================================
