//! MCQ Configuration Management
//!
//! Handles configuration from environment variables, config files,
//! and command-line arguments with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// LLM and embedding provider configuration
    pub llm: LlmConfig,

    /// Document run configuration
    pub generation: GenerationConfig,

    /// Distractor filtering thresholds
    pub distractor: DistractorConfig,

    /// Lexical and sense resources on disk
    pub resources: ResourceConfig,

    /// Embedding cache configuration
    pub cache: CacheConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // LLM
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider.parse()?;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.llm.openai_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            config.llm.openai_base_url = Some(url);
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            config.llm.ollama_url = url;
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }

        // Generation
        if let Some(size) = parse_env("CHUNK_SIZE")? {
            config.generation.chunk_size = size;
        }
        if let Some(overlap) = parse_env("CHUNK_OVERLAP")? {
            config.generation.chunk_overlap = overlap;
        }
        if let Some(count) = parse_env("QUESTIONS_PER_CHUNK")? {
            config.generation.questions_per_chunk = count;
        }

        // Resources
        if let Ok(path) = std::env::var("THESAURUS_PATH") {
            config.resources.thesaurus_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("SENSE_VECTORS_PATH") {
            config.resources.sense_vectors_path = Some(PathBuf::from(path));
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let llm_defaults = LlmConfig::default();
        let generation_defaults = GenerationConfig::default();

        // Only override if env values differ from defaults
        if env_config.llm.provider != llm_defaults.provider {
            self.llm.provider = env_config.llm.provider;
        }
        if env_config.llm.model != llm_defaults.model {
            self.llm.model = env_config.llm.model;
        }
        if env_config.llm.embedding_model != llm_defaults.embedding_model {
            self.llm.embedding_model = env_config.llm.embedding_model;
        }
        if env_config.llm.ollama_url != llm_defaults.ollama_url {
            self.llm.ollama_url = env_config.llm.ollama_url;
        }
        if env_config.generation.chunk_size != generation_defaults.chunk_size {
            self.generation.chunk_size = env_config.generation.chunk_size;
        }
        if env_config.generation.chunk_overlap != generation_defaults.chunk_overlap {
            self.generation.chunk_overlap = env_config.generation.chunk_overlap;
        }
        if env_config.generation.questions_per_chunk != generation_defaults.questions_per_chunk {
            self.generation.questions_per_chunk = env_config.generation.questions_per_chunk;
        }
        if env_config.resources.thesaurus_path.is_some() {
            self.resources.thesaurus_path = env_config.resources.thesaurus_path;
        }
        if env_config.resources.sense_vectors_path.is_some() {
            self.resources.sense_vectors_path = env_config.resources.sense_vectors_path;
        }
        if env_config.logging.level != LoggingConfig::default().level {
            self.logging.level = env_config.logging.level;
        }

        // Always use env for sensitive values
        if env_config.llm.openai_api_key.is_some() {
            self.llm.openai_api_key = env_config.llm.openai_api_key;
        }
        if env_config.llm.openai_base_url.is_some() {
            self.llm.openai_base_url = env_config.llm.openai_base_url;
        }

        Ok(self)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// LLM provider to use
    pub provider: LlmProvider,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for Azure or compatible APIs)
    pub openai_base_url: Option<String>,

    /// Ollama server URL
    pub ollama_url: String,

    /// Model used for summaries, questions and explanations
    pub model: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            openai_api_key: None,
            openai_base_url: None,
            ollama_url: "http://localhost:11434".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    Ollama,
    Azure,
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "azure" => Ok(Self::Azure),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Document run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Words per chunk
    pub chunk_size: usize,

    /// Words shared between consecutive chunks
    pub chunk_overlap: usize,

    /// Questions produced per chunk at most
    pub questions_per_chunk: usize,

    /// Ranked keywords taken from each chunk summary
    pub keywords_per_chunk: usize,

    /// Wrong options per question
    pub num_distractors: usize,

    /// Context keywords used as fallback distractors
    pub context_keywords: usize,

    /// Upper bound on summary length
    pub summary_max_length: u32,

    /// Whole-document timeout in seconds (none = unbounded)
    pub run_timeout_secs: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            chunk_overlap: 200,
            questions_per_chunk: 3,
            keywords_per_chunk: 10,
            num_distractors: 3,
            context_keywords: 10,
            summary_max_length: 150,
            run_timeout_secs: None,
        }
    }
}

/// Thresholds for accepting distractors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistractorConfig {
    /// Candidates less similar than this are unrelated
    pub min_semantic_similarity: f32,

    /// Candidates more similar than this mean the same thing
    pub max_semantic_similarity: f32,

    /// Candidates lexically closer than this look like typos of the answer
    pub max_edit_similarity: f32,

    /// Generic options appended when too few candidates survive
    pub fallback_options: Vec<String>,
}

impl Default for DistractorConfig {
    fn default() -> Self {
        Self {
            min_semantic_similarity: 0.2,
            max_semantic_similarity: 0.85,
            max_edit_similarity: 0.7,
            fallback_options: vec![
                "None of the above".to_string(),
                "All of the above".to_string(),
                "Cannot be determined".to_string(),
            ],
        }
    }
}

/// Lexical resources loaded from disk
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResourceConfig {
    /// JSON thesaurus (synonyms, hypernyms, hyponyms)
    pub thesaurus_path: Option<PathBuf>,

    /// JSON-lines sense vectors
    pub sense_vectors_path: Option<PathBuf>,

    /// Extra stopwords, one per line
    pub stopwords_path: Option<PathBuf>,

    /// Fail when a configured resource is absent
    pub required: bool,
}

impl ResourceConfig {
    /// Configured resource paths
    pub fn configured(&self) -> Vec<&PathBuf> {
        [
            self.thesaurus_path.as_ref(),
            self.sense_vectors_path.as_ref(),
            self.stopwords_path.as_ref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Configured resource paths that do not exist
    pub fn missing(&self) -> Vec<PathBuf> {
        self.configured()
            .into_iter()
            .filter(|p| !p.exists())
            .cloned()
            .collect()
    }
}

/// Embedding cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the embedding cache
    pub enabled: bool,

    /// Maximum number of cached embeddings
    pub embedding_max_capacity: u64,

    /// Time-to-live for cached embeddings (in seconds)
    pub embedding_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 10k embeddings @ ~1.5KB each = ~15MB
            embedding_max_capacity: 10_000,
            embedding_ttl_seconds: 3600,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.generation.chunk_size, 2000);
        assert_eq!(config.generation.chunk_overlap, 200);
        assert_eq!(config.distractor.fallback_options.len(), 3);
        assert!(config.distractor.min_semantic_similarity < config.distractor.max_semantic_similarity);
    }

    #[test]
    fn test_llm_provider_parse() {
        assert_eq!(
            "openai".parse::<LlmProvider>().unwrap(),
            LlmProvider::OpenAI
        );
        assert_eq!(
            "Ollama".parse::<LlmProvider>().unwrap(),
            LlmProvider::Ollama
        );
        assert!("invalid".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_partial_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[generation]\nchunk_size = 500\n\n[distractor]\nmax_edit_similarity = 0.5\n"
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.generation.chunk_size, 500);
        assert_eq!(config.generation.chunk_overlap, 200);
        assert_eq!(config.distractor.max_edit_similarity, 0.5);
        assert_eq!(config.distractor.max_semantic_similarity, 0.85);
    }

    #[test]
    fn test_missing_config_file() {
        let result = AppConfig::from_file("/nonexistent/mcq.toml");
        assert!(matches!(result, Err(ConfigError::FileReadError { .. })));
    }

    #[test]
    fn test_missing_resources() {
        let present = tempfile::NamedTempFile::new().unwrap();
        let resources = ResourceConfig {
            thesaurus_path: Some(present.path().to_path_buf()),
            sense_vectors_path: Some(PathBuf::from("/nonexistent/senses.jsonl")),
            stopwords_path: None,
            required: true,
        };

        assert_eq!(resources.configured().len(), 2);
        assert_eq!(
            resources.missing(),
            vec![PathBuf::from("/nonexistent/senses.jsonl")]
        );
    }
}
