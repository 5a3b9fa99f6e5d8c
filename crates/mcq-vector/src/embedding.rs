//! Sentence embedding clients
//!
//! Keyword ranking, question scoring and distractor filtering all compare
//! phrases by the cosine of these vectors. OpenAI embeds a whole batch in one
//! request; Ollama embeds one text per request.
//!
//! Author: hephaex@gmail.com

use std::time::Duration;

use async_trait::async_trait;
use mcq_core::{Embedder, LlmConfig, LlmProvider, McqError, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Output width of well-known embedding models
const KNOWN_DIMENSIONS: [(&str, usize); 6] = [
    ("text-embedding-3-small", 1536),
    ("text-embedding-3-large", 3072),
    ("text-embedding-ada-002", 1536),
    ("nomic-embed-text", 768),
    ("mxbai-embed-large", 1024),
    ("all-minilm", 384),
];

/// Width of `model`, or `fallback` for models not in the table
pub fn model_dimension(model: &str, fallback: usize) -> usize {
    KNOWN_DIMENSIONS
        .iter()
        .find(|(name, _)| model == *name || model.starts_with(&format!("{name}:")))
        .map_or(fallback, |(_, dim)| *dim)
}

fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| McqError::EmbeddingFailure(format!("Failed to build HTTP client: {e}")))
}

/// Decode a successful response body, or turn the error body into a failure
async fn read_json<T: DeserializeOwned>(response: Response, backend: &str) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(McqError::EmbeddingFailure(format!(
            "{backend} returned {status}: {body}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| McqError::EmbeddingFailure(format!("Unreadable {backend} response: {e}")))
}

// ============================================================================
// OpenAI
// ============================================================================

/// `/v1/embeddings` client
pub struct OpenAiEmbedding {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<IndexedEmbedding>,
}

#[derive(Debug, Deserialize)]
struct IndexedEmbedding {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbedding {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            dimension: model_dimension(&model, 1536),
            model,
        }
    }

    /// Requires `OPENAI_API_KEY`
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config.openai_api_key.as_ref().ok_or_else(|| {
            McqError::MissingResource(vec!["OPENAI_API_KEY".to_string()])
        })?;

        let mut client = Self::new(api_key.clone(), config.embedding_model.clone());
        client.client = http_client(config.timeout_secs)?;
        if let Some(url) = &config.openai_base_url {
            client = client.with_base_url(url.as_str());
        }
        Ok(client)
    }

    /// Point at an Azure or other compatible endpoint
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| McqError::EmbeddingFailure("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&OpenAiEmbeddingRequest {
                input: texts,
                model: &self.model,
                encoding_format: "float",
            })
            .send()
            .await
            .map_err(|e| McqError::EmbeddingFailure(format!("Embedding request failed: {e}")))?;

        let mut result: OpenAiEmbeddingResponse = read_json(response, "OpenAI").await?;
        if result.data.len() != texts.len() {
            return Err(McqError::EmbeddingFailure(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                result.data.len()
            )));
        }

        // The API may answer out of order
        result.data.sort_by_key(|e| e.index);
        Ok(result.data.into_iter().map(|e| e.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Ollama
// ============================================================================

/// `/api/embeddings` client; batches embed one text at a time
pub struct OllamaEmbedding {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            dimension: model_dimension(&model, 768),
            model,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let mut client = Self::new(config.ollama_url.clone(), config.embedding_model.clone());
        client.client = http_client(config.timeout_secs)?;
        Ok(client)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&OllamaEmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| McqError::EmbeddingFailure(format!("Ollama request failed: {e}")))?;

        let result: OllamaEmbeddingResponse = read_json(response, "Ollama").await?;
        if result.embedding.is_empty() {
            return Err(McqError::EmbeddingFailure(format!(
                "Ollama returned an empty embedding for model {}",
                self.model
            )));
        }
        Ok(result.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Embedding client for the configured provider
pub fn create_embedding_client(config: &LlmConfig) -> Result<Box<dyn Embedder>> {
    let client: Box<dyn Embedder> = match config.provider {
        LlmProvider::OpenAI | LlmProvider::Azure => Box::new(OpenAiEmbedding::from_config(config)?),
        LlmProvider::Ollama => Box::new(OllamaEmbedding::from_config(config)?),
    };
    tracing::debug!(
        provider = ?config.provider,
        model = %config.embedding_model,
        dimension = client.dimension(),
        "Embedding client created"
    );
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_dimension() {
        assert_eq!(model_dimension("text-embedding-3-large", 1536), 3072);
        assert_eq!(model_dimension("all-minilm", 768), 384);
        assert_eq!(model_dimension("nomic-embed-text:latest", 0), 768);
        assert_eq!(model_dimension("in-house-encoder", 512), 512);
    }

    #[test]
    fn test_openai_request_body() {
        let texts = vec!["Paris".to_string(), "capital city".to_string()];
        let body = serde_json::to_value(OpenAiEmbeddingRequest {
            input: &texts,
            model: "text-embedding-3-small",
            encoding_format: "float",
        })
        .unwrap();

        assert_eq!(body["input"][1], "capital city");
        assert_eq!(body["encoding_format"], "float");
    }

    #[test]
    fn test_openai_requires_key() {
        let result = OpenAiEmbedding::from_config(&LlmConfig::default());
        assert!(matches!(result, Err(McqError::MissingResource(_))));
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let client = OpenAiEmbedding::new("key", "text-embedding-3-small")
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_factory_selects_ollama() {
        let config = LlmConfig {
            provider: LlmProvider::Ollama,
            embedding_model: "mxbai-embed-large".to_string(),
            ..Default::default()
        };
        let client = create_embedding_client(&config).unwrap();
        assert_eq!(client.dimension(), 1024);
    }

    #[tokio::test]
    async fn test_openai_empty_batch_skips_request() {
        let client = OpenAiEmbedding::new("test-key", "text-embedding-3-small")
            .with_base_url("http://127.0.0.1:9");
        let result = client.embed_batch(&[]).await.unwrap();
        assert!(result.is_empty());
    }
}
