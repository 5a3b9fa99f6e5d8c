//! Sequence generation clients
//!
//! OpenAI chat completions and Ollama text generation behind the
//! `SequenceGenerator` capability. Beam count has no equivalent in either API
//! and is only logged.
//!
//! Author: hephaex@gmail.com

use std::time::Duration;

use async_trait::async_trait;
use mcq_core::{GenerationRequest, LlmConfig, LlmProvider, McqError, Result, SequenceGenerator};
use reqwest::Client;
use serde::{Deserialize, Serialize};

fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| McqError::GenerationFailure(format!("Failed to build HTTP client: {e}")))
}

/// Trimmed, non-empty completions
fn clean_outputs(outputs: impl IntoIterator<Item = String>) -> Vec<String> {
    outputs
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ============================================================================
// OpenAI Client
// ============================================================================

/// OpenAI chat-completions client
pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
    n: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

impl OpenAiGenerator {
    /// Create a new OpenAI client
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
        }
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config.openai_api_key.as_ref().ok_or_else(|| {
            McqError::MissingResource(vec!["OPENAI_API_KEY".to_string()])
        })?;

        let mut client = Self::new(api_key.clone(), config.model.clone());
        client.client = http_client(config.timeout_secs)?;
        if let Some(url) = &config.openai_base_url {
            client = client.with_base_url(url.as_str());
        }
        Ok(client)
    }

    /// Set custom base URL (for Azure or compatible APIs)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(&self, request: &GenerationRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            max_tokens: request.max_length,
            temperature: request.temperature,
            n: request.num_outputs.max(1),
        }
    }
}

#[async_trait]
impl SequenceGenerator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>> {
        tracing::debug!(
            model = %self.model,
            beams = request.beams,
            outputs = request.num_outputs,
            "OpenAI generation"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(|e| McqError::GenerationFailure(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(McqError::GenerationFailure(format!("OpenAI error: {error_text}")));
        }

        let result: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| McqError::GenerationFailure(format!("Failed to parse response: {e}")))?;

        let outputs = clean_outputs(result.choices.into_iter().map(|c| c.message.content));
        if outputs.is_empty() {
            return Err(McqError::GenerationFailure("No response generated".to_string()));
        }
        Ok(outputs)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// Ollama Client
// ============================================================================

/// Ollama `/api/generate` client
///
/// Ollama returns one completion per request, so multiple outputs cost one
/// request each.
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaGenerator {
    /// Create a new Ollama client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let mut client = Self::new(config.ollama_url.clone(), config.model.clone());
        client.client = http_client(config.timeout_secs)?;
        Ok(client)
    }

    async fn generate_one(&self, request: &GenerationRequest) -> Result<String> {
        let body = OllamaRequest {
            model: self.model.clone(),
            prompt: request.prompt.clone(),
            stream: false,
            options: OllamaOptions {
                num_predict: request.max_length,
                temperature: request.temperature,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| McqError::GenerationFailure(format!("Ollama request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(McqError::GenerationFailure(format!("Ollama error: {error_text}")));
        }

        let result: OllamaResponse = response.json().await.map_err(|e| {
            McqError::GenerationFailure(format!("Failed to parse Ollama response: {e}"))
        })?;

        Ok(result.response)
    }
}

#[async_trait]
impl SequenceGenerator for OllamaGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>> {
        let mut outputs = Vec::with_capacity(request.num_outputs as usize);
        for _ in 0..request.num_outputs.max(1) {
            outputs.push(self.generate_one(request).await?);
        }

        let outputs = clean_outputs(outputs);
        if outputs.is_empty() {
            return Err(McqError::GenerationFailure("No response generated".to_string()));
        }
        Ok(outputs)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create a sequence generator from config
pub fn create_generator(config: &LlmConfig) -> Result<Box<dyn SequenceGenerator>> {
    match config.provider {
        LlmProvider::OpenAI | LlmProvider::Azure => {
            Ok(Box::new(OpenAiGenerator::from_config(config)?))
        }
        LlmProvider::Ollama => Ok(Box::new(OllamaGenerator::from_config(config)?)),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_request_shape() {
        let client = OpenAiGenerator::new("test-key", "gpt-4o-mini");
        let request = GenerationRequest::new("summarize: Paris is the capital of France.")
            .with_max_length(40)
            .with_temperature(0.9)
            .with_num_outputs(2);

        let body = serde_json::to_value(client.build_request(&request)).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 40);
        assert_eq!(body["n"], 2);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_openai_requires_key() {
        let result = OpenAiGenerator::from_config(&LlmConfig::default());
        assert!(matches!(result, Err(McqError::MissingResource(keys)) if keys == ["OPENAI_API_KEY"]));
    }

    #[test]
    fn test_config_base_url_is_used() {
        let config = LlmConfig {
            openai_api_key: Some("test-key".to_string()),
            openai_base_url: Some("https://example.openai.azure.com/v1/".to_string()),
            ..Default::default()
        };
        let client = OpenAiGenerator::from_config(&config).unwrap();
        assert_eq!(client.base_url, "https://example.openai.azure.com/v1");
    }

    #[test]
    fn test_factory_selects_ollama() {
        let config = LlmConfig {
            provider: LlmProvider::Ollama,
            model: "llama3".to_string(),
            ..Default::default()
        };
        let generator = create_generator(&config).unwrap();
        assert_eq!(generator.name(), "ollama");
    }

    #[test]
    fn test_clean_outputs() {
        let outputs = clean_outputs(vec![
            "  What is Paris? ".to_string(),
            "   ".to_string(),
            String::new(),
        ]);
        assert_eq!(outputs, vec!["What is Paris?"]);
    }
}
