//! Chunk summarization

use std::sync::Arc;

use mcq_core::{GenerationRequest, McqError, Result, SequenceGenerator};

const SUMMARY_PREFIX: &str = "summarize: ";
const SUMMARY_BEAMS: u32 = 4;

pub struct Summarizer {
    generator: Arc<dyn SequenceGenerator>,
    max_length: u32,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn SequenceGenerator>, max_length: u32) -> Self {
        Self {
            generator,
            max_length,
        }
    }

    /// Output length cap: a third of the input characters, at most `max_length`
    pub fn length_for(&self, text: &str) -> u32 {
        let third = (text.chars().count() / 3).max(1);
        u32::try_from(third).unwrap_or(u32::MAX).min(self.max_length)
    }

    pub fn request(&self, text: &str) -> GenerationRequest {
        GenerationRequest::new(format!("{SUMMARY_PREFIX}{text}"))
            .with_beams(SUMMARY_BEAMS)
            .with_max_length(self.length_for(text))
    }

    /// First non-empty completion for the text
    pub async fn summarize(&self, text: &str) -> Result<String> {
        let outputs = self.generator.generate(&self.request(text)).await?;
        outputs
            .into_iter()
            .map(|s| s.trim().to_string())
            .find(|s| !s.is_empty())
            .ok_or_else(|| McqError::GenerationFailure("empty summary".to_string()))
    }
}
