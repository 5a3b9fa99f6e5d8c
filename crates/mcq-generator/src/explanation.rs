//! Answer explanations

use std::sync::Arc;

use mcq_core::{GenerationRequest, McqError, Result, SequenceGenerator};

use crate::random::RandomSource;

const PROMPT_TEMPLATES: [&str; 3] = [
    "explain: why '{answer}' is the correct answer to the question '{question}' based on this context: {context}",
    "elaborate on why '{answer}' correctly answers '{question}' given this information: {context}",
    "justify why '{answer}' is the right response to '{question}' considering: {context}",
];

const EXPLANATION_BEAMS: u32 = 4;

pub struct ExplanationGenerator {
    generator: Arc<dyn SequenceGenerator>,
    random: Arc<RandomSource>,
}

impl ExplanationGenerator {
    pub fn new(generator: Arc<dyn SequenceGenerator>, random: Arc<RandomSource>) -> Self {
        Self { generator, random }
    }

    pub fn request(&self, context: &str, answer: &str, question: &str) -> GenerationRequest {
        let template = self
            .random
            .choose(&PROMPT_TEMPLATES)
            .copied()
            .unwrap_or(PROMPT_TEMPLATES[0]);
        let prompt = template
            .replace("{answer}", answer)
            .replace("{question}", question)
            .replace("{context}", context);

        GenerationRequest::new(prompt)
            .with_beams(EXPLANATION_BEAMS)
            .with_temperature(self.random.uniform(0.8, 1.2))
            .with_max_length(self.random.range_u32(50, 100))
    }

    /// Why `answer` answers `question`, grounded in `context`
    pub async fn explain(&self, context: &str, answer: &str, question: &str) -> Result<String> {
        let outputs = self
            .generator
            .generate(&self.request(context, answer, question))
            .await?;

        outputs
            .into_iter()
            .map(|s| s.trim().to_string())
            .find(|s| !s.is_empty())
            .ok_or_else(|| McqError::GenerationFailure("empty explanation".to_string()))
    }
}
