//! Question stem generation
//!
//! The model is prompted with a randomly chosen phrasing around the sentence
//! that supports the answer. Completions that leak the answer or have an odd
//! length are rejected; the best survivor by score wins. When nothing
//! survives, a stem is drawn from per-entity-type templates.

use std::sync::Arc;

use mcq_core::{Embedder, EntityType, GenerationRequest, PhraseExtractor, SequenceGenerator};
use mcq_extractor::sentences;
use mcq_vector::cosine_similarity;
use serde::Serialize;

use crate::random::RandomSource;

const PROMPT_TEMPLATES: [&str; 5] = [
    "generate a multiple choice question: {sentence} answer: {answer}",
    "create a quiz question based on this information: {sentence} with answer: {answer}",
    "write a test question where '{answer}' is the correct answer: {sentence}",
    "formulate an exam question about: {sentence} with '{answer}' as the answer",
    "develop a question for assessment: {sentence} correct answer: {answer}",
];

const INTERROGATIVES: [&str; 7] = ["what", "who", "where", "when", "why", "how", "which"];

const PERSON_TEMPLATES: [&str; 3] = [
    "Who is {answer} described in the text?",
    "What role does {answer} play according to the passage?",
    "How is {answer} significant based on the information provided?",
];

const ORGANIZATION_TEMPLATES: [&str; 3] = [
    "What is {answer} mentioned in the passage?",
    "What function does {answer} serve according to the text?",
    "Why is {answer} important in this context?",
];

const LOCATION_TEMPLATES: [&str; 3] = [
    "Where is {answer} located according to the text?",
    "What is significant about {answer} in this passage?",
    "How is {answer} characterized in the given information?",
];

const DATE_TEMPLATES: [&str; 3] = [
    "When did events related to {answer} take place?",
    "What significance does {answer} have in the timeline described?",
    "How does {answer} relate to other events mentioned?",
];

const GENERAL_TEMPLATES: [&str; 5] = [
    "What is the significance of {answer} in the given context?",
    "Which of the following best describes {answer}?",
    "According to the passage, what is {answer}?",
    "What is true about {answer} based on the information provided?",
    "How does {answer} relate to the main concepts discussed?",
];

/// Valid stem length in characters
const MIN_QUESTION_CHARS: usize = 10;
const MAX_QUESTION_CHARS: usize = 150;

/// Where a stem came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    Model,
    Template,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedQuestion {
    pub text: String,
    pub source: QuestionSource,
}

pub struct QuestionGenerator {
    generator: Arc<dyn SequenceGenerator>,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn PhraseExtractor>,
    random: Arc<RandomSource>,
}

impl QuestionGenerator {
    pub fn new(
        generator: Arc<dyn SequenceGenerator>,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn PhraseExtractor>,
        random: Arc<RandomSource>,
    ) -> Self {
        Self {
            generator,
            embedder,
            extractor,
            random,
        }
    }

    /// A stem ending in `?` for `answer`, grounded in `context`
    pub async fn generate_question(&self, context: &str, answer: &str) -> GeneratedQuestion {
        let sentence = supporting_sentence(context, answer);
        let request = self.request(sentence, answer);

        let completions = match self.generator.generate(&request).await {
            Ok(completions) => completions,
            Err(e) => {
                tracing::warn!("Question generation failed for '{}': {}", answer, e);
                Vec::new()
            }
        };

        let valid: Vec<String> = completions
            .iter()
            .map(|c| clean_question(c))
            .filter(|q| is_valid_question(q, answer))
            .collect();

        if valid.is_empty() {
            tracing::debug!(answer, "No usable completion, using template question");
            return GeneratedQuestion {
                text: self.template_question(answer),
                source: QuestionSource::Template,
            };
        }

        let text = self.best_question(valid, sentence).await;
        GeneratedQuestion {
            text,
            source: QuestionSource::Model,
        }
    }

    fn request(&self, sentence: &str, answer: &str) -> GenerationRequest {
        let template = self
            .random
            .choose(&PROMPT_TEMPLATES)
            .copied()
            .unwrap_or(PROMPT_TEMPLATES[0]);
        let prompt = template
            .replace("{sentence}", sentence)
            .replace("{answer}", answer);

        GenerationRequest::new(prompt)
            .with_beams(self.random.range_u32(3, 5))
            .with_max_length(self.random.range_u32(32, 64))
            .with_temperature(self.random.uniform(0.7, 1.3))
            .with_num_outputs(2)
    }

    /// Highest-scoring candidate; earlier candidates win ties
    async fn best_question(&self, candidates: Vec<String>, sentence: &str) -> String {
        let sentence_embedding = match self.embedder.embed(sentence).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                tracing::debug!("Sentence embedding failed: {}", e);
                None
            }
        };

        let mut best: Option<(String, f32)> = None;
        for candidate in candidates {
            let relevance = match &sentence_embedding {
                Some(target) => match self.embedder.embed(&candidate).await {
                    Ok(embedding) => cosine_similarity(&embedding, target),
                    Err(_) => 0.0,
                },
                None => 0.0,
            };
            let score = shape_score(&candidate) + 3.0 * relevance;

            if best.as_ref().map_or(true, |(_, top)| score > *top) {
                best = Some((candidate, score));
            }
        }

        best.map(|(text, _)| text).unwrap_or_default()
    }

    fn template_question(&self, answer: &str) -> String {
        let entity_type = self
            .extractor
            .extract(answer)
            .ok()
            .and_then(|phrases| phrases.into_iter().find_map(|p| p.entity_type));

        let templates: &[&str] = match entity_type {
            Some(EntityType::Person) => &PERSON_TEMPLATES,
            Some(EntityType::Organization) => &ORGANIZATION_TEMPLATES,
            Some(EntityType::Location) => &LOCATION_TEMPLATES,
            Some(EntityType::Date) => &DATE_TEMPLATES,
            _ => &GENERAL_TEMPLATES,
        };

        self.random
            .choose(templates)
            .copied()
            .unwrap_or(GENERAL_TEMPLATES[0])
            .replace("{answer}", answer)
    }
}

/// First sentence mentioning the answer, else the whole context
pub fn supporting_sentence<'a>(context: &'a str, answer: &str) -> &'a str {
    let needle = answer.to_lowercase();
    sentences(context)
        .into_iter()
        .map(|(_, sentence)| sentence)
        .find(|sentence| sentence.to_lowercase().contains(&needle))
        .unwrap_or(context)
}

fn clean_question(raw: &str) -> String {
    let mut question = raw.replace("question:", "").trim().to_string();
    if !question.ends_with('?') {
        question.push('?');
    }
    question
}

fn is_valid_question(question: &str, answer: &str) -> bool {
    let len = question.chars().count();
    (MIN_QUESTION_CHARS..=MAX_QUESTION_CHARS).contains(&len)
        && !question.to_lowercase().contains(&answer.to_lowercase())
}

/// Score from the stem's form alone
fn shape_score(question: &str) -> f32 {
    let lower = question.to_lowercase();
    let mut score = 0.0;
    if INTERROGATIVES.iter().any(|w| lower.starts_with(w)) {
        score += 2.0;
    }
    if (20..=80).contains(&question.chars().count()) {
        score += 1.0;
    }
    score
}
