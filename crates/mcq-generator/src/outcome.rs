//! Per-unit outcomes
//!
//! A keyword that cannot become a question is skipped, never fatal. The
//! reason is kept so a run can report what it dropped.

use serde::Serialize;

/// Why a keyword or chunk produced no question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Keyword extraction failed for the chunk
    KeywordExtractionFailed { message: String },
    /// The chunk yielded no keywords
    NoKeywords,
    /// The question was empty or under 10 characters
    QuestionTooShort,
    /// Fewer distractors than options require
    TooFewDistractors { found: usize, required: usize },
    /// The explanation could not be generated
    ExplanationUnavailable { message: String },
    /// The assembled record broke an MCQ invariant
    InvalidRecord { message: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeywordExtractionFailed { message } => {
                write!(f, "keyword extraction failed: {message}")
            }
            Self::NoKeywords => write!(f, "no keywords"),
            Self::QuestionTooShort => write!(f, "question too short"),
            Self::TooFewDistractors { found, required } => {
                write!(f, "{found} of {required} distractors")
            }
            Self::ExplanationUnavailable { message } => {
                write!(f, "explanation unavailable: {message}")
            }
            Self::InvalidRecord { message } => write!(f, "invalid record: {message}"),
        }
    }
}

/// A skipped unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipRecord {
    /// Chunk index
    pub chunk: usize,
    /// Keyword, absent for chunk-level skips
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Result of synthesizing one unit
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome<T> {
    Produced(T),
    Skipped(SkipReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_record_serializes_flat() {
        let record = SkipRecord {
            chunk: 2,
            keyword: Some("Paris".to_string()),
            reason: SkipReason::TooFewDistractors {
                found: 1,
                required: 3,
            },
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["chunk"], 2);
        assert_eq!(value["keyword"], "Paris");
        assert_eq!(value["reason"], "too_few_distractors");
        assert_eq!(value["found"], 1);
    }

    #[test]
    fn test_chunk_skip_omits_keyword() {
        let record = SkipRecord {
            chunk: 0,
            keyword: None,
            reason: SkipReason::NoKeywords,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("keyword").is_none());
        assert_eq!(record.reason.to_string(), "no keywords");
    }
}
