//! MCQ Vector - Embeddings and similarity
//!
//! Vector-space services used for keyword ranking and distractor filtering:
//! - Embedding clients (OpenAI, Ollama)
//! - Cosine and normalized edit similarity
//! - A frequency-weighted word-sense index for nearest-neighbour distractors

pub mod embedding;
pub mod sense;
pub mod similarity;

pub use embedding::{create_embedding_client, model_dimension, OllamaEmbedding, OpenAiEmbedding};
pub use sense::{sense_term, SenseEntry, VectorSenseIndex, SENSE_DELIMITER};
pub use similarity::{cosine_similarity, NormalizedLevenshtein};
