//! Vector-backed word-sense index
//!
//! Senses are keys of the form `term|TAG` (multi-word terms joined with
//! underscores), each with a corpus frequency and a vector. The best sense of a
//! word is its most frequent key; neighbours are ranked by cosine similarity.

use mcq_core::{McqError, Result, SenseIndex};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::similarity::cosine_similarity;

/// Delimiter between the surface term and the sense tag
pub const SENSE_DELIMITER: char = '|';

/// One sense entry as stored on disk
#[derive(Debug, Clone, Deserialize)]
pub struct SenseEntry {
    pub key: String,
    #[serde(default)]
    pub freq: u64,
    pub vector: Vec<f32>,
}

impl SenseEntry {
    /// Surface term of the key, lowercased
    fn term(&self) -> String {
        sense_term(&self.key).to_lowercase()
    }
}

/// Surface form of a sense key (`new_york|GPE` -> `new_york`)
pub fn sense_term(key: &str) -> &str {
    key.split(SENSE_DELIMITER).next().unwrap_or(key)
}

/// In-memory sense index
pub struct VectorSenseIndex {
    entries: Vec<SenseEntry>,
    by_key: HashMap<String, usize>,
    by_term: HashMap<String, Vec<usize>>,
}

impl VectorSenseIndex {
    /// Build an index from entries
    pub fn from_entries(entries: Vec<SenseEntry>) -> Self {
        let mut by_key = HashMap::new();
        let mut by_term: HashMap<String, Vec<usize>> = HashMap::new();

        for (i, entry) in entries.iter().enumerate() {
            by_key.insert(entry.key.clone(), i);
            by_term.entry(entry.term()).or_default().push(i);
        }

        Self {
            entries,
            by_key,
            by_term,
        }
    }

    /// Read JSON lines; blank lines are skipped
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut entries = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: SenseEntry = serde_json::from_str(&line).map_err(|e| {
                McqError::InvalidInput(format!("sense vectors line {}: {e}", line_no + 1))
            })?;
            entries.push(entry);
        }

        tracing::debug!(senses = entries.len(), "Loaded sense vectors");
        Ok(Self::from_entries(entries))
    }

    /// Load from a JSON-lines file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(McqError::MissingResource(vec![path.display().to_string()]));
        }
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SenseIndex for VectorSenseIndex {
    fn best_sense(&self, word: &str) -> Result<Option<String>> {
        let term = word.trim().to_lowercase().replace(' ', "_");

        let best = self.by_term.get(&term).and_then(|indices| {
            indices
                .iter()
                .map(|&i| &self.entries[i])
                .fold(None::<&SenseEntry>, |best, e| match best {
                    Some(b) if b.freq >= e.freq => Some(b),
                    _ => Some(e),
                })
        });

        Ok(best.map(|e| e.key.clone()))
    }

    fn nearest(&self, sense: &str, n: usize) -> Result<Vec<(String, f32)>> {
        let Some(&idx) = self.by_key.get(sense) else {
            return Ok(Vec::new());
        };
        let query = &self.entries[idx];
        let query_term = query.term();

        let mut scored: Vec<(String, f32)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(i, e)| *i != idx && e.term() != query_term)
            .map(|(_, e)| (e.key.clone(), cosine_similarity(&query.vector, &e.vector)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(n);
        Ok(scored)
    }
}
