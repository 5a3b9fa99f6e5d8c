//! Thesaurus-backed lexical resource
//!
//! Thesaurus files are JSON objects keyed by word:
//!
//! ```json
//! { "paris": { "synonyms": ["city of light"], "hypernyms": ["national_capital"] } }
//! ```
//!
//! Multi-word entries may use underscores; lookups return them with spaces.

use std::collections::HashMap;
use std::path::Path;

use mcq_core::{LexicalResource, McqError, RelatedTerms, ResourceConfig, Result};

use crate::stopwords::StopwordSet;

/// Stopwords plus an optional thesaurus
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    stopwords: StopwordSet,
    thesaurus: HashMap<String, RelatedTerms>,
}

impl Lexicon {
    /// English stopwords, no thesaurus
    pub fn english() -> Self {
        Self::default()
    }

    /// Build from configured resource files
    pub fn from_config(config: &ResourceConfig) -> Result<Self> {
        let mut lexicon = Self::english();

        if let Some(path) = &config.thesaurus_path {
            lexicon.load_thesaurus(path)?;
        }
        if let Some(path) = &config.stopwords_path {
            lexicon.load_stopwords(path)?;
        }

        Ok(lexicon)
    }

    /// Merge a thesaurus file
    pub fn load_thesaurus(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let content = read_resource(path.as_ref())?;
        self.add_thesaurus_json(&content)
    }

    /// Merge thesaurus entries from a JSON string
    pub fn add_thesaurus_json(&mut self, content: &str) -> Result<()> {
        let entries: HashMap<String, RelatedTerms> = serde_json::from_str(content)
            .map_err(|e| McqError::InvalidInput(format!("Invalid thesaurus: {e}")))?;

        let count = entries.len();
        for (word, terms) in entries {
            self.thesaurus.insert(lookup_key(&word), normalize(terms));
        }

        tracing::debug!(entries = count, "Loaded thesaurus");
        Ok(())
    }

    /// Add stopwords from a file, one per line
    pub fn load_stopwords(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let content = read_resource(path.as_ref())?;
        self.stopwords.extend(StopwordSet::parse(&content));
        Ok(())
    }

    pub fn stopwords(&self) -> &StopwordSet {
        &self.stopwords
    }

    pub fn thesaurus_len(&self) -> usize {
        self.thesaurus.len()
    }
}

fn read_resource(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(McqError::MissingResource(vec![path.display().to_string()]));
    }
    Ok(std::fs::read_to_string(path)?)
}

fn lookup_key(word: &str) -> String {
    word.trim().to_lowercase().replace(' ', "_")
}

fn normalize(terms: RelatedTerms) -> RelatedTerms {
    let spaced = |list: Vec<String>| -> Vec<String> {
        list.into_iter()
            .map(|t| t.replace('_', " ").trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    };

    RelatedTerms {
        synonyms: spaced(terms.synonyms),
        hypernyms: spaced(terms.hypernyms),
        hyponyms: spaced(terms.hyponyms),
    }
}

impl LexicalResource for Lexicon {
    fn related_terms(&self, word: &str) -> Result<RelatedTerms> {
        Ok(self
            .thesaurus
            .get(&lookup_key(word))
            .cloned()
            .unwrap_or_default())
    }

    fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const THESAURUS: &str = r#"{
        "Paris": {
            "synonyms": ["city_of_light"],
            "hypernyms": ["national_capital", "city"],
            "hyponyms": []
        },
        "new_york": { "hypernyms": ["city"] }
    }"#;

    #[test]
    fn test_related_terms_normalized() {
        let mut lexicon = Lexicon::english();
        lexicon.add_thesaurus_json(THESAURUS).unwrap();

        let terms = lexicon.related_terms("paris").unwrap();
        assert_eq!(terms.synonyms, vec!["city of light"]);
        assert_eq!(terms.hypernyms, vec!["national capital", "city"]);
        assert!(terms.hyponyms.is_empty());

        let terms = lexicon.related_terms("New York").unwrap();
        assert_eq!(terms.hypernyms, vec!["city"]);
    }

    #[test]
    fn test_unknown_word_is_empty() {
        let lexicon = Lexicon::english();
        assert!(lexicon.related_terms("france").unwrap().is_empty());
        assert!(lexicon.is_stopword("The"));
    }

    #[test]
    fn test_invalid_thesaurus() {
        let mut lexicon = Lexicon::english();
        let result = lexicon.add_thesaurus_json("[1, 2]");
        assert!(matches!(result, Err(McqError::InvalidInput(_))));
    }

    #[test]
    fn test_from_config() {
        let mut thesaurus = tempfile::NamedTempFile::new().unwrap();
        write!(thesaurus, "{}", THESAURUS).unwrap();
        let mut stopwords = tempfile::NamedTempFile::new().unwrap();
        writeln!(stopwords, "tower").unwrap();

        let config = ResourceConfig {
            thesaurus_path: Some(thesaurus.path().to_path_buf()),
            stopwords_path: Some(stopwords.path().to_path_buf()),
            ..Default::default()
        };
        let lexicon = Lexicon::from_config(&config).unwrap();

        assert_eq!(lexicon.thesaurus_len(), 2);
        assert!(lexicon.is_stopword("Tower"));
    }

    #[test]
    fn test_missing_thesaurus() {
        let config = ResourceConfig {
            thesaurus_path: Some("/nonexistent/thesaurus.json".into()),
            ..Default::default()
        };
        let result = Lexicon::from_config(&config);
        assert!(matches!(result, Err(McqError::MissingResource(_))));
    }
}
