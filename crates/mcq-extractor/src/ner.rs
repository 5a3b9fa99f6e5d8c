//! Named Entity Recognition (NER) module
//!
//! Rule-based recognizer for English text:
//! - Regex patterns for dates, money, percentages and quantities
//! - A gazetteer of well-known places, organizations and languages
//! - Capitalized-span heuristics (honorifics, organization/place/event/law
//!   head words, multi-word proper names)

use std::collections::{HashMap, HashSet};

use mcq_core::EntityType;
use regex::Regex;

use crate::stopwords::ENGLISH_STOPWORDS;
use crate::tokenize::{words, Token};

/// A recognized entity span
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySpan {
    pub text: String,
    pub entity_type: EntityType,
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
}

// ============================================================================
// Word lists
// ============================================================================

const MONTHS: &str =
    "January|February|March|April|May|June|July|August|September|October|November|December";

const HONORIFICS: &[&str] = &[
    "mr", "mrs", "ms", "miss", "dr", "prof", "professor", "president", "king", "queen",
    "prince", "princess", "sir", "dame", "lord", "lady", "saint", "st", "general",
    "captain", "pope", "emperor", "senator", "governor", "chancellor", "minister",
];

/// Lowercase connectors allowed inside a capitalized span
const CONNECTORS: &[&str] = &["of", "for", "the", "de", "da", "del", "der", "van", "von", "la", "du"];

const ORG_HEADS: &[&str] = &[
    "inc", "corp", "corporation", "company", "co", "ltd", "llc", "group", "university",
    "college", "institute", "academy", "school", "association", "agency", "bank",
    "party", "council", "committee", "commission", "foundation", "ministry",
    "department", "society", "organization", "organisation", "union", "federation",
    "club", "league", "army", "navy", "court", "parliament", "congress", "senate",
];

const LOCATION_HEADS: &[&str] = &[
    "river", "mountain", "mountains", "lake", "ocean", "sea", "island", "islands",
    "city", "valley", "street", "avenue", "park", "bay", "desert", "forest", "canyon",
    "peninsula", "county", "province", "state", "tower", "bridge", "cathedral",
    "palace", "castle", "temple", "wall", "square", "airport", "station", "museum",
];

const EVENT_HEADS: &[&str] = &[
    "war", "revolution", "olympics", "games", "cup", "championship", "summit",
    "festival", "crisis", "conference", "expo", "battle", "rebellion", "massacre",
];

const LAW_HEADS: &[&str] = &[
    "act", "treaty", "amendment", "constitution", "accord", "accords", "convention",
    "charter", "code", "doctrine", "bill", "directive", "regulation",
];

const LOCATIONS: &[&str] = &[
    "africa", "antarctica", "asia", "australia", "europe", "north america",
    "south america", "afghanistan", "argentina", "austria", "belgium", "brazil",
    "canada", "chile", "china", "colombia", "cuba", "denmark", "egypt", "england",
    "ethiopia", "finland", "france", "germany", "greece", "india", "indonesia",
    "iran", "iraq", "ireland", "israel", "italy", "japan", "kenya", "mexico",
    "morocco", "netherlands", "new zealand", "nigeria", "north korea", "norway",
    "pakistan", "peru", "philippines", "poland", "portugal", "russia", "scotland",
    "saudi arabia", "south africa", "south korea", "spain", "sweden", "switzerland",
    "thailand", "turkey", "ukraine", "united kingdom", "united states", "usa", "uk",
    "vietnam", "wales", "amsterdam", "athens", "bangkok", "beijing", "berlin",
    "brussels", "buenos aires", "cairo", "chicago", "delhi", "dublin", "istanbul",
    "jerusalem", "lisbon", "london", "los angeles", "madrid", "mexico city",
    "moscow", "mumbai", "nairobi", "new delhi", "new york", "oslo", "ottawa",
    "paris", "prague", "rome", "san francisco", "seoul", "shanghai", "singapore",
    "stockholm", "sydney", "tokyo", "toronto", "vienna", "warsaw", "washington",
    "amazon", "nile", "thames", "seine", "danube", "mississippi", "himalayas",
    "alps", "sahara", "mediterranean", "atlantic", "pacific", "everest",
];

const ORGANIZATIONS: &[&str] = &[
    "un", "united nations", "nato", "nasa", "fbi", "cia", "unesco", "unicef",
    "european union", "eu", "world bank", "imf", "opec", "google", "microsoft",
    "apple", "amazon inc", "ibm", "intel", "tesla", "toyota", "samsung", "sony",
    "red cross", "world health organization", "world trade organization",
];

const LANGUAGES: &[&str] = &[
    "english", "french", "spanish", "german", "chinese", "mandarin", "japanese",
    "arabic", "russian", "portuguese", "italian", "latin", "greek", "hindi",
    "korean", "dutch", "swahili", "hebrew", "sanskrit",
];

const PRODUCTS: &[&str] = &[
    "iphone", "ipad", "macbook", "windows", "android", "linux", "playstation",
    "xbox", "kindle", "boeing 747", "model t",
];

const GAZETTEER_MAX_WORDS: usize = 3;

// ============================================================================
// Rule-based NER
// ============================================================================

/// Rule-based NER using regex patterns and a gazetteer
pub struct RuleBasedNer {
    /// Pattern rules (regex -> entity type); capture group 1 narrows the span
    patterns: Vec<(Regex, EntityType, f32)>,
    /// Lowercase phrase -> entity type
    gazetteer: HashMap<String, EntityType>,
    honorifics: HashSet<&'static str>,
}

impl RuleBasedNer {
    /// Create a recognizer with the built-in English rules
    pub fn new() -> Self {
        let mut ner = Self {
            patterns: Vec::new(),
            gazetteer: HashMap::new(),
            honorifics: HONORIFICS.iter().copied().collect(),
        };

        ner.init_patterns();
        ner.init_gazetteer();
        ner
    }

    fn init_patterns(&mut self) {
        // Dates
        self.add_pattern(r"\b\d{4}-\d{1,2}-\d{1,2}\b", EntityType::Date, 0.95);
        self.add_pattern(r"\b\d{1,2}/\d{1,2}/\d{2,4}\b", EntityType::Date, 0.95);
        self.add_pattern(
            &format!(r"\b(?:{MONTHS})\s+\d{{1,2}}(?:st|nd|rd|th)?(?:,?\s+\d{{4}})?\b"),
            EntityType::Date,
            0.95,
        );
        self.add_pattern(
            &format!(r"\b\d{{1,2}}(?:st|nd|rd|th)?\s+(?:{MONTHS})(?:,?\s+\d{{4}})?\b"),
            EntityType::Date,
            0.95,
        );
        self.add_pattern(&format!(r"\b(?:{MONTHS})\s+\d{{4}}\b"), EntityType::Date, 0.95);
        self.add_pattern(r"\b(?:1\d|20)\d{2}s\b", EntityType::Date, 0.9);
        self.add_pattern(
            r"\b\d{1,2}(?:st|nd|rd|th)\s+century\b",
            EntityType::Date,
            0.9,
        );
        self.add_pattern(
            r"(?i:\b(?:in|since|by|until|during|from|before|after|around)\s+)((?:1\d|20)\d{2})\b",
            EntityType::Date,
            0.85,
        );

        // Money
        self.add_pattern(
            r"[$€£¥]\s?\d[\d,]*(?:\.\d+)?(?:\s?(?:thousand|million|billion|trillion))?\b",
            EntityType::Money,
            0.95,
        );
        self.add_pattern(
            r"\b\d[\d,]*(?:\.\d+)?\s?(?:thousand\s|million\s|billion\s)?(?:dollars|euros|pounds|yen|yuan|rupees)\b",
            EntityType::Money,
            0.9,
        );

        // Percentages
        self.add_pattern(r"\b\d+(?:\.\d+)?(?:%|\s?percent\b|\s?per cent\b)", EntityType::Percent, 0.95);

        // Quantities
        self.add_pattern(
            r"\b\d[\d,]*(?:\.\d+)?\s?(?:km|kilometers?|kilometres?|miles?|meters?|metres?|cm|mm|kg|kilograms?|grams?|tons?|tonnes?|feet|foot|ft|inches|inch|liters?|litres?|acres?|hectares?|degrees?)\b",
            EntityType::Quantity,
            0.9,
        );
    }

    fn init_gazetteer(&mut self) {
        for (terms, entity_type) in [
            (LOCATIONS, EntityType::Location),
            (ORGANIZATIONS, EntityType::Organization),
            (LANGUAGES, EntityType::Language),
            (PRODUCTS, EntityType::Product),
        ] {
            for term in terms {
                self.add_term(term, entity_type);
            }
        }
    }

    /// Add a regex pattern
    fn add_pattern(&mut self, pattern: &str, entity_type: EntityType, confidence: f32) {
        match Regex::new(pattern) {
            Ok(regex) => self.patterns.push((regex, entity_type, confidence)),
            Err(e) => tracing::warn!(pattern, error = %e, "Skipping invalid NER pattern"),
        }
    }

    /// Add a gazetteer term
    pub fn add_term(&mut self, term: &str, entity_type: EntityType) {
        self.gazetteer.insert(term.to_lowercase(), entity_type);
    }

    /// Recognize entity spans, ordered by position and non-overlapping
    pub fn recognize(&self, text: &str) -> Vec<EntitySpan> {
        let mut entities = self.extract_by_patterns(text);
        entities.extend(self.extract_by_capitalization(text));
        self.deduplicate(entities)
    }

    /// Extract entities using pattern matching
    fn extract_by_patterns(&self, text: &str) -> Vec<EntitySpan> {
        let mut entities = Vec::new();

        for (regex, entity_type, confidence) in &self.patterns {
            for caps in regex.captures_iter(text) {
                let Some(mat) = caps.get(1).or_else(|| caps.get(0)) else {
                    continue;
                };
                entities.push(EntitySpan {
                    text: mat.as_str().to_string(),
                    entity_type: *entity_type,
                    start: mat.start(),
                    end: mat.end(),
                    confidence: *confidence,
                });
            }
        }

        entities
    }

    /// Extract capitalized spans and classify them
    fn extract_by_capitalization(&self, text: &str) -> Vec<EntitySpan> {
        let tokens = words(text);
        let mut entities = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            if !tokens[i].is_capitalized() {
                i += 1;
                continue;
            }

            let mut end = i + 1;
            let mut j = i + 1;
            while j < tokens.len() && self.joined(text, &tokens[j - 1], &tokens[j]) {
                if tokens[j].is_capitalized() {
                    j += 1;
                    end = j;
                } else if CONNECTORS.contains(&tokens[j].text.to_lowercase().as_str())
                    && j + 1 < tokens.len()
                    && tokens[j + 1].is_capitalized()
                    && self.joined(text, &tokens[j], &tokens[j + 1])
                {
                    j += 1;
                } else {
                    break;
                }
            }

            let sentence_initial = self.sentence_initial(text, &tokens, i);
            if let Some(entity) = self.classify(text, &tokens[i..end], sentence_initial) {
                entities.push(entity);
            }
            i = end;
        }

        entities
    }

    /// Two adjacent tokens belong to one span
    fn joined(&self, text: &str, prev: &Token<'_>, next: &Token<'_>) -> bool {
        let gap = &text[prev.end()..next.start];
        let trimmed = gap.trim();
        trimmed.is_empty()
            || trimmed == "-"
            || (trimmed == "." && self.is_honorific(prev.text))
    }

    fn sentence_initial(&self, text: &str, tokens: &[Token<'_>], i: usize) -> bool {
        if i == 0 {
            return text[..tokens[0].start].trim().is_empty()
                || text[..tokens[0].start].trim_end().ends_with(['.', '!', '?', '\n']);
        }
        let prev = &tokens[i - 1];
        let gap = &text[prev.end()..tokens[i].start];
        (gap.contains(['.', '!', '?']) && !self.is_honorific(prev.text)) || gap.contains("\n\n")
    }

    fn is_honorific(&self, word: &str) -> bool {
        self.honorifics.contains(word.to_lowercase().as_str())
    }

    fn classify(
        &self,
        text: &str,
        run: &[Token<'_>],
        sentence_initial: bool,
    ) -> Option<EntitySpan> {
        let mut run = run;
        let mut person_hint = false;

        if run.len() > 1 && self.is_honorific(run[0].text) {
            person_hint = true;
            run = &run[1..];
        }
        while run.len() > 1 && is_function_word(run[0].text) {
            run = &run[1..];
        }

        let first = run.first()?;
        let last = run.last()?;
        let start = first.start;
        let end = last.end();
        let surface = &text[start..end];
        let lower = surface.to_lowercase();
        // "Bank of France" is headed by "Bank"
        let head = run
            .iter()
            .position(|t| is_function_word(t.text))
            .filter(|&p| p > 0)
            .map_or(last.text, |p| run[p - 1].text)
            .to_lowercase();

        let span = |entity_type: EntityType, confidence: f32| EntitySpan {
            text: surface.to_string(),
            entity_type,
            start,
            end,
            confidence,
        };

        if run.len() <= GAZETTEER_MAX_WORDS {
            if let Some(entity_type) = self.gazetteer.get(&lower) {
                return Some(span(*entity_type, 0.95));
            }
        }

        if person_hint {
            return Some(span(EntityType::Person, 0.9));
        }

        if run.len() > 1 {
            if ORG_HEADS.contains(&head.as_str()) {
                return Some(span(EntityType::Organization, 0.85));
            }
            if LOCATION_HEADS.contains(&head.as_str())
                || first.text.eq_ignore_ascii_case("mount")
                || first.text.eq_ignore_ascii_case("lake")
            {
                return Some(span(EntityType::Location, 0.85));
            }
            if EVENT_HEADS.contains(&head.as_str()) {
                return Some(span(EntityType::Event, 0.85));
            }
            if LAW_HEADS.contains(&head.as_str()) {
                return Some(span(EntityType::Law, 0.85));
            }
            if !sentence_initial || run.len() > 2 {
                return Some(span(EntityType::Person, 0.6));
            }
        }

        // Unknown single capitalized words are left to noun-phrase extraction
        None
    }

    /// Remove overlapping entities, keeping the earliest, most confident, longest
    fn deduplicate(&self, mut entities: Vec<EntitySpan>) -> Vec<EntitySpan> {
        entities.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then(b.confidence.total_cmp(&a.confidence))
                .then((b.end - b.start).cmp(&(a.end - a.start)))
                .then_with(|| a.text.cmp(&b.text))
        });

        let mut result: Vec<EntitySpan> = Vec::new();

        for entity in entities {
            let overlaps = result
                .iter()
                .any(|kept| entity.start < kept.end && kept.start < entity.end);
            if !overlaps {
                result.push(entity);
            }
        }

        result.sort_by_key(|e| e.start);
        result
    }
}

fn is_function_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    CONNECTORS.contains(&lower.as_str()) || ENGLISH_STOPWORDS.contains(&lower.as_str())
}

impl Default for RuleBasedNer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(entities: &'a [EntitySpan], text: &str) -> Option<&'a EntitySpan> {
        entities.iter().find(|e| e.text == text)
    }

    #[test]
    fn test_gazetteer_locations() {
        let ner = RuleBasedNer::new();
        let entities =
            ner.recognize("Paris is the capital of France. The Eiffel Tower is located in Paris.");

        let paris: Vec<_> = entities.iter().filter(|e| e.text == "Paris").collect();
        assert_eq!(paris.len(), 2);
        assert!(paris.iter().all(|e| e.entity_type == EntityType::Location));
        assert_eq!(find(&entities, "France").unwrap().entity_type, EntityType::Location);
        assert_eq!(
            find(&entities, "Eiffel Tower").unwrap().entity_type,
            EntityType::Location
        );
    }

    #[test]
    fn test_patterns() {
        let ner = RuleBasedNer::new();
        let text = "On July 14, 1789 prices rose 12% and bread cost $3.50 per 2 kg loaf.";
        let entities = ner.recognize(text);

        assert_eq!(find(&entities, "July 14, 1789").unwrap().entity_type, EntityType::Date);
        assert_eq!(find(&entities, "12%").unwrap().entity_type, EntityType::Percent);
        assert_eq!(find(&entities, "$3.50").unwrap().entity_type, EntityType::Money);
        assert_eq!(find(&entities, "2 kg").unwrap().entity_type, EntityType::Quantity);
    }

    #[test]
    fn test_year_capture_group() {
        let ner = RuleBasedNer::new();
        let entities = ner.recognize("The tower was completed in 1889 for the fair.");
        let year = find(&entities, "1889").unwrap();
        assert_eq!(year.entity_type, EntityType::Date);
    }

    #[test]
    fn test_honorific_person() {
        let ner = RuleBasedNer::new();
        let entities = ner.recognize("The theory was proposed by Dr. Albert Einstein in Berlin.");

        let person = find(&entities, "Albert Einstein").unwrap();
        assert_eq!(person.entity_type, EntityType::Person);
        assert_eq!(find(&entities, "Berlin").unwrap().entity_type, EntityType::Location);
    }

    #[test]
    fn test_head_words() {
        let ner = RuleBasedNer::new();
        let entities = ner.recognize(
            "After the French Revolution, the Bank of France and the Treaty of Paris shaped Europe.",
        );

        assert_eq!(
            find(&entities, "French Revolution").unwrap().entity_type,
            EntityType::Event
        );
        assert_eq!(
            find(&entities, "Bank of France").unwrap().entity_type,
            EntityType::Organization
        );
        assert_eq!(
            find(&entities, "Treaty of Paris").unwrap().entity_type,
            EntityType::Law
        );
    }

    #[test]
    fn test_no_overlaps() {
        let ner = RuleBasedNer::new();
        let entities = ner.recognize("In May 2020 the United Nations met in New York.");

        for pair in entities.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        assert_eq!(find(&entities, "May 2020").unwrap().entity_type, EntityType::Date);
        assert_eq!(
            find(&entities, "United Nations").unwrap().entity_type,
            EntityType::Organization
        );
    }

    #[test]
    fn test_sentence_initial_word_skipped() {
        let ner = RuleBasedNer::new();
        let entities = ner.recognize("Bread is cheap.");
        assert!(entities.is_empty());
    }
}
