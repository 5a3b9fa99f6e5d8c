//! MCQ Parser - Source text loading and chunking
//!
//! Turns caller input into plain text for the generation pipeline:
//! - Plain text and Markdown files
//! - Whitespace normalization
//! - Overlapping word-window chunking (see [`chunk`])
//!
//! Each parser implements the `DocumentParser` trait and produces
//! a `ParsedDocument` whose content can be chunked.

use std::path::Path;
use thiserror::Error;

pub mod chunk;

pub use chunk::{chunk_text, reconstruct_words, Chunk};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during document loading
#[derive(Error, Debug)]
pub enum ParserError {
    /// File format is not supported
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Encoding error
    #[error("Text encoding error: {0}")]
    EncodingError(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

impl From<ParserError> for mcq_core::McqError {
    fn from(err: ParserError) -> Self {
        match err {
            ParserError::IoError { source, .. } => mcq_core::McqError::Io(source),
            other => mcq_core::McqError::InvalidInput(other.to_string()),
        }
    }
}

// ============================================================================
// Parsed Document Types
// ============================================================================

/// A loaded document
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Source path
    pub file_path: String,

    /// Detected file type
    pub file_type: FileType,

    /// Full text content
    pub content: String,
}

impl ParsedDocument {
    /// Create a new parsed document
    pub fn new(file_path: impl Into<String>, file_type: FileType) -> Self {
        Self {
            file_path: file_path.into(),
            file_type,
            content: String::new(),
        }
    }

    /// Set the content
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Get total character count
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// Get approximate word count
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    /// Whether there is any non-whitespace text
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Supported file types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    PlainText,
    Markdown,
    Pdf,
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "txt" | "text" => Self::PlainText,
            "md" | "markdown" => Self::Markdown,
            "pdf" => Self::Pdf,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PlainText => "Plain Text",
            Self::Markdown => "Markdown",
            Self::Pdf => "PDF",
            Self::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

// ============================================================================
// Text Normalization
// ============================================================================

/// Collapse all whitespace runs (including newlines) into single spaces
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Parsers
// ============================================================================

/// Trait for document parsers
pub trait DocumentParser: Send + Sync {
    /// Parse a document from a file path
    fn parse(&self, path: &Path) -> Result<ParsedDocument>;

    /// File types handled by this parser
    fn supported_types(&self) -> &[FileType];

    /// Check if this parser can handle the file type
    fn can_parse(&self, file_type: FileType) -> bool {
        self.supported_types().contains(&file_type)
    }
}

/// Registry of available parsers
pub struct ParserRegistry {
    parsers: Vec<Box<dyn DocumentParser>>,
}

impl ParserRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Registry with the built-in text parser
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PlainTextParser);
        registry
    }

    /// Register a parser
    pub fn register<P: DocumentParser + 'static>(&mut self, parser: P) {
        self.parsers.push(Box::new(parser));
    }

    /// Find a parser for a file type
    pub fn find_parser(&self, file_type: FileType) -> Option<&dyn DocumentParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(file_type))
            .map(|p| p.as_ref())
    }

    /// Parse a file using the appropriate parser
    pub fn parse(&self, path: &Path) -> Result<ParsedDocument> {
        let file_type = FileType::from_path(path);

        if file_type == FileType::Unknown {
            return Err(ParserError::UnsupportedFormat(
                path.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("none")
                    .to_string(),
            ));
        }

        let parser = self
            .find_parser(file_type)
            .ok_or_else(|| ParserError::UnsupportedFormat(file_type.to_string()))?;

        parser.parse(path)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Plain text parser
pub struct PlainTextParser;

impl DocumentParser for PlainTextParser {
    fn parse(&self, path: &Path) -> Result<ParsedDocument> {
        let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        let content = String::from_utf8(bytes)
            .map_err(|e| ParserError::EncodingError(format!("{}: {e}", path.display())))?;

        Ok(ParsedDocument::new(path.display().to_string(), FileType::from_path(path))
            .with_content(content))
    }

    fn supported_types(&self) -> &[FileType] {
        &[FileType::PlainText, FileType::Markdown]
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_extension("txt"), FileType::PlainText);
        assert_eq!(FileType::from_extension("TXT"), FileType::PlainText);
        assert_eq!(FileType::from_extension("md"), FileType::Markdown);
        assert_eq!(FileType::from_extension("pdf"), FileType::Pdf);
        assert_eq!(FileType::from_extension("docx"), FileType::Unknown);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  Paris is\nthe   capital\tof France. "),
            "Paris is the capital of France."
        );
        assert_eq!(normalize_whitespace("\n\n"), "");
    }

    #[test]
    fn test_plain_text_parser() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "The Eiffel Tower is located in Paris.").unwrap();

        let doc = ParserRegistry::with_defaults().parse(file.path()).unwrap();
        assert_eq!(doc.file_type, FileType::PlainText);
        assert_eq!(doc.word_count(), 7);
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_pdf_has_no_parser() {
        let registry = ParserRegistry::with_defaults();
        let result = registry.parse(Path::new("slides.pdf"));
        assert!(matches!(result, Err(ParserError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_unknown_extension() {
        let registry = ParserRegistry::with_defaults();
        let result = registry.parse(Path::new("notes.xyz"));
        assert!(matches!(result, Err(ParserError::UnsupportedFormat(ext)) if ext == "xyz"));
    }

    #[test]
    fn test_parser_error_into_core_error() {
        let err: mcq_core::McqError = ParserError::UnsupportedFormat("pdf".to_string()).into();
        assert!(matches!(err, mcq_core::McqError::InvalidInput(_)));
    }
}
