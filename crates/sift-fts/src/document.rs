//! Searchable document representation.
//!
//! A [`LexicalDocument`] mirrors one line of the JSONL corpus: an identifier
//! plus the three weighted text fields (title, excerpt, body).

use std::io::BufRead;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sift_core::{Error, Result};

/// Boost applied to title matches.
pub const TITLE_BOOST: f32 = 3.0;
/// Boost applied to excerpt matches.
pub const EXCERPT_BOOST: f32 = 2.0;
/// Boost applied to body matches.
pub const BODY_BOOST: f32 = 1.0;

/// A document as seen by the lexical retrieval path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LexicalDocument {
    /// Unique document identifier.
    pub id: String,

    /// Document title.
    #[serde(default)]
    pub title: String,

    /// Short summary, if any.
    #[serde(default)]
    pub excerpt: String,

    /// Full body text.
    #[serde(default, alias = "body_text")]
    pub body: String,
}

impl LexicalDocument {
    /// Create a document with only an identifier and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the excerpt.
    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = excerpt.into();
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// The text used for embedding: title, excerpt and body joined.
    pub fn embedding_text(&self) -> String {
        [self.title.as_str(), self.excerpt.as_str(), self.body.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Fields with their boosts, in scoring order.
    pub fn weighted_fields(&self) -> [(&str, f32); 3] {
        [
            (self.title.as_str(), TITLE_BOOST),
            (self.excerpt.as_str(), EXCERPT_BOOST),
            (self.body.as_str(), BODY_BOOST),
        ]
    }
}

/// Load documents from a JSONL file (one JSON object per line).
///
/// Blank lines are skipped. A malformed line fails the whole load with its
/// line number.
pub fn load_jsonl(path: &Path) -> Result<Vec<LexicalDocument>> {
    let file = std::fs::File::open(path).map_err(|e| Error::io_with_path(e, path))?;
    let reader = std::io::BufReader::new(file);

    let mut documents = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io_with_path(e, path))?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: LexicalDocument = serde_json::from_str(&line).map_err(|e| {
            Error::Serialization(format!("{}:{}: {e}", path.display(), line_no + 1))
        })?;
        documents.push(doc);
    }

    log::info!("Loaded {} documents from {}", documents.len(), path.display());
    Ok(documents)
}

/// Split text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_document_builder() {
        let doc = LexicalDocument::new("a-1", "Election Results")
            .with_excerpt("Who won")
            .with_body("The count finished overnight.");
        assert_eq!(doc.id, "a-1");
        assert_eq!(doc.excerpt, "Who won");
        assert_eq!(
            doc.embedding_text(),
            "Election Results\nWho won\nThe count finished overnight."
        );
    }

    #[test]
    fn test_embedding_text_skips_empty_fields() {
        let doc = LexicalDocument::new("a-1", "Only a title");
        assert_eq!(doc.embedding_text(), "Only a title");
    }

    #[test]
    fn test_weighted_fields_order() {
        let doc = LexicalDocument::new("a", "t").with_body("b");
        let fields = doc.weighted_fields();
        assert_eq!(fields[0], ("t", TITLE_BOOST));
        assert_eq!(fields[2], ("b", BODY_BOOST));
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Climate-change: what's NEXT?"),
            vec!["climate", "change", "what", "s", "next"]
        );
        assert!(tokenize("  ...  ").is_empty());
    }

    #[test]
    fn test_load_jsonl() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"id": "1", "title": "Healthcare policy"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"id": "2", "title": "Budget", "body_text": "Spending plans"}}"#
        )
        .unwrap();

        let docs = load_jsonl(file.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].body, "Spending plans");
    }

    #[test]
    fn test_load_jsonl_reports_bad_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"id": "1"}}"#).unwrap();
        writeln!(file, "not json").unwrap();

        let err = load_jsonl(file.path()).unwrap_err();
        assert!(err.to_string().contains(":2:"));
    }

    #[test]
    fn test_load_jsonl_missing_file() {
        let err = load_jsonl(Path::new("/nonexistent/corpus.jsonl")).unwrap_err();
        assert_eq!(err.kind(), "io");
    }
}
