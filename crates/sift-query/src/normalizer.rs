//! Query normalization and effective-mode selection.
//!
//! Normalization runs in order: trim, lowercase, collapse whitespace, strip
//! characters other than alphanumerics, whitespace, `-` and `'`. A query
//! that is empty after cleaning is a validation error. When a spell
//! corrector is configured, the corrected text feeds only the lexical path;
//! vector retrieval embeds the trimmed original text.

use serde::{Deserialize, Serialize};
use sift_core::{Error, Result, SearchMode};

use crate::spelling::SpellCorrector;

/// A query ready for retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedQuery {
    /// Raw text with surrounding whitespace removed (embedded for vector search).
    pub original: String,
    /// Case-folded, whitespace-collapsed, cleaned text.
    pub normalized: String,
    /// Spell-corrected variant of `normalized`, when a correction applied.
    pub corrected: Option<String>,
}

impl NormalizedQuery {
    /// Text sent to the lexical retriever.
    pub fn lexical_text(&self) -> &str {
        self.corrected.as_deref().unwrap_or(&self.normalized)
    }

    /// Text embedded for the vector retriever.
    pub fn vector_text(&self) -> &str {
        &self.original
    }

    /// Whether spell correction changed the query.
    pub fn was_corrected(&self) -> bool {
        self.corrected.is_some()
    }
}

/// Cleans raw query text and resolves the search mode.
#[derive(Debug, Clone, Default)]
pub struct QueryNormalizer {
    corrector: Option<SpellCorrector>,
    default_mode: SearchMode,
}

impl QueryNormalizer {
    /// Create a normalizer without spell correction, defaulting to hybrid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable spell correction for the lexical path.
    pub fn with_spell_corrector(mut self, corrector: SpellCorrector) -> Self {
        self.corrector = Some(corrector);
        self
    }

    /// Mode used when a request names none.
    pub fn with_default_mode(mut self, mode: SearchMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Normalize raw query text.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the query is empty or whitespace-only,
    /// or contains nothing searchable once special characters are removed.
    pub fn normalize(&self, raw: &str) -> Result<NormalizedQuery> {
        let original = raw.trim();
        if original.is_empty() {
            return Err(Error::validation("query must not be empty"));
        }

        let normalized = clean(&collapse_whitespace(&original.to_lowercase()));
        if !normalized.chars().any(char::is_alphanumeric) {
            return Err(Error::validation(format!(
                "query '{original}' has no searchable characters"
            )));
        }

        let corrected = self.corrector.as_ref().and_then(|c| {
            let (text, changed) = c.correct(&normalized);
            changed.then_some(text)
        });

        Ok(NormalizedQuery {
            original: original.to_string(),
            normalized,
            corrected,
        })
    }

    /// Resolve the mode a search actually runs in.
    ///
    /// A hybrid request falls back to lexical when vector retrieval is not
    /// configured. An explicit vector request in that case is rejected.
    pub fn effective_mode(
        &self,
        requested: Option<SearchMode>,
        vector_available: bool,
    ) -> Result<SearchMode> {
        let mode = requested.unwrap_or(self.default_mode);
        match mode {
            SearchMode::Vector if !vector_available => Err(Error::validation(
                "vector search is not available on this deployment",
            )),
            SearchMode::Hybrid if !vector_available => {
                log::warn!("vector retrieval disabled; running hybrid request as lexical");
                Ok(SearchMode::Lexical)
            }
            other => Ok(other),
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '\'')
        .collect();
    collapse_whitespace(&kept)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // normalize
    // ------------------------------------------------------------------------

    #[test]
    fn test_normalize_folds_case_and_whitespace() {
        let q = QueryNormalizer::new().normalize("  Healthcare \t  POLICY\n").unwrap();
        assert_eq!(q.original, "Healthcare \t  POLICY");
        assert_eq!(q.normalized, "healthcare policy");
        assert_eq!(q.lexical_text(), "healthcare policy");
        assert!(!q.was_corrected());
    }

    #[test]
    fn test_normalize_strips_special_characters() {
        let q = QueryNormalizer::new()
            .normalize("What's the COVID-19 plan?! (2024)")
            .unwrap();
        assert_eq!(q.normalized, "what's the covid-19 plan 2024");
    }

    #[test]
    fn test_normalize_rejects_empty_and_whitespace() {
        let n = QueryNormalizer::new();
        assert!(n.normalize("").unwrap_err().is_validation());
        assert!(n.normalize("   \n\t").unwrap_err().is_validation());
    }

    #[test]
    fn test_normalize_rejects_punctuation_only() {
        let n = QueryNormalizer::new();
        assert!(n.normalize("?!*&").unwrap_err().is_validation());
        assert!(n.normalize("- '").unwrap_err().is_validation());
    }

    #[test]
    fn test_spell_correction_only_affects_lexical_text() {
        let n = QueryNormalizer::new()
            .with_spell_corrector(SpellCorrector::from_words([("election", 10)]));
        let q = n.normalize("Electon results").unwrap();
        assert_eq!(q.normalized, "electon results");
        assert_eq!(q.corrected.as_deref(), Some("election results"));
        assert_eq!(q.lexical_text(), "election results");
        assert_eq!(q.vector_text(), "Electon results");
        assert!(q.was_corrected());
    }

    // ------------------------------------------------------------------------
    // effective_mode
    // ------------------------------------------------------------------------

    #[test]
    fn test_effective_mode_defaults() {
        let n = QueryNormalizer::new();
        assert_eq!(n.effective_mode(None, true).unwrap(), SearchMode::Hybrid);
        let n = n.with_default_mode(SearchMode::Lexical);
        assert_eq!(n.effective_mode(None, true).unwrap(), SearchMode::Lexical);
    }

    #[test]
    fn test_effective_mode_without_vector() {
        let n = QueryNormalizer::new();
        assert_eq!(
            n.effective_mode(Some(SearchMode::Hybrid), false).unwrap(),
            SearchMode::Lexical
        );
        assert!(n
            .effective_mode(Some(SearchMode::Vector), false)
            .unwrap_err()
            .is_validation());
        assert_eq!(
            n.effective_mode(Some(SearchMode::Lexical), false).unwrap(),
            SearchMode::Lexical
        );
    }
}
