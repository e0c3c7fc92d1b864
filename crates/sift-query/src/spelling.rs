//! In-process spell correction against a word-frequency dictionary.
//!
//! Each query word not already in the dictionary is replaced by the closest
//! dictionary word within Damerau–Levenshtein distance 2. Candidates tie-break
//! on higher frequency, then lexical order. Words of two characters or fewer,
//! and words containing a digit, are left alone.

use std::collections::HashMap;
use std::path::Path;

use sift_core::{Error, Result};

/// Largest edit distance accepted as a correction.
pub const MAX_EDIT_DISTANCE: usize = 2;

/// Dictionary-backed spell corrector.
#[derive(Debug, Clone, Default)]
pub struct SpellCorrector {
    frequencies: HashMap<String, u32>,
}

impl SpellCorrector {
    /// Build from `(word, frequency)` pairs. Words are lowercased and merged.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        let mut frequencies = HashMap::new();
        for (word, count) in words {
            let word = word.as_ref().trim().to_lowercase();
            if word.is_empty() {
                continue;
            }
            *frequencies.entry(word).or_insert(0) += count;
        }
        Self { frequencies }
    }

    /// Load a word list: one word per line, optionally followed by whitespace
    /// and a frequency. Blank lines and `#` comments are skipped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        let mut pairs = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };
            let count = match parts.next() {
                Some(raw) => raw.parse::<u32>().map_err(|e| {
                    Error::config(format!("{}:{}: bad frequency '{raw}': {e}", path.display(), line_no + 1))
                })?,
                None => 1,
            };
            pairs.push((word.to_string(), count));
        }
        let corrector = Self::from_words(pairs);
        log::info!(
            "Loaded {} dictionary words from {}",
            corrector.len(),
            path.display()
        );
        Ok(corrector)
    }

    /// Number of distinct dictionary words.
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Correct every eligible word in space-separated `text`.
    ///
    /// Returns the corrected text and whether anything changed.
    pub fn correct(&self, text: &str) -> (String, bool) {
        let mut changed = false;
        let words: Vec<String> = text
            .split(' ')
            .filter(|w| !w.is_empty())
            .map(|word| match self.correct_word(word) {
                Some(fixed) => {
                    log::debug!("spell correction: '{word}' -> '{fixed}'");
                    changed = true;
                    fixed
                }
                None => word.to_string(),
            })
            .collect();
        (words.join(" "), changed)
    }

    fn correct_word(&self, word: &str) -> Option<String> {
        if word.chars().count() <= 2
            || word.chars().any(char::is_numeric)
            || self.frequencies.contains_key(word)
        {
            return None;
        }

        let len = word.chars().count();
        self.frequencies
            .iter()
            .filter(|(candidate, _)| candidate.chars().count().abs_diff(len) <= MAX_EDIT_DISTANCE)
            .filter_map(|(candidate, freq)| {
                let distance = strsim::damerau_levenshtein(word, candidate);
                (distance <= MAX_EDIT_DISTANCE).then_some((distance, *freq, candidate))
            })
            .min_by(|a, b| {
                a.0.cmp(&b.0)
                    .then_with(|| b.1.cmp(&a.1))
                    .then_with(|| a.2.cmp(b.2))
            })
            .map(|(_, _, candidate)| candidate.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn corrector() -> SpellCorrector {
        SpellCorrector::from_words([
            ("election", 40),
            ("healthcare", 12),
            ("policy", 20),
            ("police", 5),
            ("climate", 9),
        ])
    }

    #[test]
    fn test_correct_single_typo() {
        let (text, changed) = corrector().correct("electon");
        assert_eq!(text, "election");
        assert!(changed);
    }

    #[test]
    fn test_correct_transposition() {
        let (text, changed) = corrector().correct("healhtcare policy");
        assert_eq!(text, "healthcare policy");
        assert!(changed);
    }

    #[test]
    fn test_known_words_unchanged() {
        let (text, changed) = corrector().correct("climate policy");
        assert_eq!(text, "climate policy");
        assert!(!changed);
    }

    #[test]
    fn test_tie_prefers_higher_frequency() {
        // "polic" is one edit from both "policy" (20) and "police" (5).
        let (text, _) = corrector().correct("polic");
        assert_eq!(text, "policy");
    }

    #[test]
    fn test_tie_on_frequency_prefers_lexical_order() {
        let corrector = SpellCorrector::from_words([("cart", 3), ("card", 3)]);
        assert_eq!(corrector.correct("carx").0, "card");
    }

    #[test]
    fn test_skips_short_and_numeric_words() {
        let c = corrector();
        assert_eq!(c.correct("xy").0, "xy");
        assert_eq!(c.correct("covid19").0, "covid19");
        assert_eq!(c.correct("2024").0, "2024");
    }

    #[test]
    fn test_corrects_hyphenated_and_apostrophe_words() {
        let c = SpellCorrector::from_words([("health-care", 4), ("o'brien", 2), ("policy", 3)]);
        assert_eq!(c.correct("helth-care").0, "health-care");
        assert_eq!(c.correct("o'brein policy").0, "o'brien policy");

        // Punctuated words with nothing close stay as typed.
        let (text, changed) = corrector().correct("don't");
        assert_eq!(text, "don't");
        assert!(!changed);
    }

    #[test]
    fn test_no_candidate_within_distance() {
        let (text, changed) = corrector().correct("zzznonexistentzzz");
        assert_eq!(text, "zzznonexistentzzz");
        assert!(!changed);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# newsroom words").unwrap();
        writeln!(file, "Budget 7").unwrap();
        writeln!(file, "senate").unwrap();
        let corrector = SpellCorrector::from_file(file.path()).unwrap();
        assert_eq!(corrector.len(), 2);
        assert_eq!(corrector.correct("budgte").0, "budget");
    }

    #[test]
    fn test_from_file_bad_frequency() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "budget many").unwrap();
        let err = SpellCorrector::from_file(file.path()).unwrap_err();
        assert_eq!(err.kind(), "config");
    }
}
