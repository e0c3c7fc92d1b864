//! Domain types shared by the retrieval, ranking, and event crates.
//!
//! These types sit below every other Sift crate so that the lexical and
//! vector backends, the combiner, and the event store all speak the same
//! vocabulary for search modes and retrieval hits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ============================================================================
// Sources and modes
// ============================================================================

/// Which retrieval path produced a hit (or an error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Keyword / BM25 retrieval.
    Lexical,
    /// Nearest-neighbor retrieval over embeddings.
    Vector,
}

impl Source {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Lexical => "lexical",
            Source::Vector => "vector",
        }
    }

    /// The single-source search mode backed by this source.
    pub fn mode(&self) -> SearchMode {
        match self {
            Source::Lexical => SearchMode::Lexical,
            Source::Vector => SearchMode::Vector,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested search mode.
///
/// Accepts the historical aliases `bm25` (lexical) and `semantic` (vector)
/// when parsed or deserialized.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Keyword retrieval only.
    #[serde(alias = "bm25")]
    Lexical,
    /// Vector retrieval only.
    #[serde(alias = "semantic")]
    Vector,
    /// Both sources, min-max normalized and fused.
    #[default]
    Hybrid,
}

impl SearchMode {
    /// All modes, in a stable order.
    pub const ALL: [SearchMode; 3] = [SearchMode::Lexical, SearchMode::Vector, SearchMode::Hybrid];

    /// Stable lowercase name (also the stored representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Lexical => "lexical",
            SearchMode::Vector => "vector",
            SearchMode::Hybrid => "hybrid",
        }
    }

    /// Whether this mode issues a lexical retrieval call.
    pub fn uses_lexical(&self) -> bool {
        matches!(self, SearchMode::Lexical | SearchMode::Hybrid)
    }

    /// Whether this mode issues a vector retrieval call.
    pub fn uses_vector(&self) -> bool {
        matches!(self, SearchMode::Vector | SearchMode::Hybrid)
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" | "bm25" => Ok(SearchMode::Lexical),
            "vector" | "semantic" => Ok(SearchMode::Vector),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(Error::validation(format!(
                "unknown search mode '{other}' (expected lexical, vector, or hybrid)"
            ))),
        }
    }
}

// ============================================================================
// Retrieval hits
// ============================================================================

/// One document returned by a single retrieval call.
///
/// The `score` scale depends on the source: unbounded non-negative BM25 for
/// lexical hits, bounded similarity for vector hits. Hits are ephemeral and
/// consumed by the combiner within the same request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    /// Document identifier.
    pub doc_id: String,
    /// Raw score on the source's own scale (higher is better).
    pub score: f32,
    /// Which retrieval path produced the hit.
    pub source: Source,
}

impl RetrievalHit {
    /// Create a lexical hit.
    pub fn lexical(doc_id: impl Into<String>, score: f32) -> Self {
        Self {
            doc_id: doc_id.into(),
            score,
            source: Source::Lexical,
        }
    }

    /// Create a vector hit.
    pub fn vector(doc_id: impl Into<String>, score: f32) -> Self {
        Self {
            doc_id: doc_id.into(),
            score,
            source: Source::Vector,
        }
    }
}

// ============================================================================
// Weights
// ============================================================================

/// Per-source weights for hybrid fusion.
///
/// Weights may be given on any positive scale; [`Weights::normalized`]
/// rescales them so they sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    /// Weight of the lexical contribution.
    pub lexical: f32,
    /// Weight of the vector contribution.
    pub vector: f32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            lexical: 0.5,
            vector: 0.5,
        }
    }
}

impl Weights {
    /// Create a weight pair without validation.
    pub fn new(lexical: f32, vector: f32) -> Self {
        Self { lexical, vector }
    }

    /// Validate the pair: finite, non-negative, and not both zero.
    pub fn validate(&self) -> Result<()> {
        if !self.lexical.is_finite() || !self.vector.is_finite() {
            return Err(Error::validation("weights must be finite numbers"));
        }
        if self.lexical < 0.0 || self.vector < 0.0 {
            return Err(Error::validation("weights must be non-negative"));
        }
        if self.lexical == 0.0 && self.vector == 0.0 {
            return Err(Error::validation("at least one weight must be nonzero"));
        }
        Ok(())
    }

    /// Validate and rescale so the two weights sum to 1.0.
    pub fn normalized(&self) -> Result<Self> {
        self.validate()?;
        // Summed in f64: two finite f32 weights can overflow to infinity.
        let total = f64::from(self.lexical) + f64::from(self.vector);
        Ok(Self {
            lexical: (f64::from(self.lexical) / total) as f32,
            vector: (f64::from(self.vector) / total) as f32,
        })
    }

    /// Sum of both weights.
    pub fn sum(&self) -> f32 {
        self.lexical + self.vector
    }

    /// The weight for one source.
    pub fn for_source(&self, source: Source) -> f32 {
        match source {
            Source::Lexical => self.lexical,
            Source::Vector => self.vector,
        }
    }
}

/// Convert a caller-supplied result limit into a `usize`.
///
/// Zero and negative limits are validation errors.
pub fn validate_limit(limit: i64) -> Result<usize> {
    if limit <= 0 {
        return Err(Error::validation(format!(
            "limit must be positive, got {limit}"
        )));
    }
    usize::try_from(limit).map_err(|_| Error::validation(format!("limit {limit} is too large")))
}

// ============================================================================
// Tests
// ============================================================================
