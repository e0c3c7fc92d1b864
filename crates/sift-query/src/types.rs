//! Combiner output types.

use serde::{Deserialize, Serialize};
use sift_core::SearchMode;

/// One entry of a ranked response.
///
/// `score` is only comparable within the response that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// Document identifier.
    pub doc_id: String,
    /// Fused score (hybrid) or raw score (single-source).
    pub score: f32,
    /// Raw lexical score, when the lexical source returned this document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_score: Option<f32>,
    /// Raw vector score, when the vector source returned this document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_score: Option<f32>,
    /// 1-based dense rank.
    pub rank: usize,
}

/// A ranked response plus how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedResults {
    /// Ranked results, best first.
    pub results: Vec<RankedResult>,
    /// Mode the caller asked for.
    pub requested_mode: SearchMode,
    /// Mode that actually produced `results`.
    pub effective_mode: SearchMode,
    /// True when one hybrid source failed and the other's results were used.
    pub degraded: bool,
    /// Why the response is degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
    /// Distinct candidates before truncation to the limit.
    pub total_candidates: usize,
}

impl CombinedResults {
    /// Number of returned results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether no result was returned.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
