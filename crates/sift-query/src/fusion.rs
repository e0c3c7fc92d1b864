//! Score normalization and fusion.
//!
//! All functions here are pure: they depend only on the hits of the current
//! response. Min-max normalization is per source and per response, so fused
//! scores are comparable within one answer and never across requests.
//!
//! # Algorithm
//!
//! ```text
//! norm(s)  = (s - min) / (max - min)      (1.0 when max == min)
//! fused(d) = w_lex * norm_lex(d) + w_vec * norm_vec(d)
//! ```
//!
//! A document missing from a source contributes 0 for that term. The result
//! is the union of both sources ranked by fused score descending, then
//! document id ascending.

use std::collections::HashMap;

use sift_core::{RetrievalHit, Source, Weights};

use crate::types::RankedResult;

/// A fused, not yet ranked, candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Document identifier.
    pub doc_id: String,
    /// Fused (or raw, single-source) score.
    pub score: f32,
    /// Raw lexical score, if present.
    pub lexical_score: Option<f32>,
    /// Raw vector score, if present.
    pub vector_score: Option<f32>,
}

/// Drop non-finite scores and keep the best score per document.
fn dedupe(hits: &[RetrievalHit]) -> HashMap<&str, f32> {
    let mut best: HashMap<&str, f32> = HashMap::with_capacity(hits.len());
    for hit in hits {
        if !hit.score.is_finite() {
            log::warn!(
                "dropping {} hit {} with non-finite score",
                hit.source,
                hit.doc_id
            );
            continue;
        }
        best.entry(hit.doc_id.as_str())
            .and_modify(|s| *s = s.max(hit.score))
            .or_insert(hit.score);
    }
    best
}

/// Min-max normalize one source's scores into [0, 1].
///
/// An empty hit list yields an empty map. If every hit has the same score,
/// every document normalizes to 1.0.
pub fn min_max_normalize(hits: &[RetrievalHit]) -> HashMap<String, f32> {
    let scores = dedupe(hits);
    let Some((min, max)) = min_max(scores.values().copied()) else {
        return HashMap::new();
    };
    let range = max - min;

    scores
        .into_iter()
        .map(|(id, score)| {
            let norm = if range <= f64::from(f32::EPSILON) {
                1.0
            } else {
                ((f64::from(score) - min) / range).clamp(0.0, 1.0)
            };
            (id.to_string(), norm as f32)
        })
        .collect()
}

/// Single-pass min/max, in f64 so wide score ranges cannot overflow.
fn min_max(scores: impl Iterator<Item = f32>) -> Option<(f64, f64)> {
    scores.fold(None, |acc, s| {
        let s = f64::from(s);
        Some(match acc {
            None => (s, s),
            Some((lo, hi)) => (lo.min(s), hi.max(s)),
        })
    })
}

/// Fuse lexical and vector hits with the given weights.
///
/// Weights are used as given; callers renormalize beforehand if they want
/// scores in [0, 1].
pub fn fuse(lexical: &[RetrievalHit], vector: &[RetrievalHit], weights: Weights) -> Vec<Candidate> {
    let lex_norm = min_max_normalize(lexical);
    let vec_norm = min_max_normalize(vector);
    let lex_raw = dedupe(lexical);
    let vec_raw = dedupe(vector);

    let mut ids: Vec<&String> = lex_norm.keys().chain(vec_norm.keys()).collect();
    ids.sort();
    ids.dedup();

    ids.into_iter()
        .map(|id| {
            let lex = lex_norm.get(id).copied().unwrap_or(0.0);
            let vec = vec_norm.get(id).copied().unwrap_or(0.0);
            Candidate {
                doc_id: id.clone(),
                score: weights.lexical * lex + weights.vector * vec,
                lexical_score: lex_raw.get(id.as_str()).copied(),
                vector_score: vec_raw.get(id.as_str()).copied(),
            }
        })
        .collect()
}

/// Candidates from one source, keeping raw scores as the ranking score.
pub fn single_source(hits: &[RetrievalHit]) -> Vec<Candidate> {
    let source = hits.first().map_or(Source::Lexical, |h| h.source);
    dedupe(hits)
        .into_iter()
        .map(|(id, score)| Candidate {
            doc_id: id.to_string(),
            score,
            lexical_score: (source == Source::Lexical).then_some(score),
            vector_score: (source == Source::Vector).then_some(score),
        })
        .collect()
}

/// Order candidates (score desc, then id asc), truncate, and assign ranks.
pub fn rank(mut candidates: Vec<Candidate>, limit: usize) -> Vec<RankedResult> {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    candidates.truncate(limit);
    candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| RankedResult {
            doc_id: c.doc_id,
            score: c.score,
            lexical_score: c.lexical_score,
            vector_score: c.vector_score,
            rank: i + 1,
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
