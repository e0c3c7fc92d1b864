//! Lexical backend trait and in-memory BM25 implementation.
//!
//! [`LexicalBackend`] is the lexical half of the retrieval adapter: one call
//! takes query text and a limit and returns scored hits. Zero matches is an
//! empty vector, never an error; transport failures are errors.
//!
//! [`SimpleLexicalBackend`] keeps a per-field inverted index in memory and
//! scores with BM25 Okapi, summing the per-field scores multiplied by the
//! field boosts (title ×3, excerpt ×2, body ×1).

use std::collections::HashMap;

use async_trait::async_trait;
use sift_core::{Result, RetrievalHit};

use crate::document::{tokenize, LexicalDocument};

/// BM25 term-frequency saturation.
pub const BM25_K1: f32 = 1.2;
/// BM25 length normalization.
pub const BM25_B: f32 = 0.75;

/// Trait for lexical (keyword) retrieval.
#[async_trait]
pub trait LexicalBackend: Send + Sync {
    /// Score documents against `text`, returning at most `limit` hits ordered
    /// by descending score.
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<RetrievalHit>>;

    /// The backend name for diagnostics.
    fn name(&self) -> &str;

    /// Number of searchable documents.
    fn document_count(&self) -> Result<usize>;
}

// ============================================================================
// In-memory index
// ============================================================================

#[derive(Debug, Default)]
struct FieldIndex {
    boost: f32,
    /// term -> [(doc index, term frequency)]
    postings: HashMap<String, Vec<(usize, u32)>>,
    lengths: Vec<u32>,
    total_length: u64,
}

impl FieldIndex {
    fn new(boost: f32) -> Self {
        Self {
            boost,
            ..Default::default()
        }
    }

    fn add(&mut self, doc_idx: usize, text: &str) {
        let tokens = tokenize(text);
        let mut counts: HashMap<String, u32> = HashMap::new();
        for token in &tokens {
            *counts.entry(token.clone()).or_insert(0) += 1;
        }
        for (term, tf) in counts {
            self.postings.entry(term).or_default().push((doc_idx, tf));
        }
        self.lengths.push(tokens.len() as u32);
        self.total_length += tokens.len() as u64;
    }

    fn average_length(&self) -> f32 {
        if self.lengths.is_empty() {
            0.0
        } else {
            self.total_length as f32 / self.lengths.len() as f32
        }
    }

    fn accumulate(&self, term: &str, doc_count: f32, scores: &mut HashMap<usize, f32>) {
        let Some(postings) = self.postings.get(term) else {
            return;
        };
        let avgdl = self.average_length().max(1.0);
        let df = postings.len() as f32;
        let idf = ((doc_count - df + 0.5) / (df + 0.5) + 1.0).ln();

        for &(doc_idx, tf) in postings {
            let dl = self.lengths.get(doc_idx).copied().unwrap_or(0) as f32;
            let tf = tf as f32;
            let tf_norm = (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * dl / avgdl));
            *scores.entry(doc_idx).or_insert(0.0) += self.boost * idf * tf_norm;
        }
    }
}

/// In-memory BM25 lexical backend.
#[derive(Debug)]
pub struct SimpleLexicalBackend {
    ids: Vec<String>,
    fields: [FieldIndex; 3],
    vocabulary: HashMap<String, u32>,
}

impl SimpleLexicalBackend {
    /// Build an index over the given documents.
    pub fn new(documents: impl IntoIterator<Item = LexicalDocument>) -> Self {
        let mut backend = Self {
            ids: Vec::new(),
            fields: [
                FieldIndex::new(crate::document::TITLE_BOOST),
                FieldIndex::new(crate::document::EXCERPT_BOOST),
                FieldIndex::new(crate::document::BODY_BOOST),
            ],
            vocabulary: HashMap::new(),
        };
        for doc in documents {
            backend.add_document(&doc);
        }
        backend
    }

    /// Add one document to the index.
    pub fn add_document(&mut self, doc: &LexicalDocument) {
        let doc_idx = self.ids.len();
        self.ids.push(doc.id.clone());
        for (field, (text, _boost)) in self.fields.iter_mut().zip(doc.weighted_fields()) {
            field.add(doc_idx, text);
            for token in tokenize(text) {
                *self.vocabulary.entry(token).or_insert(0) += 1;
            }
        }
    }

    /// Term frequencies across the whole corpus.
    ///
    /// Feeds the query normalizer's spell corrector.
    pub fn vocabulary(&self) -> &HashMap<String, u32> {
        &self.vocabulary
    }

    fn score(&self, text: &str, limit: usize) -> Vec<RetrievalHit> {
        let mut terms = tokenize(text);
        terms.sort();
        terms.dedup();
        if terms.is_empty() || self.ids.is_empty() || limit == 0 {
            return Vec::new();
        }

        let doc_count = self.ids.len() as f32;
        let mut scores: HashMap<usize, f32> = HashMap::new();
        for term in &terms {
            for field in &self.fields {
                field.accumulate(term, doc_count, &mut scores);
            }
        }

        let mut hits: Vec<RetrievalHit> = scores
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(idx, score)| RetrievalHit::lexical(self.ids[idx].clone(), score))
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        hits.truncate(limit);
        hits
    }
}

#[async_trait]
impl LexicalBackend for SimpleLexicalBackend {
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<RetrievalHit>> {
        let hits = self.score(text, limit);
        log::debug!("simple lexical search '{text}': {} hits", hits.len());
        Ok(hits)
    }

    fn name(&self) -> &str {
        "simple-bm25"
    }

    fn document_count(&self) -> Result<usize> {
        Ok(self.ids.len())
    }
}

// ============================================================================
// Tests
// ============================================================================
