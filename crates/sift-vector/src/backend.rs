//! Vector backend trait and in-memory cosine implementation.

use async_trait::async_trait;
use sift_core::{Error, Result, RetrievalHit};

use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::types::VectorDocument;

/// Trait for nearest-neighbor retrieval over embeddings.
///
/// Callers embed the query themselves (see [`EmbeddingProvider`]) so that
/// embedding failures and retrieval failures are reported separately.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Return at most `limit` nearest documents, most similar first.
    ///
    /// An empty vector means no document is similar enough; it is not an
    /// error.
    async fn search(&self, embedding: &[f32], limit: usize) -> Result<Vec<RetrievalHit>>;

    /// The backend name for diagnostics.
    fn name(&self) -> &str;

    /// Number of indexed documents.
    fn document_count(&self) -> Result<usize>;

    /// Dimension of stored embeddings.
    fn dimension(&self) -> usize;
}

/// Brute-force cosine similarity over embeddings held in memory.
#[derive(Debug, Default)]
pub struct SimpleVectorBackend {
    entries: Vec<(String, Vec<f32>)>,
    dimension: usize,
    min_similarity: f32,
}

impl SimpleVectorBackend {
    /// Create an empty backend for embeddings of `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            entries: Vec::new(),
            dimension,
            min_similarity: 0.0,
        }
    }

    /// Hits at or below `threshold` are dropped.
    pub fn with_min_similarity(mut self, threshold: f32) -> Self {
        self.min_similarity = threshold;
        self
    }

    /// Embed and index `documents` in batches of `batch_size`.
    pub async fn build(
        provider: &dyn EmbeddingProvider,
        documents: &[VectorDocument],
        batch_size: usize,
    ) -> Result<Self> {
        let mut backend = Self::new(provider.dimension());
        for chunk in documents.chunks(batch_size.max(1)) {
            let texts: Vec<&str> = chunk.iter().map(|d| d.text.as_str()).collect();
            let embeddings = provider.embed_batch(&texts).await?;
            if embeddings.len() != chunk.len() {
                return Err(Error::operation(format!(
                    "provider '{}' returned {} embeddings for {} documents",
                    provider.name(),
                    embeddings.len(),
                    chunk.len()
                )));
            }
            for (doc, embedding) in chunk.iter().zip(embeddings) {
                backend.insert(doc.id.clone(), embedding)?;
            }
        }
        log::info!(
            "Embedded {} documents with provider '{}'",
            backend.entries.len(),
            provider.name()
        );
        Ok(backend)
    }

    /// Add one pre-computed embedding.
    pub fn insert(&mut self, id: impl Into<String>, embedding: Vec<f32>) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(Error::validation(format!(
                "embedding dimension {} does not match backend dimension {}",
                embedding.len(),
                self.dimension
            )));
        }
        self.entries.push((id.into(), embedding));
        Ok(())
    }
}

#[async_trait]
impl VectorBackend for SimpleVectorBackend {
    async fn search(&self, embedding: &[f32], limit: usize) -> Result<Vec<RetrievalHit>> {
        if embedding.len() != self.dimension {
            return Err(Error::retrieval(
                sift_core::Source::Vector,
                format!(
                    "query dimension {} does not match index dimension {}",
                    embedding.len(),
                    self.dimension
                ),
            ));
        }

        let mut hits: Vec<RetrievalHit> = self
            .entries
            .iter()
            .map(|(id, stored)| RetrievalHit::vector(id.clone(), cosine_similarity(embedding, stored)))
            .filter(|hit| hit.score.is_finite() && hit.score > self.min_similarity)
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        hits.truncate(limit);
        log::debug!("simple vector search: {} hits", hits.len());
        Ok(hits)
    }

    fn name(&self) -> &str {
        "simple-cosine"
    }

    fn document_count(&self) -> Result<usize> {
        Ok(self.entries.len())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Tests
// ============================================================================
