//! Shared fixtures for the service and HTTP tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sift_api::SearchService;
use sift_core::{Error, Result, RetrievalHit, SearchSettings, Source};
use sift_fts::{LexicalBackend, LexicalDocument, SimpleLexicalBackend};
use sift_query::{HybridCombiner, QueryNormalizer, SpellCorrector};
use sift_storage::EventStore;
use sift_vector::{
    EmbeddingProvider, MockEmbeddingProvider, SimpleVectorBackend, VectorBackend, VectorDocument,
};

pub const DIMENSION: usize = 256;

pub fn corpus() -> Vec<LexicalDocument> {
    vec![
        LexicalDocument::new("a1", "Election results tonight")
            .with_excerpt("Counting finished overnight"),
        LexicalDocument::new("a2", "Weather forecast").with_excerpt("Rain expected overnight"),
        LexicalDocument::new("a3", "Healthcare policy").with_excerpt("A new pledge expected"),
    ]
}

pub fn lexical() -> Arc<SimpleLexicalBackend> {
    Arc::new(SimpleLexicalBackend::new(corpus()))
}

pub async fn vectors(embedder: &MockEmbeddingProvider) -> Arc<SimpleVectorBackend> {
    let docs: Vec<VectorDocument> = corpus()
        .iter()
        .map(|d| VectorDocument::new(d.id.clone(), d.embedding_text()))
        .collect();
    Arc::new(SimpleVectorBackend::build(embedder, &docs, 16).await.unwrap())
}

pub fn settings(timeout: Duration) -> SearchSettings {
    SearchSettings {
        retrieval_timeout: timeout,
        ..Default::default()
    }
}

/// Build a service over `combiner` with an in-memory event store.
pub async fn service_over(combiner: HybridCombiner, timeout: Duration) -> Arc<SearchService> {
    let store = EventStore::in_memory().await.unwrap();
    let corpus = corpus();
    let service = SearchService::new(combiner, store)
        .await
        .unwrap()
        .with_settings(settings(timeout))
        .with_titles(&corpus);
    Arc::new(service)
}

/// Lexical + mock vector retrieval over the fixture corpus.
pub async fn hybrid_service() -> Arc<SearchService> {
    let embedder = MockEmbeddingProvider::new(DIMENSION);
    let vectors = vectors(&embedder).await;
    let combiner = HybridCombiner::new(lexical()).with_vector(Arc::new(embedder), vectors);
    service_over(combiner, Duration::from_secs(2)).await
}

/// Hybrid service whose lexical path is spell-corrected against the corpus.
pub async fn spell_checked_service() -> Arc<SearchService> {
    let lexical = lexical();
    let corrector = SpellCorrector::from_words(
        lexical.vocabulary().iter().map(|(w, f)| (w.clone(), *f)),
    );
    let embedder = MockEmbeddingProvider::new(DIMENSION);
    let vectors = vectors(&embedder).await;
    let combiner = HybridCombiner::new(lexical).with_vector(Arc::new(embedder), vectors);

    let store = EventStore::in_memory().await.unwrap();
    let service = SearchService::new(combiner, store)
        .await
        .unwrap()
        .with_normalizer(QueryNormalizer::new().with_spell_corrector(corrector));
    Arc::new(service)
}

// ============================================================================
// Misbehaving backends
// ============================================================================

pub struct FailingLexical;

#[async_trait]
impl LexicalBackend for FailingLexical {
    async fn search(&self, _text: &str, _limit: usize) -> Result<Vec<RetrievalHit>> {
        Err(Error::retrieval(Source::Lexical, "connection refused"))
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn document_count(&self) -> Result<usize> {
        Err(Error::retrieval(Source::Lexical, "connection refused"))
    }
}

pub struct FailingVector;

#[async_trait]
impl VectorBackend for FailingVector {
    async fn search(&self, _embedding: &[f32], _limit: usize) -> Result<Vec<RetrievalHit>> {
        Err(Error::retrieval(Source::Vector, "index offline"))
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn document_count(&self) -> Result<usize> {
        Ok(0)
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }
}

/// Answers correctly, but only after `delay`.
pub struct SlowVector {
    pub inner: Arc<SimpleVectorBackend>,
    pub delay: Duration,
}

#[async_trait]
impl VectorBackend for SlowVector {
    async fn search(&self, embedding: &[f32], limit: usize) -> Result<Vec<RetrievalHit>> {
        tokio::time::sleep(self.delay).await;
        self.inner.search(embedding, limit).await
    }

    fn name(&self) -> &str {
        "slow"
    }

    fn document_count(&self) -> Result<usize> {
        self.inner.document_count()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

/// Lexical works; the vector path never answers within `timeout`.
pub async fn slow_vector_service(timeout: Duration) -> Arc<SearchService> {
    let embedder = MockEmbeddingProvider::new(DIMENSION);
    let slow = SlowVector {
        inner: vectors(&embedder).await,
        delay: Duration::from_secs(10),
    };
    let combiner = HybridCombiner::new(lexical()).with_vector(Arc::new(embedder), Arc::new(slow));
    service_over(combiner, timeout).await
}

/// Both retrieval paths fail.
pub async fn broken_service() -> Arc<SearchService> {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbeddingProvider::new(DIMENSION));
    let combiner = HybridCombiner::new(Arc::new(FailingLexical)).with_vector(embedder, Arc::new(FailingVector));
    service_over(combiner, Duration::from_secs(2)).await
}
