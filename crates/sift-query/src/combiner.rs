//! Hybrid score combiner.
//!
//! [`HybridCombiner::search`] issues one retrieval call per source the mode
//! needs. In hybrid mode both calls run as independent tokio tasks, each
//! bounded by the retrieval timeout, and each comes back as a tagged
//! [`SourceOutcome`] instead of aborting the whole search:
//!
//! | lexical | vector | result |
//! |---------|--------|--------|
//! | ok | ok | fused union |
//! | ok | failed | lexical-only, `degraded` |
//! | failed | ok | vector-only, `degraded` |
//! | failed | failed | [`Error::RetrievalUnavailable`] |
//!
//! Dropping the search future aborts any retrieval task still running; late
//! results are discarded.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use sift_core::{Error, Result, RetrievalHit, SearchMode, Source, Weights};
use sift_fts::LexicalBackend;
use sift_vector::{EmbeddingProvider, VectorBackend};
use tokio::task::{JoinError, JoinHandle};

use crate::fusion;
use crate::normalizer::NormalizedQuery;
use crate::types::CombinedResults;

/// Default per-call retrieval timeout.
pub const DEFAULT_RETRIEVAL_TIMEOUT: Duration = Duration::from_millis(2000);

/// Result of one retrieval call, tagged with its source.
#[derive(Debug)]
pub struct SourceOutcome {
    /// Which source ran.
    pub source: Source,
    /// Hits, or the reason the call failed.
    pub result: Result<Vec<RetrievalHit>>,
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl<T> Future for AbortOnDrop<T> {
    type Output = std::result::Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

#[derive(Clone)]
struct VectorPath {
    embedder: Arc<dyn EmbeddingProvider>,
    backend: Arc<dyn VectorBackend>,
}

/// Fans out to the retrieval sources and fuses their hits.
#[derive(Clone)]
pub struct HybridCombiner {
    lexical: Arc<dyn LexicalBackend>,
    vector: Option<VectorPath>,
    timeout: Duration,
}

impl HybridCombiner {
    /// Create a combiner with only lexical retrieval.
    pub fn new(lexical: Arc<dyn LexicalBackend>) -> Self {
        Self {
            lexical,
            vector: None,
            timeout: DEFAULT_RETRIEVAL_TIMEOUT,
        }
    }

    /// Enable vector retrieval.
    pub fn with_vector(
        mut self,
        embedder: Arc<dyn EmbeddingProvider>,
        backend: Arc<dyn VectorBackend>,
    ) -> Self {
        self.vector = Some(VectorPath { embedder, backend });
        self
    }

    /// Bound each retrieval call (embedding plus nearest-neighbor search).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether vector retrieval is configured.
    pub fn vector_available(&self) -> bool {
        self.vector.is_some()
    }

    /// The lexical backend.
    pub fn lexical_backend(&self) -> &Arc<dyn LexicalBackend> {
        &self.lexical
    }

    /// The embedding provider and vector backend, when configured.
    pub fn vector_backend(&self) -> Option<(&Arc<dyn EmbeddingProvider>, &Arc<dyn VectorBackend>)> {
        self.vector.as_ref().map(|v| (&v.embedder, &v.backend))
    }

    /// Run a search and return a ranked response.
    ///
    /// # Errors
    ///
    /// - Validation: `limit` is 0, hybrid weights are invalid, or the mode
    ///   needs vector retrieval that is not configured.
    /// - [`Error::Retrieval`]: the single source of a single-mode search failed.
    /// - [`Error::RetrievalUnavailable`]: both hybrid sources failed.
    pub async fn search(
        &self,
        query: &NormalizedQuery,
        mode: SearchMode,
        weights: Weights,
        limit: usize,
    ) -> Result<CombinedResults> {
        if limit == 0 {
            return Err(Error::validation("limit must be positive, got 0"));
        }
        if mode.uses_vector() && self.vector.is_none() {
            return Err(Error::validation(format!(
                "{mode} search requires vector retrieval, which is not configured"
            )));
        }

        match mode {
            SearchMode::Lexical => {
                let outcome = self.spawn_lexical(query, limit).await;
                self.single(mode, outcome, limit)
            }
            SearchMode::Vector => {
                let outcome = self.spawn_vector(query, limit).await;
                self.single(mode, outcome, limit)
            }
            SearchMode::Hybrid => {
                let weights = weights.normalized()?;
                let lexical = self.spawn_lexical(query, limit);
                let vector = self.spawn_vector(query, limit);
                let (lexical, vector) = tokio::join!(lexical, vector);
                self.hybrid(lexical, vector, weights, limit)
            }
        }
    }

    fn single(
        &self,
        mode: SearchMode,
        outcome: SourceOutcome,
        limit: usize,
    ) -> Result<CombinedResults> {
        let hits = outcome.result?;
        let candidates = fusion::single_source(&hits);
        let total_candidates = candidates.len();
        Ok(CombinedResults {
            results: fusion::rank(candidates, limit),
            requested_mode: mode,
            effective_mode: mode,
            degraded: false,
            degraded_reason: None,
            total_candidates,
        })
    }

    fn hybrid(
        &self,
        lexical: SourceOutcome,
        vector: SourceOutcome,
        weights: Weights,
        limit: usize,
    ) -> Result<CombinedResults> {
        match (lexical, vector) {
            (
                SourceOutcome {
                    result: Ok(lex_hits),
                    ..
                },
                SourceOutcome {
                    result: Ok(vec_hits),
                    ..
                },
            ) => {
                let candidates = fusion::fuse(&lex_hits, &vec_hits, weights);
                let total_candidates = candidates.len();
                log::debug!(
                    "fused {} lexical and {} vector hits into {total_candidates} candidates",
                    lex_hits.len(),
                    vec_hits.len()
                );
                Ok(CombinedResults {
                    results: fusion::rank(candidates, limit),
                    requested_mode: SearchMode::Hybrid,
                    effective_mode: SearchMode::Hybrid,
                    degraded: false,
                    degraded_reason: None,
                    total_candidates,
                })
            }
            (
                survivor @ SourceOutcome { result: Ok(_), .. },
                SourceOutcome {
                    result: Err(failure),
                    ..
                },
            )
            | (
                SourceOutcome {
                    result: Err(failure),
                    ..
                },
                survivor @ SourceOutcome { result: Ok(_), .. },
            ) => {
                let reason = failure.to_string();
                log::warn!(
                    "degraded hybrid search, using {} only: {reason}",
                    survivor.source
                );
                let mut response = self.single(survivor.source.mode(), survivor, limit)?;
                response.requested_mode = SearchMode::Hybrid;
                response.degraded = true;
                response.degraded_reason = Some(reason);
                Ok(response)
            }
            (
                SourceOutcome {
                    result: Err(lex_err),
                    ..
                },
                SourceOutcome {
                    result: Err(vec_err),
                    ..
                },
            ) => {
                log::error!("both retrieval sources failed: {lex_err}; {vec_err}");
                Err(Error::RetrievalUnavailable {
                    lexical: lex_err.to_string(),
                    vector: vec_err.to_string(),
                })
            }
        }
    }

    async fn spawn_lexical(&self, query: &NormalizedQuery, limit: usize) -> SourceOutcome {
        let backend = Arc::clone(&self.lexical);
        let text = query.lexical_text().to_string();
        let task = async move { backend.search(&text, limit).await };
        self.run_bounded(Source::Lexical, task).await
    }

    async fn spawn_vector(&self, query: &NormalizedQuery, limit: usize) -> SourceOutcome {
        let Some(path) = self.vector.clone() else {
            return SourceOutcome {
                source: Source::Vector,
                result: Err(Error::retrieval(Source::Vector, "vector retrieval is not configured")),
            };
        };
        let text = query.vector_text().to_string();
        let task = async move {
            let embedding = path.embedder.embed(&text).await.map_err(|e| match e {
                e @ Error::Retrieval { .. } => e,
                other => Error::retrieval(Source::Vector, format!("query embedding failed: {other}")),
            })?;
            path.backend.search(&embedding, limit).await
        };
        self.run_bounded(Source::Vector, task).await
    }

    async fn run_bounded<F>(&self, source: Source, task: F) -> SourceOutcome
    where
        F: Future<Output = Result<Vec<RetrievalHit>>> + Send + 'static,
    {
        let timeout = self.timeout;
        let handle = AbortOnDrop(tokio::spawn(tokio::time::timeout(timeout, task)));

        let result = match handle.await {
            Ok(Ok(Ok(hits))) => {
                log::debug!("{source} retrieval returned {} hits", hits.len());
                Ok(hits)
            }
            Ok(Ok(Err(e @ Error::Retrieval { .. }))) => Err(e),
            Ok(Ok(Err(e))) => Err(Error::retrieval(source, e.to_string())),
            Ok(Err(_elapsed)) => Err(Error::retrieval(
                source,
                format!("timed out after {}ms", timeout.as_millis()),
            )),
            Err(join) => Err(Error::retrieval(source, format!("task failed: {join}"))),
        };
        SourceOutcome { source, result }
    }
}

impl std::fmt::Debug for HybridCombiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridCombiner")
            .field("lexical", &self.lexical.name())
            .field("vector", &self.vector.as_ref().map(|v| v.backend.name().to_string()))
            .field("timeout", &self.timeout)
            .finish()
    }
}
