//! Search service: normalize, combine, record.
//!
//! [`SearchService`] is the single entry point shared by the HTTP handlers
//! and the CLI. A search runs the query through the normalizer, resolves
//! the effective mode, fans out through the combiner, and hands the outcome
//! to the event recorder without waiting for the write. Feedback and
//! analytics go straight to the event store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sift_core::{validate_limit, Error, Result, SearchMode, SearchSettings, Weights};
use sift_fts::LexicalDocument;
use sift_query::{HybridCombiner, QueryNormalizer};
use sift_storage::{
    Aggregator, AnalyticsReport, EventRecorder, EventStore, FeedbackEvent, SearchEvent, Window,
};

use crate::models::{
    BackendHealth, FeedbackRequest, FeedbackResponse, HealthReport, SearchHit, SearchRequest,
    SearchResponse, VectorHealth,
};

/// Defaults for analytics requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSettings {
    /// Window length when a request names none.
    pub default_days: i64,
    /// Length of ranked lists.
    pub top_n: usize,
    /// Length of recent activity lists.
    pub recent_k: usize,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            default_days: 7,
            top_n: 10,
            recent_k: 20,
        }
    }
}

/// Orchestrates one deployment's search, feedback, and analytics.
pub struct SearchService {
    normalizer: QueryNormalizer,
    combiner: HybridCombiner,
    store: EventStore,
    recorder: EventRecorder,
    aggregator: Aggregator,
    settings: SearchSettings,
    analytics: AnalyticsSettings,
    titles: HashMap<String, String>,
}

impl SearchService {
    /// Create a service over `combiner`, recording into `store`.
    pub async fn new(combiner: HybridCombiner, store: EventStore) -> Result<Self> {
        let recorder = EventRecorder::new(&store).await?;
        let aggregator = Aggregator::new(&store);
        let settings = SearchSettings::default();
        Ok(Self {
            normalizer: QueryNormalizer::new().with_default_mode(settings.default_mode),
            combiner: combiner.with_timeout(settings.retrieval_timeout),
            store,
            recorder,
            aggregator,
            settings,
            analytics: AnalyticsSettings::default(),
            titles: HashMap::new(),
        })
    }

    /// Replace the query normalizer (e.g. to enable spell correction).
    pub fn with_normalizer(mut self, normalizer: QueryNormalizer) -> Self {
        self.normalizer = normalizer.with_default_mode(self.settings.default_mode);
        self
    }

    /// Apply search settings, including the per-call retrieval timeout.
    pub fn with_settings(mut self, settings: SearchSettings) -> Self {
        self.combiner = self.combiner.with_timeout(settings.retrieval_timeout);
        self.normalizer = self.normalizer.with_default_mode(settings.default_mode);
        self.settings = settings;
        self
    }

    /// Apply analytics defaults such as the report window and list sizes.
    pub fn with_analytics_settings(mut self, analytics: AnalyticsSettings) -> Self {
        self.analytics = analytics;
        self
    }

    /// Document titles used to decorate results and default feedback titles.
    pub fn with_titles<'a>(mut self, documents: impl IntoIterator<Item = &'a LexicalDocument>) -> Self {
        self.titles = documents
            .into_iter()
            .filter(|d| !d.title.is_empty())
            .map(|d| (d.id.clone(), d.title.clone()))
            .collect();
        self
    }

    /// The active search settings.
    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// The recorder that logs searches and feedback.
    pub fn recorder(&self) -> &EventRecorder {
        &self.recorder
    }

    /// The read-only analytics view over the same store.
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Run one search and record it.
    ///
    /// The search event is written in the background; the returned log id
    /// can be used for feedback immediately.
    ///
    /// # Errors
    ///
    /// - Validation: empty query, unknown mode, bad limit or weights, vector
    ///   mode without vector retrieval.
    /// - [`Error::Retrieval`] / [`Error::RetrievalUnavailable`]: no source
    ///   could answer. Nothing is recorded in that case.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        let query = self.normalizer.normalize(&request.q)?;
        let requested_mode = match request.mode.as_deref() {
            Some(raw) => raw.parse::<SearchMode>()?,
            None => self.settings.default_mode,
        };
        let effective_mode = self
            .normalizer
            .effective_mode(Some(requested_mode), self.combiner.vector_available())?;
        let limit = self.resolve_limit(request.limit)?;
        let weights = Weights::new(
            request.lexical_weight.unwrap_or(self.settings.weights.lexical),
            request.vector_weight.unwrap_or(self.settings.weights.vector),
        );

        let combined = self
            .combiner
            .search(&query, effective_mode, weights, limit)
            .await
            .inspect_err(|e| tracing::warn!(query = %query.normalized, "search failed: {e}"))?;

        if combined.degraded {
            tracing::warn!(
                query = %query.normalized,
                reason = combined.degraded_reason.as_deref().unwrap_or_default(),
                "degraded hybrid search"
            );
        }

        let event = SearchEvent::new(&query.original, &query.normalized, requested_mode)
            .with_corrected_query(query.corrected.clone())
            .with_outcome(combined.effective_mode, combined.degraded)
            .with_counts(combined.len(), combined.total_candidates)
            .with_session(request.session_id);
        let receipt = self
            .recorder
            .record_search(event)
            .await
            .inspect_err(|e| tracing::error!(query = %query.normalized, "search log failed: {e}"))?;

        tracing::info!(
            log_id = receipt.log_id(),
            query = %query.normalized,
            mode = %combined.effective_mode,
            results = combined.len(),
            "search served"
        );

        let results = combined
            .results
            .into_iter()
            .map(|r| SearchHit {
                title: self.titles.get(&r.doc_id).cloned(),
                doc_id: r.doc_id,
                score: r.score,
                lexical_score: r.lexical_score,
                vector_score: r.vector_score,
                rank: r.rank,
            })
            .collect();

        Ok(SearchResponse {
            log_id: receipt.log_id(),
            was_corrected: query.was_corrected(),
            query: query.original,
            normalized_query: query.normalized,
            corrected_query: query.corrected,
            requested_mode,
            effective_mode: combined.effective_mode,
            degraded: combined.degraded,
            degraded_reason: combined.degraded_reason,
            total_candidates: combined.total_candidates,
            results,
        })
    }

    /// Record a rating for a previously returned document.
    ///
    /// # Errors
    ///
    /// - Validation: rating not ±1, rank below 1, empty document id, unknown mode.
    /// - [`Error::ReferentialIntegrity`]: the log id names no recorded search.
    pub async fn submit_feedback(&self, request: FeedbackRequest) -> Result<FeedbackResponse> {
        let mode = match request.mode.as_deref() {
            Some(raw) => raw.parse::<SearchMode>()?,
            None => self.settings.default_mode,
        };
        let title = request
            .doc_title
            .or_else(|| self.titles.get(&request.doc_id).cloned())
            .unwrap_or_default();

        let event = FeedbackEvent::new(request.log_id, request.doc_id, request.rating)
            .for_query(request.query.unwrap_or_default(), mode)
            .with_title(title)
            .with_rank(request.rank_position)
            .with_session(request.session_id);

        let feedback_id = self.recorder.record_feedback(event).await?;
        tracing::info!(log_id = request.log_id, feedback_id, "feedback accepted");
        Ok(FeedbackResponse {
            feedback_id,
            log_id: request.log_id,
            accepted: true,
        })
    }

    /// Every analytics rollup over the last `days` days.
    pub async fn analytics(
        &self,
        days: Option<i64>,
        top_n: Option<usize>,
        recent_k: Option<usize>,
    ) -> Result<AnalyticsReport> {
        let window = Window::ending_now(days.unwrap_or(self.analytics.default_days))?;
        self.aggregator
            .report(
                &window,
                top_n.unwrap_or(self.analytics.top_n),
                recent_k.unwrap_or(self.analytics.recent_k),
            )
            .await
    }

    /// Backend and event store status.
    pub async fn health(&self) -> HealthReport {
        let lexical_backend = self.combiner.lexical_backend();
        let lexical = backend_health(lexical_backend.name(), lexical_backend.document_count());

        let vector = self.combiner.vector_backend().map(|(embedder, backend)| VectorHealth {
            backend: backend_health(backend.name(), backend.document_count()),
            embedder: embedder.name().to_string(),
            dimension: embedder.dimension(),
        });

        let event_store = match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("event store unreachable: {e}");
                false
            }
        };

        let healthy = event_store
            && lexical.error.is_none()
            && vector.as_ref().is_none_or(|v| v.backend.error.is_none());

        HealthReport {
            status: if healthy { "ok" } else { "degraded" }.to_string(),
            lexical,
            vector,
            event_store,
            pending_writes: self.recorder.pending_writes(),
        }
    }

    /// Wait for in-flight event writes and close the store.
    pub async fn shutdown(&self) {
        self.recorder.flush().await;
        self.store.close().await;
        tracing::info!("search service shut down");
    }

    fn resolve_limit(&self, requested: Option<i64>) -> Result<usize> {
        let limit = match requested {
            Some(raw) => validate_limit(raw)?,
            None => self.settings.default_limit,
        };
        if limit > self.settings.max_limit {
            return Err(Error::validation(format!(
                "limit {limit} exceeds the maximum of {}",
                self.settings.max_limit
            )));
        }
        Ok(limit)
    }
}

fn backend_health(name: &str, count: Result<usize>) -> BackendHealth {
    match count {
        Ok(documents) => BackendHealth {
            name: name.to_string(),
            documents: Some(documents),
            error: None,
        },
        Err(e) => BackendHealth {
            name: name.to_string(),
            documents: None,
            error: Some(e.to_string()),
        },
    }
}
