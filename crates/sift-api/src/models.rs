//! Request and response bodies for the search API.

use serde::{Deserialize, Serialize};
use sift_core::SearchMode;

/// A search request, as a JSON body (`POST /search`) or query string
/// (`GET /search`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Raw query text.
    #[serde(alias = "query")]
    pub q: String,
    /// `lexical`, `vector` or `hybrid` (aliases `bm25`, `semantic`).
    #[serde(default)]
    pub mode: Option<String>,
    /// Maximum number of results.
    #[serde(default)]
    pub limit: Option<i64>,
    /// Hybrid weight for the lexical source.
    #[serde(default)]
    pub lexical_weight: Option<f32>,
    /// Hybrid weight for the vector source.
    #[serde(default)]
    pub vector_weight: Option<f32>,
    /// Caller session, stored with the search event.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl SearchRequest {
    /// A request for `q` with every other field defaulted.
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Default::default()
        }
    }

    /// Request a mode by name; parsed when the request is served.
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Cap the number of results.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set both hybrid weights.
    pub fn with_weights(mut self, lexical: f32, vector: f32) -> Self {
        self.lexical_weight = Some(lexical);
        self.vector_weight = Some(vector);
        self
    }

    /// Tag the search with a client session id.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// One ranked document in a search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: String,
    /// Title from the corpus, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Fused score (hybrid) or raw score (single source).
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_score: Option<f32>,
    /// 1-based rank.
    pub rank: usize,
}

/// A ranked response plus the log id to reference in feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Identifier of the recorded search event.
    pub log_id: i64,
    pub query: String,
    pub normalized_query: String,
    /// Spell-corrected lexical query, when a correction applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_query: Option<String>,
    pub was_corrected: bool,
    pub requested_mode: SearchMode,
    pub effective_mode: SearchMode,
    /// True when one hybrid source failed and only the other was used.
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
    pub total_candidates: usize,
    pub results: Vec<SearchHit>,
}

/// A relevance rating for one document of one search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    /// Log id returned by the originating search.
    #[serde(alias = "search_log_id")]
    pub log_id: i64,
    pub doc_id: String,
    /// +1 (helpful) or -1 (not helpful).
    pub rating: i64,
    /// Rank at which the document was shown.
    #[serde(default = "default_rank_position", alias = "rank")]
    pub rank_position: i64,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub doc_title: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

fn default_rank_position() -> i64 {
    1
}

impl FeedbackRequest {
    pub fn new(log_id: i64, doc_id: impl Into<String>, rating: i64) -> Self {
        Self {
            log_id,
            doc_id: doc_id.into(),
            rating,
            rank_position: default_rank_position(),
            ..Default::default()
        }
    }
}

/// Acknowledgement of an accepted rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub feedback_id: i64,
    pub log_id: i64,
    pub accepted: bool,
}

/// Query string of `GET /analytics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsParams {
    /// Window length in days.
    #[serde(default)]
    pub days: Option<i64>,
    /// Length of the top/zero-result/helpful lists.
    #[serde(default)]
    pub top_n: Option<usize>,
    /// Length of the recent activity lists.
    #[serde(default)]
    pub recent_k: Option<usize>,
}

/// One retrieval backend in the health report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendHealth {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The vector path in the health report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHealth {
    pub backend: BackendHealth,
    pub embedder: String,
    pub dimension: usize,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// `ok` or `degraded`.
    pub status: String,
    pub lexical: BackendHealth,
    /// Absent when vector retrieval is not configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<VectorHealth>,
    pub event_store: bool,
    pub pending_writes: usize,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "ok"
    }
}
