//! Search and feedback event records.
//!
//! Events are immutable once written. The `*Event` types are what callers
//! hand to the recorder; the `*Record` types are what the store returns,
//! carrying the assigned identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sift_core::{Error, Result, SearchMode};

/// One executed search, as submitted to the recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEvent {
    /// Query text as received.
    pub query: String,
    /// Normalized query text (analytics group on this).
    pub normalized_query: String,
    /// Spell-corrected text used for lexical retrieval, if any.
    pub corrected_query: Option<String>,
    /// Mode the caller asked for.
    pub mode: SearchMode,
    /// Mode that produced the results.
    pub effective_mode: SearchMode,
    /// Whether one hybrid source failed.
    pub degraded: bool,
    /// Number of results returned.
    pub result_count: i64,
    /// Distinct candidates before truncation.
    pub total_candidates: i64,
    /// Caller-supplied session identifier.
    pub session_id: Option<String>,
    /// When the search ran.
    pub created_at: DateTime<Utc>,
}

impl SearchEvent {
    /// Create an event stamped now, with matching requested/effective mode.
    pub fn new(query: impl Into<String>, normalized_query: impl Into<String>, mode: SearchMode) -> Self {
        Self {
            query: query.into(),
            normalized_query: normalized_query.into(),
            corrected_query: None,
            mode,
            effective_mode: mode,
            degraded: false,
            result_count: 0,
            total_candidates: 0,
            session_id: None,
            created_at: Utc::now(),
        }
    }

    /// Set returned and candidate counts.
    pub fn with_counts(mut self, result_count: usize, total_candidates: usize) -> Self {
        self.result_count = result_count as i64;
        self.total_candidates = total_candidates as i64;
        self
    }

    /// Record the mode that actually ran and whether it was degraded.
    pub fn with_outcome(mut self, effective_mode: SearchMode, degraded: bool) -> Self {
        self.effective_mode = effective_mode;
        self.degraded = degraded;
        self
    }

    /// Set the spell-corrected query.
    pub fn with_corrected_query(mut self, corrected: Option<String>) -> Self {
        self.corrected_query = corrected;
        self
    }

    /// Set the session identifier.
    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    /// Override the timestamp.
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A relevance rating, as submitted to the recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    /// Log identifier of the originating search.
    pub search_log_id: i64,
    /// Query text of the originating search.
    pub query: String,
    /// Rated document.
    pub doc_id: String,
    /// Title of the rated document at display time.
    pub doc_title: String,
    /// Mode the search ran in.
    pub mode: SearchMode,
    /// +1 (helpful) or -1 (not helpful).
    pub rating: i64,
    /// 1-based rank of the document when displayed.
    pub rank_position: i64,
    /// Caller-supplied session identifier.
    pub session_id: Option<String>,
    /// When the rating was given.
    pub created_at: DateTime<Utc>,
}

impl FeedbackEvent {
    /// Create a rating stamped now.
    pub fn new(search_log_id: i64, doc_id: impl Into<String>, rating: i64) -> Self {
        Self {
            search_log_id,
            query: String::new(),
            doc_id: doc_id.into(),
            doc_title: String::new(),
            mode: SearchMode::Hybrid,
            rating,
            rank_position: 1,
            session_id: None,
            created_at: Utc::now(),
        }
    }

    /// Set the query text and mode of the originating search.
    pub fn for_query(mut self, query: impl Into<String>, mode: SearchMode) -> Self {
        self.query = query.into();
        self.mode = mode;
        self
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.doc_title = title.into();
        self
    }

    /// Set the displayed rank.
    pub fn with_rank(mut self, rank_position: i64) -> Self {
        self.rank_position = rank_position;
        self
    }

    /// Set the session identifier.
    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    /// Override the timestamp.
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Check rating and rank before anything is written.
    pub fn validate(&self) -> Result<()> {
        if self.rating != 1 && self.rating != -1 {
            return Err(Error::validation(format!(
                "rating must be 1 or -1, got {}",
                self.rating
            )));
        }
        if self.rank_position < 1 {
            return Err(Error::validation(format!(
                "rank position must be at least 1, got {}",
                self.rank_position
            )));
        }
        if self.doc_id.trim().is_empty() {
            return Err(Error::validation("document id must not be empty"));
        }
        Ok(())
    }
}

/// A stored search event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    /// Assigned log identifier.
    pub id: i64,
    #[serde(flatten)]
    pub event: SearchEvent,
}

/// A stored feedback event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Assigned feedback identifier.
    pub id: i64,
    #[serde(flatten)]
    pub event: FeedbackEvent,
}

/// Milliseconds since the epoch, as stored.
pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Inverse of [`to_millis`].
pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| Error::storage(format!("stored timestamp {ms} is out of range")))
}
