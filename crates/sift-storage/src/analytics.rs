//! Analytics aggregator: read-only rollups over a time window.
//!
//! Every query is bounded by a half-open [`Window`] `[start, end)` and each
//! rollup is computed by its own method, so they can be tested and served
//! independently. [`Aggregator::report`] bundles them all.
//!
//! Queries are grouped by *normalized* query text, so "Election" and
//! " election " count as the same query.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sift_core::{Error, Result, SearchMode};
use sqlx::SqlitePool;

use crate::events::{from_millis, to_millis, FeedbackEvent, FeedbackRecord, SearchEvent, SearchRecord};
use crate::store::{db_err, EventStore};

/// Largest accepted window, in days.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

// ============================================================================
// Window
// ============================================================================

/// A half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Inclusive lower bound.
    pub start: DateTime<Utc>,
    /// Exclusive upper bound.
    pub end: DateTime<Utc>,
}

impl Window {
    /// The `days` days ending at `now`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for zero, negative, or absurdly large `days`.
    pub fn last_days(days: i64, now: DateTime<Utc>) -> Result<Self> {
        if days <= 0 {
            return Err(Error::validation(format!(
                "window must be at least 1 day, got {days}"
            )));
        }
        if days > MAX_WINDOW_DAYS {
            return Err(Error::validation(format!(
                "window must be at most {MAX_WINDOW_DAYS} days, got {days}"
            )));
        }
        let span = Duration::try_days(days)
            .ok_or_else(|| Error::validation(format!("window of {days} days is out of range")))?;
        Ok(Self {
            start: now - span,
            end: now,
        })
    }

    /// The `days` days ending now.
    ///
    /// Stored timestamps are truncated to milliseconds, so the end is pushed
    /// one millisecond forward to include events written during the current
    /// millisecond.
    pub fn ending_now(days: i64) -> Result<Self> {
        Self::last_days(days, Utc::now() + Duration::milliseconds(1))
    }

    fn bounds(&self) -> (i64, i64) {
        (to_millis(self.start), to_millis(self.end))
    }

    /// Every UTC calendar day touched by the window, in order.
    pub fn days(&self) -> Vec<NaiveDate> {
        let first = self.start.date_naive();
        let last = (self.end - Duration::milliseconds(1)).date_naive();
        first.iter_days().take_while(|d| *d <= last).collect()
    }
}

// ============================================================================
// Output types
// ============================================================================

/// Headline numbers for a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub total_searches: i64,
    pub distinct_queries: i64,
    pub total_feedback: i64,
    pub positive_feedback: i64,
    pub negative_feedback: i64,
    /// `positive / total` feedback; 0.0 when there is no feedback.
    pub satisfaction_rate: f64,
    /// Mean returned results per search; 0.0 when there are no searches.
    pub avg_result_count: f64,
    /// Mean candidate total per search; 0.0 when there are no searches.
    pub avg_total_candidates: f64,
    pub degraded_searches: i64,
}

/// A query and how often it ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueryCount {
    pub query: String,
    pub count: i64,
}

/// Searches per requested mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeCount {
    pub mode: SearchMode,
    pub count: i64,
}

/// Searches on one UTC day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: i64,
}

/// Feedback split for one mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeFeedback {
    pub mode: SearchMode,
    pub positive: i64,
    pub negative: i64,
    pub total: i64,
}

/// Net rating of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocumentRating {
    pub doc_id: String,
    pub doc_title: String,
    pub positive: i64,
    pub negative: i64,
    /// `positive - negative`.
    pub net: i64,
    pub total: i64,
}

/// Every rollup for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub window: Window,
    pub overview: Overview,
    pub top_queries: Vec<QueryCount>,
    pub zero_result_queries: Vec<QueryCount>,
    pub mode_distribution: Vec<ModeCount>,
    pub searches_by_day: Vec<DailyCount>,
    pub feedback_by_mode: Vec<ModeFeedback>,
    pub most_helpful: Vec<DocumentRating>,
    pub least_helpful: Vec<DocumentRating>,
    pub recent_searches: Vec<SearchRecord>,
    pub recent_feedback: Vec<FeedbackRecord>,
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct SearchRow {
    id: i64,
    query: String,
    normalized_query: String,
    corrected_query: Option<String>,
    mode: String,
    effective_mode: String,
    degraded: i64,
    result_count: i64,
    total_candidates: i64,
    session_id: Option<String>,
    created_at: i64,
}

impl TryFrom<SearchRow> for SearchRecord {
    type Error = Error;

    fn try_from(row: SearchRow) -> Result<Self> {
        Ok(SearchRecord {
            id: row.id,
            event: SearchEvent {
                query: row.query,
                normalized_query: row.normalized_query,
                corrected_query: row.corrected_query,
                mode: parse_mode(&row.mode)?,
                effective_mode: parse_mode(&row.effective_mode)?,
                degraded: row.degraded != 0,
                result_count: row.result_count,
                total_candidates: row.total_candidates,
                session_id: row.session_id,
                created_at: from_millis(row.created_at)?,
            },
        })
    }
}

#[derive(sqlx::FromRow)]
struct FeedbackRow {
    id: i64,
    search_log_id: i64,
    query: String,
    doc_id: String,
    doc_title: String,
    mode: String,
    rating: i64,
    rank_position: i64,
    session_id: Option<String>,
    created_at: i64,
}

impl TryFrom<FeedbackRow> for FeedbackRecord {
    type Error = Error;

    fn try_from(row: FeedbackRow) -> Result<Self> {
        Ok(FeedbackRecord {
            id: row.id,
            event: FeedbackEvent {
                search_log_id: row.search_log_id,
                query: row.query,
                doc_id: row.doc_id,
                doc_title: row.doc_title,
                mode: parse_mode(&row.mode)?,
                rating: row.rating,
                rank_position: row.rank_position,
                session_id: row.session_id,
                created_at: from_millis(row.created_at)?,
            },
        })
    }
}

fn parse_mode(raw: &str) -> Result<SearchMode> {
    raw.parse()
        .map_err(|_| Error::storage(format!("unknown stored search mode '{raw}'")))
}

fn positive_limit(n: usize, what: &str) -> Result<i64> {
    if n == 0 {
        return Err(Error::validation(format!("{what} must be positive")));
    }
    i64::try_from(n).map_err(|_| Error::validation(format!("{what} is too large")))
}

// ============================================================================
// Aggregator
// ============================================================================

/// Read-only analytics over the event store.
#[derive(Debug, Clone)]
pub struct Aggregator {
    pool: SqlitePool,
}

impl Aggregator {
    /// Create an aggregator reading from `store`.
    pub fn new(store: &EventStore) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }

    /// Totals, satisfaction rate, and averages.
    pub async fn overview(&self, window: &Window) -> Result<Overview> {
        let (start, end) = window.bounds();

        let (total_searches, distinct_queries, avg_result_count, avg_total_candidates, degraded_searches): (
            i64,
            i64,
            Option<f64>,
            Option<f64>,
            i64,
        ) = sqlx::query_as(
            "SELECT COUNT(*),
                    COUNT(DISTINCT normalized_query),
                    AVG(result_count),
                    AVG(total_candidates),
                    COALESCE(SUM(degraded), 0)
             FROM search_events
             WHERE created_at >= ? AND created_at < ?",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let (total_feedback, positive_feedback, negative_feedback): (i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN rating > 0 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN rating < 0 THEN 1 ELSE 0 END), 0)
             FROM feedback_events
             WHERE created_at >= ? AND created_at < ?",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let satisfaction_rate = if total_feedback > 0 {
            positive_feedback as f64 / total_feedback as f64
        } else {
            0.0
        };

        Ok(Overview {
            total_searches,
            distinct_queries,
            total_feedback,
            positive_feedback,
            negative_feedback,
            satisfaction_rate,
            avg_result_count: avg_result_count.unwrap_or(0.0),
            avg_total_candidates: avg_total_candidates.unwrap_or(0.0),
            degraded_searches,
        })
    }

    /// The `n` most frequent queries; ties in lexical order.
    pub async fn top_queries(&self, window: &Window, n: usize) -> Result<Vec<QueryCount>> {
        let (start, end) = window.bounds();
        sqlx::query_as(
            "SELECT normalized_query AS query, COUNT(*) AS count
             FROM search_events
             WHERE created_at >= ? AND created_at < ?
             GROUP BY normalized_query
             ORDER BY count DESC, query ASC
             LIMIT ?",
        )
        .bind(start)
        .bind(end)
        .bind(positive_limit(n, "top query count")?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Queries whose every search in the window returned nothing.
    pub async fn zero_result_queries(&self, window: &Window, n: usize) -> Result<Vec<QueryCount>> {
        let (start, end) = window.bounds();
        sqlx::query_as(
            "SELECT normalized_query AS query, COUNT(*) AS count
             FROM search_events
             WHERE created_at >= ? AND created_at < ?
             GROUP BY normalized_query
             HAVING MAX(result_count) = 0
             ORDER BY count DESC, query ASC
             LIMIT ?",
        )
        .bind(start)
        .bind(end)
        .bind(positive_limit(n, "zero-result query count")?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    /// Searches per requested mode, one entry per mode.
    pub async fn mode_distribution(&self, window: &Window) -> Result<Vec<ModeCount>> {
        let (start, end) = window.bounds();
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT mode, COUNT(*)
             FROM search_events
             WHERE created_at >= ? AND created_at < ?
             GROUP BY mode",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut counts = SearchMode::ALL.map(|mode| ModeCount { mode, count: 0 });
        for (raw, count) in rows {
            let mode = parse_mode(&raw)?;
            if let Some(entry) = counts.iter_mut().find(|c| c.mode == mode) {
                entry.count += count;
            }
        }
        Ok(counts.to_vec())
    }

    /// Searches per UTC day, one entry for every day the window touches.
    pub async fn searches_by_day(&self, window: &Window) -> Result<Vec<DailyCount>> {
        let (start, end) = window.bounds();
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT strftime('%Y-%m-%d', created_at / 1000, 'unixepoch') AS day, COUNT(*)
             FROM search_events
             WHERE created_at >= ? AND created_at < ?
             GROUP BY day",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut series: Vec<DailyCount> = window
            .days()
            .into_iter()
            .map(|day| DailyCount { day, count: 0 })
            .collect();
        for (raw, count) in rows {
            let day = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|e| Error::storage(format!("bad day bucket '{raw}': {e}")))?;
            if let Some(entry) = series.iter_mut().find(|d| d.day == day) {
                entry.count = count;
            }
        }
        Ok(series)
    }

    /// Positive/negative feedback per mode, one entry per mode.
    pub async fn feedback_by_mode(&self, window: &Window) -> Result<Vec<ModeFeedback>> {
        let (start, end) = window.bounds();
        let rows: Vec<(String, i64, i64, i64)> = sqlx::query_as(
            "SELECT mode,
                    COALESCE(SUM(CASE WHEN rating > 0 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN rating < 0 THEN 1 ELSE 0 END), 0),
                    COUNT(*)
             FROM feedback_events
             WHERE created_at >= ? AND created_at < ?
             GROUP BY mode",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut stats = SearchMode::ALL.map(|mode| ModeFeedback {
            mode,
            positive: 0,
            negative: 0,
            total: 0,
        });
        for (raw, positive, negative, total) in rows {
            let mode = parse_mode(&raw)?;
            if let Some(entry) = stats.iter_mut().find(|s| s.mode == mode) {
                entry.positive += positive;
                entry.negative += negative;
                entry.total += total;
            }
        }
        Ok(stats.to_vec())
    }

    /// Documents with the highest net rating.
    pub async fn most_helpful(&self, window: &Window, n: usize) -> Result<Vec<DocumentRating>> {
        self.document_ratings(window, n, "net DESC, total DESC, doc_id ASC")
            .await
    }

    /// Documents with the lowest net rating.
    pub async fn least_helpful(&self, window: &Window, n: usize) -> Result<Vec<DocumentRating>> {
        self.document_ratings(window, n, "net ASC, total DESC, doc_id ASC")
            .await
    }

    async fn document_ratings(
        &self,
        window: &Window,
        n: usize,
        order_by: &'static str,
    ) -> Result<Vec<DocumentRating>> {
        let (start, end) = window.bounds();
        let sql = format!(
            "SELECT doc_id,
                    MAX(doc_title) AS doc_title,
                    SUM(CASE WHEN rating > 0 THEN 1 ELSE 0 END) AS positive,
                    SUM(CASE WHEN rating < 0 THEN 1 ELSE 0 END) AS negative,
                    SUM(rating) AS net,
                    COUNT(*) AS total
             FROM feedback_events
             WHERE created_at >= ? AND created_at < ?
             GROUP BY doc_id
             ORDER BY {order_by}
             LIMIT ?"
        );
        sqlx::query_as(&sql)
            .bind(start)
            .bind(end)
            .bind(positive_limit(n, "document count")?)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    /// The `k` latest searches, newest first.
    pub async fn recent_searches(&self, window: &Window, k: usize) -> Result<Vec<SearchRecord>> {
        let (start, end) = window.bounds();
        let rows: Vec<SearchRow> = sqlx::query_as(
            "SELECT id, query, normalized_query, corrected_query, mode, effective_mode, degraded,
                    result_count, total_candidates, session_id, created_at
             FROM search_events
             WHERE created_at >= ? AND created_at < ?
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
        )
        .bind(start)
        .bind(end)
        .bind(positive_limit(k, "recent search count")?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(SearchRecord::try_from).collect()
    }

    /// The `k` latest ratings, newest first.
    pub async fn recent_feedback(&self, window: &Window, k: usize) -> Result<Vec<FeedbackRecord>> {
        let (start, end) = window.bounds();
        let rows: Vec<FeedbackRow> = sqlx::query_as(
            "SELECT id, search_log_id, query, doc_id, doc_title, mode, rating, rank_position,
                    session_id, created_at
             FROM feedback_events
             WHERE created_at >= ? AND created_at < ?
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
        )
        .bind(start)
        .bind(end)
        .bind(positive_limit(k, "recent feedback count")?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(FeedbackRecord::try_from).collect()
    }

    /// Every rollup for `window`.
    pub async fn report(&self, window: &Window, top_n: usize, recent_k: usize) -> Result<AnalyticsReport> {
        Ok(AnalyticsReport {
            window: *window,
            overview: self.overview(window).await?,
            top_queries: self.top_queries(window, top_n).await?,
            zero_result_queries: self.zero_result_queries(window, top_n).await?,
            mode_distribution: self.mode_distribution(window).await?,
            searches_by_day: self.searches_by_day(window).await?,
            feedback_by_mode: self.feedback_by_mode(window).await?,
            most_helpful: self.most_helpful(window, top_n).await?,
            least_helpful: self.least_helpful(window, top_n).await?,
            recent_searches: self.recent_searches(window, recent_k).await?,
            recent_feedback: self.recent_feedback(window, recent_k).await?,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
