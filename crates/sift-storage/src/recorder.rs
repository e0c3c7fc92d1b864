//! Event recorder: the single writer of search and feedback events.
//!
//! # Search writes
//!
//! [`EventRecorder::record_search`] reserves the log identifier from the
//! store's `search_log_sequence` row, registers the write as pending, and
//! performs the insert on a background task. The reservation is a single
//! atomic `UPDATE … RETURNING`, so recorders in different processes sharing
//! one database never hand out the same identifier. The caller gets a
//! [`SearchReceipt`] without waiting for the row itself.
//!
//! # Feedback writes
//!
//! [`EventRecorder::record_feedback`] validates the rating, waits for any
//! pending write of the referenced search, then checks existence and inserts
//! inside one transaction. Feedback for an unknown search is rejected with
//! [`Error::ReferentialIntegrity`] and nothing is written.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sift_core::{Error, Result};
use sqlx::SqlitePool;
use tokio::sync::watch;

use crate::events::{to_millis, FeedbackEvent, SearchEvent};
use crate::store::{db_err, EventStore};

/// Durability state of one search write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteState {
    /// Insert not finished.
    Pending,
    /// Row committed.
    Committed,
    /// Insert failed; the row does not exist.
    Failed(String),
}

type Pending = Arc<Mutex<HashMap<i64, watch::Receiver<WriteState>>>>;

/// Handle to an in-flight search write.
#[derive(Debug, Clone)]
pub struct SearchReceipt {
    log_id: i64,
    state: watch::Receiver<WriteState>,
}

impl SearchReceipt {
    /// The allocated log identifier.
    pub fn log_id(&self) -> i64 {
        self.log_id
    }

    /// Wait until the row is durable.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write failed or was abandoned.
    pub async fn committed(mut self) -> Result<i64> {
        wait_settled(&mut self.state).await?;
        Ok(self.log_id)
    }
}

async fn wait_settled(state: &mut watch::Receiver<WriteState>) -> Result<()> {
    let settled = state
        .wait_for(|s| *s != WriteState::Pending)
        .await
        .map_err(|_| Error::storage("search event write was abandoned"))?
        .clone();
    match settled {
        WriteState::Failed(msg) => Err(Error::storage(msg)),
        _ => Ok(()),
    }
}

/// Writes search and feedback events.
#[derive(Clone)]
pub struct EventRecorder {
    pool: SqlitePool,
    pending: Pending,
}

impl EventRecorder {
    /// Create a recorder over `store`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store has not been migrated.
    pub async fn new(store: &EventStore) -> Result<Self> {
        let (last_id,): (i64,) =
            sqlx::query_as("SELECT last_id FROM search_log_sequence WHERE id = 1")
                .fetch_one(store.pool())
                .await
                .map_err(db_err)?;
        log::debug!("event recorder ready, last search log id {last_id}");

        Ok(Self {
            pool: store.pool().clone(),
            pending: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Record a search without waiting for the row write.
    ///
    /// Only the log id reservation touches the database before this returns.
    ///
    /// # Errors
    ///
    /// Returns a storage error if no log id could be reserved; nothing is
    /// written in that case.
    pub async fn record_search(&self, event: SearchEvent) -> Result<SearchReceipt> {
        let log_id = reserve_log_id(&self.pool).await?;
        let (tx, rx) = watch::channel(WriteState::Pending);
        self.lock_pending().insert(log_id, rx.clone());

        let pool = self.pool.clone();
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            let state = match insert_search(&pool, log_id, &event).await {
                Ok(()) => {
                    log::debug!("recorded search {log_id} for '{}'", event.normalized_query);
                    WriteState::Committed
                }
                Err(e) => {
                    log::error!("failed to record search {log_id}: {e}");
                    WriteState::Failed(e.to_string())
                }
            };
            // Publish before unregistering so a concurrent feedback write
            // either finds the pending entry or the committed row.
            let _ = tx.send(state);
            if let Ok(mut map) = pending.lock() {
                map.remove(&log_id);
            }
        });

        Ok(SearchReceipt { log_id, state: rx })
    }

    /// Record a rating for an existing search, returning the feedback id.
    ///
    /// # Errors
    ///
    /// - Validation: rating not ±1, rank below 1, or empty document id.
    /// - [`Error::ReferentialIntegrity`]: the search log id is unknown.
    pub async fn record_feedback(&self, event: FeedbackEvent) -> Result<i64> {
        event.validate()?;

        let pending = self.lock_pending().get(&event.search_log_id).cloned();
        if let Some(mut state) = pending
            && let Err(e) = wait_settled(&mut state).await
        {
            log::warn!(
                "rejecting feedback for search {}: its write did not commit ({e})",
                event.search_log_id
            );
            return Err(Error::ReferentialIntegrity {
                log_id: event.search_log_id,
            });
        }

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM search_events WHERE id = ?")
            .bind(event.search_log_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if exists.is_none() {
            tx.rollback().await.map_err(db_err)?;
            log::warn!(
                "rejecting feedback for unknown search log {}",
                event.search_log_id
            );
            return Err(Error::ReferentialIntegrity {
                log_id: event.search_log_id,
            });
        }

        let result = sqlx::query(
            "INSERT INTO feedback_events
                (search_log_id, query, doc_id, doc_title, mode, rating, rank_position, session_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(event.search_log_id)
        .bind(&event.query)
        .bind(&event.doc_id)
        .bind(&event.doc_title)
        .bind(event.mode.as_str())
        .bind(event.rating)
        .bind(event.rank_position)
        .bind(&event.session_id)
        .bind(to_millis(event.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| foreign_key_or_storage(e, event.search_log_id))?;

        tx.commit().await.map_err(db_err)?;
        let id = result.last_insert_rowid();
        log::debug!(
            "recorded feedback {id} ({:+}) for {} on search {}",
            event.rating,
            event.doc_id,
            event.search_log_id
        );
        Ok(id)
    }

    /// Wait for every in-flight search write to settle.
    pub async fn flush(&self) {
        let waiting: Vec<watch::Receiver<WriteState>> =
            self.lock_pending().values().cloned().collect();
        for mut state in waiting {
            let _ = state.wait_for(|s| *s != WriteState::Pending).await;
        }
    }

    /// Number of search writes not yet settled.
    pub fn pending_writes(&self) -> usize {
        self.lock_pending().len()
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<i64, watch::Receiver<WriteState>>> {
        self.pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EventRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRecorder")
            .field("pending", &self.pending_writes())
            .finish()
    }
}

/// Bump the shared sequence row and return the new id.
async fn reserve_log_id(pool: &SqlitePool) -> Result<i64> {
    let (log_id,): (i64,) = sqlx::query_as(
        "UPDATE search_log_sequence SET last_id = last_id + 1 WHERE id = 1 RETURNING last_id",
    )
    .fetch_one(pool)
    .await
    .map_err(db_err)?;
    Ok(log_id)
}

async fn insert_search(pool: &SqlitePool, log_id: i64, event: &SearchEvent) -> Result<()> {
    sqlx::query(
        "INSERT INTO search_events
            (id, query, normalized_query, corrected_query, mode, effective_mode, degraded,
             result_count, total_candidates, session_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(log_id)
    .bind(&event.query)
    .bind(&event.normalized_query)
    .bind(&event.corrected_query)
    .bind(event.mode.as_str())
    .bind(event.effective_mode.as_str())
    .bind(i64::from(event.degraded))
    .bind(event.result_count)
    .bind(event.total_candidates)
    .bind(&event.session_id)
    .bind(to_millis(event.created_at))
    .execute(pool)
    .await
    .map_err(db_err)?;
    Ok(())
}

fn foreign_key_or_storage(e: sqlx::Error, log_id: i64) -> Error {
    let is_fk = e
        .as_database_error()
        .is_some_and(|d| matches!(d.kind(), sqlx::error::ErrorKind::ForeignKeyViolation));
    if is_fk {
        Error::ReferentialIntegrity { log_id }
    } else {
        db_err(e)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::SearchMode;

    async fn recorder() -> (EventStore, EventRecorder) {
        let store = EventStore::in_memory().await.unwrap();
        let recorder = EventRecorder::new(&store).await.unwrap();
        (store, recorder)
    }

    async fn count(store: &EventStore, table: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(store.pool())
            .await
            .unwrap();
        n
    }

    // ------------------------------------------------------------------------
    // record_search
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_record_search_allocates_increasing_ids() {
        let (store, recorder) = recorder().await;
        let a = recorder
            .record_search(SearchEvent::new("a", "a", SearchMode::Lexical))
            .await
            .unwrap();
        let b = recorder
            .record_search(SearchEvent::new("b", "b", SearchMode::Vector))
            .await
            .unwrap();
        assert!(b.log_id() > a.log_id());

        assert_eq!(a.committed().await.unwrap(), 1);
        assert_eq!(b.committed().await.unwrap(), 2);
        assert_eq!(count(&store, "search_events").await, 2);
    }

    #[tokio::test]
    async fn test_recorder_resumes_after_existing_ids() {
        let (store, recorder) = recorder().await;
        recorder
            .record_search(SearchEvent::new("a", "a", SearchMode::Hybrid))
            .await
            .unwrap()
            .committed()
            .await
            .unwrap();

        let resumed = EventRecorder::new(&store).await.unwrap();
        let receipt = resumed
            .record_search(SearchEvent::new("b", "b", SearchMode::Hybrid))
            .await
            .unwrap();
        assert_eq!(receipt.log_id(), 2);
    }

    #[tokio::test]
    async fn test_flush_waits_for_all_writes() {
        let (store, recorder) = recorder().await;
        for i in 0..20 {
            let query = format!("q{i}");
            let _ = recorder
                .record_search(SearchEvent::new(&query, &query, SearchMode::Hybrid))
                .await
                .unwrap();
        }
        recorder.flush().await;
        assert_eq!(count(&store, "search_events").await, 20);
        assert_eq!(recorder.pending_writes(), 0);
    }

    #[tokio::test]
    async fn test_stored_search_fields() {
        let (store, recorder) = recorder().await;
        let event = SearchEvent::new("Electon", "electon", SearchMode::Hybrid)
            .with_corrected_query(Some("election".into()))
            .with_outcome(SearchMode::Lexical, true)
            .with_counts(4, 9)
            .with_session(Some("s-9".into()));
        let id = recorder
            .record_search(event)
            .await
            .unwrap()
            .committed()
            .await
            .unwrap();

        let row: (String, String, Option<String>, String, String, i64, i64, i64, Option<String>) =
            sqlx::query_as(
                "SELECT query, normalized_query, corrected_query, mode, effective_mode,
                        degraded, result_count, total_candidates, session_id
                 FROM search_events WHERE id = ?",
            )
            .bind(id)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(row.0, "Electon");
        assert_eq!(row.2.as_deref(), Some("election"));
        assert_eq!(row.3, "hybrid");
        assert_eq!(row.4, "lexical");
        assert_eq!(row.5, 1);
        assert_eq!((row.6, row.7), (4, 9));
        assert_eq!(row.8.as_deref(), Some("s-9"));
    }

    // ------------------------------------------------------------------------
    // record_feedback
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_feedback_for_committed_search() {
        let (store, recorder) = recorder().await;
        let log_id = recorder
            .record_search(SearchEvent::new("election", "election", SearchMode::Hybrid))
            .await
            .unwrap()
            .committed()
            .await
            .unwrap();

        let id = recorder
            .record_feedback(FeedbackEvent::new(log_id, "doc-1", 1).with_title("Results"))
            .await
            .unwrap();
        assert!(id > 0);
        assert_eq!(count(&store, "feedback_events").await, 1);
    }

    #[tokio::test]
    async fn test_feedback_immediately_after_record_search() {
        let (store, recorder) = recorder().await;
        let receipt = recorder
            .record_search(SearchEvent::new("q", "q", SearchMode::Lexical))
            .await
            .unwrap();

        // No wait on the receipt: the recorder must order the writes itself.
        recorder
            .record_feedback(FeedbackEvent::new(receipt.log_id(), "doc-1", -1))
            .await
            .unwrap();
        assert_eq!(count(&store, "feedback_events").await, 1);
    }

    #[tokio::test]
    async fn test_feedback_for_unknown_search_is_rejected() {
        let (store, recorder) = recorder().await;
        let err = recorder
            .record_feedback(FeedbackEvent::new(999_999_999, "doc-1", 1))
            .await
            .unwrap_err();
        assert!(err.is_referential_integrity());
        assert_eq!(count(&store, "feedback_events").await, 0);
    }

    #[tokio::test]
    async fn test_feedback_invalid_rating_is_rejected_without_write() {
        let (store, recorder) = recorder().await;
        let log_id = recorder
            .record_search(SearchEvent::new("q", "q", SearchMode::Lexical))
            .await
            .unwrap()
            .committed()
            .await
            .unwrap();
        let err = recorder
            .record_feedback(FeedbackEvent::new(log_id, "doc-1", 5))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(count(&store, "feedback_events").await, 0);
    }

    #[tokio::test]
    async fn test_failed_search_write_rejects_feedback() {
        let (store, recorder) = recorder().await;
        sqlx::query("DROP TABLE feedback_events")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query("DROP TABLE search_events")
            .execute(store.pool())
            .await
            .unwrap();

        let receipt = recorder
            .record_search(SearchEvent::new("q", "q", SearchMode::Lexical))
            .await
            .unwrap();
        let log_id = receipt.log_id();
        assert_eq!(receipt.committed().await.unwrap_err().kind(), "storage");

        store.migrate().await.unwrap();
        let err = recorder
            .record_feedback(FeedbackEvent::new(log_id, "doc-1", 1))
            .await
            .unwrap_err();
        assert!(err.is_referential_integrity());
    }
}
