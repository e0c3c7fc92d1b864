//! SQLite-backed durable event store.
//!
//! The store owns the connection pool and the schema. The recorder is its
//! only writer; the aggregator only reads.

use std::str::FromStr;
use std::time::Duration;

use sift_core::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Schema statements, applied in order by [`EventStore::migrate`].
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS search_events (
        id               INTEGER PRIMARY KEY,
        query            TEXT    NOT NULL,
        normalized_query TEXT    NOT NULL,
        corrected_query  TEXT,
        mode             TEXT    NOT NULL,
        effective_mode   TEXT    NOT NULL,
        degraded         INTEGER NOT NULL DEFAULT 0,
        result_count     INTEGER NOT NULL,
        total_candidates INTEGER NOT NULL,
        session_id       TEXT,
        created_at       INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_search_events_created_at
        ON search_events (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_search_events_normalized_query
        ON search_events (normalized_query)",
    // One row holding the last search log id handed out. Every recorder
    // sharing the database reserves ids here.
    "CREATE TABLE IF NOT EXISTS search_log_sequence (
        id      INTEGER PRIMARY KEY CHECK (id = 1),
        last_id INTEGER NOT NULL
    )",
    "INSERT OR IGNORE INTO search_log_sequence (id, last_id)
        SELECT 1, COALESCE(MAX(id), 0) FROM search_events",
    "CREATE TABLE IF NOT EXISTS feedback_events (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        search_log_id  INTEGER NOT NULL REFERENCES search_events (id),
        query          TEXT    NOT NULL,
        doc_id         TEXT    NOT NULL,
        doc_title      TEXT    NOT NULL,
        mode           TEXT    NOT NULL,
        rating         INTEGER NOT NULL CHECK (rating IN (-1, 1)),
        rank_position  INTEGER NOT NULL,
        session_id     TEXT,
        created_at     INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_feedback_events_created_at
        ON feedback_events (created_at)",
    "CREATE INDEX IF NOT EXISTS idx_feedback_events_doc_id
        ON feedback_events (doc_id)",
];

/// Map a sqlx error into the shared error type.
pub(crate) fn db_err(e: sqlx::Error) -> Error {
    Error::storage(e.to_string())
}

/// Handle to the event database.
#[derive(Debug, Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    /// Open (creating if missing) the database at `url` and apply the schema.
    ///
    /// `url` is a SQLite URL such as `sqlite://sift.db` or `sqlite::memory:`.
    pub async fn open(url: &str) -> Result<Self> {
        if is_memory_url(url) {
            return Self::in_memory().await;
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| Error::config(format!("invalid database url '{url}': {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        log::info!("Opened event store at {url}");
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// A private in-memory database, for tests and ephemeral deployments.
    ///
    /// The pool keeps exactly one connection alive forever, since every new
    /// connection to `:memory:` would see an empty database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(db_err)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and indexes if they do not exist.
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        log::debug!("Event store schema is up to date");
        Ok(())
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_memory_url(url: &str) -> bool {
    matches!(url, "sqlite::memory:" | "sqlite://:memory:" | ":memory:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_migrates() {
        let store = EventStore::in_memory().await.unwrap();
        store.ping().await.unwrap();

        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('search_events', 'feedback_events', 'search_log_sequence')",
        )
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let store = EventStore::in_memory().await.unwrap();
        store.migrate().await.unwrap();
        store.migrate().await.unwrap();

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM search_log_sequence")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_sequence_seeded_from_existing_searches() {
        let store = EventStore::in_memory().await.unwrap();
        sqlx::query("DROP TABLE search_log_sequence")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO search_events
                (id, query, normalized_query, mode, effective_mode, result_count, total_candidates, created_at)
             VALUES (41, 'q', 'q', 'hybrid', 'hybrid', 0, 0, 0)",
        )
        .execute(store.pool())
        .await
        .unwrap();

        store.migrate().await.unwrap();
        let (last_id,): (i64,) = sqlx::query_as("SELECT last_id FROM search_log_sequence")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(last_id, 41);
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let temp = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", temp.path().join("events.db").display());
        let store = EventStore::open(&url).await.unwrap();
        store.ping().await.unwrap();
        assert!(temp.path().join("events.db").exists());
        store.close().await;
    }

    #[tokio::test]
    async fn test_open_memory_url() {
        let store = EventStore::open("sqlite::memory:").await.unwrap();
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let store = EventStore::in_memory().await.unwrap();
        let result = sqlx::query(
            "INSERT INTO feedback_events
                (search_log_id, query, doc_id, doc_title, mode, rating, rank_position, created_at)
             VALUES (42, 'q', 'd', 't', 'hybrid', 1, 1, 0)",
        )
        .execute(store.pool())
        .await;
        assert!(result.is_err());
    }
}
