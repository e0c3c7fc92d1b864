//! Event store behaviour across reopen and under concurrent writers.

use std::sync::Arc;

use chrono::{Duration, Utc};

use sift_core::SearchMode;
use sift_storage::{Aggregator, EventRecorder, EventStore, FeedbackEvent, SearchEvent, Window};

fn db_url(dir: &tempfile::TempDir) -> String {
    format!("sqlite://{}", dir.path().join("events.db").display())
}

/// The last day, with a little slack so just-written events fall inside.
fn window() -> Window {
    Window::last_days(1, Utc::now() + Duration::minutes(1)).unwrap()
}

#[tokio::test]
async fn test_events_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let url = db_url(&dir);

    let log_id = {
        let store = EventStore::open(&url).await.unwrap();
        let recorder = EventRecorder::new(&store).await.unwrap();
        let receipt = recorder
            .record_search(SearchEvent::new("Election", "election", SearchMode::Hybrid).with_counts(3, 7))
            .await
            .unwrap();
        let log_id = receipt.log_id();
        recorder
            .record_feedback(FeedbackEvent::new(log_id, "doc-1", 1).for_query("election", SearchMode::Hybrid))
            .await
            .unwrap();
        recorder.flush().await;
        store.close().await;
        log_id
    };

    let store = EventStore::open(&url).await.unwrap();
    let overview = Aggregator::new(&store)
        .overview(&window())
        .await
        .unwrap();
    assert_eq!(overview.total_searches, 1);
    assert_eq!(overview.total_feedback, 1);

    let recorder = EventRecorder::new(&store).await.unwrap();
    let next = recorder
        .record_search(SearchEvent::new("budget", "budget", SearchMode::Lexical))
        .await
        .unwrap();
    assert_eq!(next.log_id(), log_id + 1);
    next.committed().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_searches_and_feedback() {
    let dir = tempfile::tempdir().unwrap();
    let store = EventStore::open(&db_url(&dir)).await.unwrap();
    let recorder = Arc::new(EventRecorder::new(&store).await.unwrap());

    let mut tasks = Vec::new();
    for i in 0..16 {
        let recorder = Arc::clone(&recorder);
        tasks.push(tokio::spawn(async move {
            let query = format!("query {}", i % 4);
            let receipt = recorder
                .record_search(SearchEvent::new(&query, &query, SearchMode::Hybrid))
                .await
                .unwrap();
            recorder
                .record_feedback(
                    FeedbackEvent::new(receipt.log_id(), format!("doc-{i}"), if i % 2 == 0 { 1 } else { -1 })
                        .for_query(query, SearchMode::Hybrid),
                )
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    recorder.flush().await;

    let aggregator = Aggregator::new(&store);
    let window = window();
    let overview = aggregator.overview(&window).await.unwrap();
    assert_eq!(overview.total_searches, 16);
    assert_eq!(overview.distinct_queries, 4);
    assert_eq!(overview.total_feedback, 16);
    assert!((overview.satisfaction_rate - 0.5).abs() < 1e-9);

    let top = aggregator.top_queries(&window, 10).await.unwrap();
    assert!(top.iter().all(|q| q.count == 4));
}

#[tokio::test]
async fn test_recorders_sharing_a_database_allocate_distinct_ids() {
    let dir = tempfile::tempdir().unwrap();
    let url = db_url(&dir);

    // Two stores on one file stand in for two server processes.
    let first_store = EventStore::open(&url).await.unwrap();
    let second_store = EventStore::open(&url).await.unwrap();
    let first = EventRecorder::new(&first_store).await.unwrap();
    let second = EventRecorder::new(&second_store).await.unwrap();

    let budget = first
        .record_search(SearchEvent::new("budget", "budget", SearchMode::Lexical))
        .await
        .unwrap();
    let election = second
        .record_search(SearchEvent::new("election", "election", SearchMode::Hybrid))
        .await
        .unwrap();
    assert_ne!(budget.log_id(), election.log_id());

    let budget_id = budget.committed().await.unwrap();
    let election_id = election.committed().await.unwrap();

    first
        .record_feedback(FeedbackEvent::new(election_id, "doc-7", 1))
        .await
        .unwrap();

    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT s.id, s.normalized_query
         FROM feedback_events f JOIN search_events s ON s.id = f.search_log_id",
    )
    .fetch_all(first_store.pool())
    .await
    .unwrap();
    assert_eq!(rows, vec![(election_id, "election".to_string())]);

    let (searches,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM search_events")
        .fetch_one(second_store.pool())
        .await
        .unwrap();
    assert_eq!(searches, 2);
    assert!(budget_id < election_id);
}
