//! End-to-end command runs against a corpus file and an on-disk event store.

use std::io::Write;
use std::path::Path;

use chrono::{Duration, Utc};
use clap::Parser;
use sift_cli::{CliArgs, SiftCli, SiftConfig};
use sift_storage::{Aggregator, EventStore, Window};

const CORPUS: &[&str] = &[
    r#"{"id": "a1", "title": "Election results tonight", "excerpt": "Counting finished overnight"}"#,
    r#"{"id": "a2", "title": "Weather forecast", "excerpt": "Rain expected overnight"}"#,
    r#"{"id": "a3", "title": "Healthcare policy", "excerpt": "A new pledge expected"}"#,
];

struct Fixture {
    _dir: tempfile::TempDir,
    database_url: String,
    cli: SiftCli,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let corpus = dir.path().join("corpus.jsonl");
    let mut file = std::fs::File::create(&corpus).unwrap();
    for line in CORPUS {
        writeln!(file, "{line}").unwrap();
    }

    let database_url = format!("sqlite://{}", dir.path().join("events.db").display());
    let mut config = SiftConfig::default();
    config.content.path = Some(corpus.to_string_lossy().to_string());
    config.storage.database_url = database_url.clone();
    config.vector.dimension = 256;

    Fixture {
        _dir: dir,
        database_url,
        cli: SiftCli::new(config),
    }
}

fn args(argv: &[&str]) -> CliArgs {
    CliArgs::parse_from(std::iter::once("sift").chain(argv.iter().copied()))
}

fn window() -> Window {
    Window::last_days(1, Utc::now() + Duration::minutes(1)).unwrap()
}

async fn store(url: &str) -> EventStore {
    EventStore::open(url).await.unwrap()
}

#[tokio::test]
async fn test_search_is_recorded_before_exit() {
    let fx = fixture();
    fx.cli
        .run(args(&["-q", "search", "election", "results", "--session", "s-1"]))
        .await
        .unwrap();

    let store = store(&fx.database_url).await;
    let searches = Aggregator::new(&store)
        .recent_searches(&window(), 10)
        .await
        .unwrap();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].event.normalized_query, "election results");
    assert_eq!(searches[0].event.session_id.as_deref(), Some("s-1"));
    assert!(searches[0].event.result_count >= 1);
}

#[tokio::test]
async fn test_feedback_then_analytics() {
    let fx = fixture();
    fx.cli
        .run(args(&["-q", "search", "election", "--json"]))
        .await
        .unwrap();

    let log_id = {
        let store = store(&fx.database_url).await;
        let searches = Aggregator::new(&store)
            .recent_searches(&window(), 1)
            .await
            .unwrap();
        store.close().await;
        searches[0].id
    };

    let log_id = log_id.to_string();
    fx.cli
        .run(args(&["-q", "feedback", "--log-id", &log_id, "--doc-id", "a1", "--rating", "1"]))
        .await
        .unwrap();
    fx.cli
        .run(args(&["-q", "feedback", "--log-id", &log_id, "--doc-id", "a2", "--rating", "-1"]))
        .await
        .unwrap();
    fx.cli.run(args(&["-q", "analytics", "--days", "1"])).await.unwrap();

    let store = store(&fx.database_url).await;
    let overview = Aggregator::new(&store).overview(&window()).await.unwrap();
    assert_eq!(overview.total_searches, 1);
    assert_eq!(overview.total_feedback, 2);
    assert_eq!(overview.positive_feedback, 1);
    assert!((overview.satisfaction_rate - 0.5).abs() < 1e-9);

    let feedback = Aggregator::new(&store)
        .recent_feedback(&window(), 10)
        .await
        .unwrap();
    let titles: Vec<&str> = feedback.iter().map(|f| f.event.doc_title.as_str()).collect();
    assert!(titles.contains(&"Election results tonight"));
    assert!(titles.contains(&"Weather forecast"));
}

#[tokio::test]
async fn test_feedback_for_unknown_search_fails() {
    let fx = fixture();
    let err = fx
        .cli
        .run(args(&["-q", "feedback", "--log-id", "424242", "--doc-id", "a1", "--rating", "1"]))
        .await
        .unwrap_err();
    assert!(err.is_referential_integrity());
}

#[tokio::test]
async fn test_invalid_requests_fail() {
    let fx = fixture();
    let err = fx
        .cli
        .run(args(&["-q", "search", "election", "--limit", "0"]))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = fx
        .cli
        .run(args(&["-q", "search", "election", "--mode", "fuzzy"]))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = fx
        .cli
        .run(args(&["-q", "analytics", "--days", "0"]))
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_health_command() {
    let fx = fixture();
    fx.cli.run(args(&["-q", "health"])).await.unwrap();
    assert!(Path::new(fx.database_url.trim_start_matches("sqlite://")).exists());
}

#[tokio::test]
async fn test_config_init_command() {
    let fx = fixture();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let path = path.to_string_lossy().to_string();

    fx.cli
        .run(args(&["-q", "config", "init", "--file", &path]))
        .await
        .unwrap();
    assert!(fx
        .cli
        .run(args(&["-q", "config", "init", "--file", &path]))
        .await
        .is_err());

    let loaded: SiftConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(loaded.storage.database_url, "sqlite://sift.db");
}
