//! Database sink against SQLite files.

use std::path::Path;

use analytics_export::config::{DatabaseConfig, DestinationSettings, Engine, SettingsError};
use analytics_export::report::FlatRecord;
use analytics_export::sink::persist;
use analytics_export::Error;
use rusqlite::Connection;

fn config(path: &Path) -> DatabaseConfig {
    DatabaseConfig::sqlite(path.to_string_lossy())
}

fn rows(path: &Path) -> Vec<(String, i64)> {
    let conn = Connection::open(path).unwrap();
    let mut stmt = conn
        .prepare("SELECT country, sessions FROM analytics_data ORDER BY rowid")
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

fn sample() -> Vec<FlatRecord> {
    vec![FlatRecord::new("US", "42"), FlatRecord::new("FR", "7")]
}

#[tokio::test]
async fn test_persist_creates_table_and_inserts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ga.db");

    let summary = persist(&sample(), &config(&path)).await.unwrap();
    assert_eq!(summary.engine, Engine::Sqlite);
    assert_eq!(summary.inserted, 2);
    assert_eq!(
        rows(&path),
        vec![("US".to_string(), 42), ("FR".to_string(), 7)]
    );
}

#[tokio::test]
async fn test_sessions_stored_as_integers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ga.db");
    persist(&sample(), &config(&path)).await.unwrap();

    let conn = Connection::open(&path).unwrap();
    let kind: String = conn
        .query_row(
            "SELECT typeof(sessions) FROM analytics_data LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(kind, "integer");
}

#[tokio::test]
async fn test_repeated_runs_accumulate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ga.db");

    persist(&sample(), &config(&path)).await.unwrap();
    persist(&sample(), &config(&path)).await.unwrap();
    assert_eq!(rows(&path).len(), 4);
}

#[tokio::test]
async fn test_existing_table_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ga.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch(
            "CREATE TABLE analytics_data (country TEXT, sessions INTEGER);
             INSERT INTO analytics_data VALUES ('JP', 3);",
        )
        .unwrap();

    persist(&sample(), &config(&path)).await.unwrap();
    assert_eq!(
        rows(&path),
        vec![
            ("JP".to_string(), 3),
            ("US".to_string(), 42),
            ("FR".to_string(), 7)
        ]
    );
}

#[tokio::test]
async fn test_empty_records_leave_table_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ga.db");

    let summary = persist(&[], &config(&path)).await.unwrap();
    assert_eq!(summary.inserted, 0);
    assert!(rows(&path).is_empty());

    persist(&sample(), &config(&path)).await.unwrap();
    persist(&[], &config(&path)).await.unwrap();
    assert_eq!(rows(&path).len(), 2);
}

#[tokio::test]
async fn test_non_numeric_sessions_commit_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ga.db");
    persist(&sample(), &config(&path)).await.unwrap();

    let bad = vec![FlatRecord::new("DE", "3"), FlatRecord::new("IT", "n/a")];
    let err = persist(&bad, &config(&path)).await.unwrap_err();

    assert!(matches!(err, Error::Persistence { .. }));
    assert_eq!(rows(&path).len(), 2);
}

#[tokio::test]
async fn test_unopenable_path_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("ga.db");

    let err = persist(&sample(), &config(&path)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Connection {
            engine: Engine::Sqlite,
            ..
        }
    ));
}

#[test]
fn test_unsupported_engine() {
    let err: Error = "oracle".parse::<Engine>().unwrap_err().into();
    assert!(matches!(err, Error::UnsupportedEngine(ref e) if e == "oracle"));

    let settings: DestinationSettings = toml::from_str(
        r#"
kind = "database"
engine = "oracle"
db_name = "ga"
"#,
    )
    .unwrap();
    assert!(matches!(
        settings.resolve(),
        Err(SettingsError::UnsupportedEngine(_))
    ));
}
