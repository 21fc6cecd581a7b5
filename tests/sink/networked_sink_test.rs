//! MySQL and PostgreSQL sinks.
//!
//! Tests that need a live server are ignored by default. To run them:
//!
//! ```text
//! export ANALYTICS_EXPORT_TEST_MYSQL="host:port:user:password:database"
//! export ANALYTICS_EXPORT_TEST_POSTGRES="host:port:user:password:database"
//! cargo test --test networked_sink_test -- --ignored
//! ```

use std::time::{Duration, Instant};

use analytics_export::config::{DatabaseConfig, Engine};
use analytics_export::report::FlatRecord;
use analytics_export::sink::persist;
use analytics_export::Error;

fn from_env(var: &str, engine: Engine) -> Option<DatabaseConfig> {
    let value = std::env::var(var).ok()?;
    let parts: Vec<&str> = value.splitn(5, ':').collect();
    let [host, port, user, password, database] = parts.as_slice() else {
        panic!("{} must be host:port:user:password:database", var);
    };
    Some(
        DatabaseConfig::networked(engine, *host, *user, *password, *database)
            .with_port(port.parse().unwrap()),
    )
}

fn sample() -> Vec<FlatRecord> {
    vec![FlatRecord::new("US", "42"), FlatRecord::new("FR", "7")]
}

async fn persist_twice(config: DatabaseConfig) {
    let first = persist(&sample(), &config).await.unwrap();
    assert_eq!(first.inserted, 2);
    assert_eq!(first.engine, config.engine);

    let second = persist(&sample(), &config).await.unwrap();
    assert_eq!(second.inserted, 2);

    let empty = persist(&[], &config).await.unwrap();
    assert_eq!(empty.inserted, 0);

    let bad = vec![FlatRecord::new("DE", "lots")];
    assert!(matches!(
        persist(&bad, &config).await,
        Err(Error::Persistence { .. })
    ));
}

#[tokio::test]
#[ignore = "requires ANALYTICS_EXPORT_TEST_MYSQL"]
async fn test_mysql_persist() {
    let config = from_env("ANALYTICS_EXPORT_TEST_MYSQL", Engine::MySql)
        .expect("ANALYTICS_EXPORT_TEST_MYSQL not set");
    persist_twice(config).await;
}

#[tokio::test]
#[ignore = "requires ANALYTICS_EXPORT_TEST_POSTGRES"]
async fn test_postgres_persist() {
    let config = from_env("ANALYTICS_EXPORT_TEST_POSTGRES", Engine::Postgres)
        .expect("ANALYTICS_EXPORT_TEST_POSTGRES not set");
    persist_twice(config).await;
}

// ============================================================================
// Connection failures (no server needed)
// ============================================================================

async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[tokio::test]
async fn test_refused_connection_is_connection_error() {
    for engine in [Engine::MySql, Engine::Postgres] {
        let config = DatabaseConfig::networked(engine, "127.0.0.1", "etl", "secret", "ga")
            .with_port(closed_port().await)
            .with_connect_timeout(Duration::from_secs(5));

        match persist(&sample(), &config).await {
            Err(Error::Connection { engine: failed, .. }) => assert_eq!(failed, engine),
            other => panic!("expected connection error for {}, got {:?}", engine, other),
        }
    }
}

#[tokio::test]
async fn test_connect_timeout_is_bounded() {
    // accepts the TCP connection but never speaks the protocol
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let config = DatabaseConfig::networked(Engine::MySql, "127.0.0.1", "etl", "secret", "ga")
        .with_port(port)
        .with_connect_timeout(Duration::from_millis(300));

    let started = Instant::now();
    let result = persist(&sample(), &config).await;
    assert!(matches!(
        result,
        Err(Error::Connection {
            engine: Engine::MySql,
            ..
        })
    ));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_missing_password_is_config_error() {
    let mut config = DatabaseConfig::networked(Engine::Postgres, "127.0.0.1", "etl", "x", "ga");
    config.password = None;

    assert!(matches!(
        persist(&sample(), &config).await,
        Err(Error::Config(_))
    ));
}
