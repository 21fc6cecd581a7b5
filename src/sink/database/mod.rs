//! Database output: append extracted rows to `analytics_data`.
//!
//! Each engine implements [`Backend`] ("ensure schema, insert a batch,
//! close"). [`persist`] drives one backend through a run:
//!
//! 1. convert every record's sessions to an integer (fails before connecting)
//! 2. open the connection, bounded by the configured connect timeout
//! 3. create the table if absent
//! 4. insert all rows inside one transaction, in multi-row statements
//! 5. close the connection, on success and on failure alike
//!
//! The table is never dropped or truncated; repeated runs accumulate rows.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlBackend;
pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;

use async_trait::async_trait;

use crate::config::{DatabaseConfig, Engine};
use crate::error::{Error, Result};
use crate::report::FlatRecord;
use crate::sql::{ColumnDef, CreateTable, DataType, Dialect, Insert};

/// Table the rows are appended to.
pub const TABLE_NAME: &str = "analytics_data";

/// Rows per INSERT statement, before the dialect's bind-parameter limit.
pub const BATCH_ROWS: usize = 500;

/// A record ready to bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub country: String,
    pub sessions: i64,
}

impl TryFrom<&FlatRecord> for SessionRow {
    type Error = Error;

    fn try_from(record: &FlatRecord) -> Result<Self> {
        let sessions = record.sessions.trim().parse::<i64>().map_err(|e| {
            Error::persistence_with(
                format!(
                    "sessions value '{}' for '{}' is not an integer",
                    record.sessions, record.country
                ),
                e,
            )
        })?;
        Ok(Self {
            country: record.country.clone(),
            sessions,
        })
    }
}

/// Convert records, failing on the first non-numeric session count.
pub fn parse_rows(records: &[FlatRecord]) -> Result<Vec<SessionRow>> {
    records.iter().map(SessionRow::try_from).collect()
}

/// `CREATE TABLE IF NOT EXISTS analytics_data (country, sessions)`.
pub fn create_table() -> CreateTable {
    CreateTable::new(TABLE_NAME)
        .if_not_exists()
        .column(ColumnDef::new("country", DataType::Varchar(255)))
        .column(ColumnDef::new("sessions", DataType::Int32))
}

/// `INSERT INTO analytics_data (country, sessions) VALUES ...` for `rows` rows.
pub fn insert_rows(rows: usize) -> Insert {
    Insert::into(TABLE_NAME)
        .columns(["country", "sessions"])
        .rows(rows)
}

/// Rows per statement for `dialect`.
pub fn batch_size(dialect: Dialect) -> usize {
    BATCH_ROWS.min(insert_rows(1).max_rows(dialect))
}

/// An open connection to one engine.
#[async_trait]
pub trait Backend: Send {
    fn engine(&self) -> Engine;

    /// Create `analytics_data` if it does not exist.
    async fn ensure_schema(&mut self) -> Result<()>;

    /// Insert all rows in a single transaction, returning the count inserted.
    ///
    /// On error nothing from this call is committed.
    async fn insert_batch(&mut self, rows: &[SessionRow]) -> Result<u64>;

    /// Release the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Open a backend for `config`.
///
/// # Errors
///
/// `Error::Config` when a field the engine needs is missing, and
/// `Error::Connection` when the database cannot be reached in time.
pub async fn open(config: &DatabaseConfig) -> Result<Box<dyn Backend>> {
    config.validate()?;

    tracing::debug!(target_db = %config.describe(), "connecting");
    let backend: Box<dyn Backend> = match config.engine {
        Engine::Sqlite => Box::new(SqliteBackend::open(config)?),
        Engine::MySql => Box::new(MySqlBackend::connect(config).await?),
        Engine::Postgres => Box::new(PostgresBackend::connect(config).await?),
    };
    Ok(backend)
}

/// Outcome of a successful [`persist`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistSummary {
    pub engine: Engine,
    pub inserted: u64,
}

/// Append `records` to `analytics_data` in the database `config` names.
pub async fn persist(records: &[FlatRecord], config: &DatabaseConfig) -> Result<PersistSummary> {
    let rows = parse_rows(records)?;

    let backend = open(config).await?;
    let inserted = write_and_close(backend, &rows).await?;

    tracing::info!(
        target_db = %config.describe(),
        inserted,
        "rows persisted"
    );
    Ok(PersistSummary {
        engine: config.engine,
        inserted,
    })
}

/// Write `rows`, then close the backend whatever the outcome.
///
/// A close failure after the commit is only logged: the rows are already
/// durable, and reporting failure would invite a retry that appends them twice.
async fn write_and_close(mut backend: Box<dyn Backend>, rows: &[SessionRow]) -> Result<u64> {
    let engine = backend.engine();
    let outcome = write(backend.as_mut(), rows).await;
    let closed = backend.close().await;

    match (outcome, closed) {
        (Ok(inserted), Ok(())) => Ok(inserted),
        (Ok(inserted), Err(e)) => {
            tracing::warn!(engine = %engine, error = %e, "closing connection failed after commit");
            Ok(inserted)
        }
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                tracing::debug!(engine = %engine, error = %close_err, "closing connection failed");
            }
            Err(e)
        }
    }
}

async fn write(backend: &mut dyn Backend, rows: &[SessionRow]) -> Result<u64> {
    backend.ensure_schema().await?;
    if rows.is_empty() {
        tracing::info!(engine = %backend.engine(), "no rows to insert");
        return Ok(0);
    }
    backend.insert_batch(rows).await
}
