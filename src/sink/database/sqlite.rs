//! SQLite backend (rusqlite). `db_name` is the database file path.

use async_trait::async_trait;
use rusqlite::{Connection, ToSql};

use super::{batch_size, create_table, insert_rows, Backend, SessionRow};
use crate::config::{DatabaseConfig, Engine};
use crate::error::{Error, Result};
use crate::sql::Dialect;

/// Connection to an SQLite database file.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open or create the database file.
    ///
    /// The connect timeout doubles as the busy timeout, bounding how long a
    /// write waits on another process's lock.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let conn = Connection::open(&config.db_name)
            .map_err(|e| Error::connection(Engine::Sqlite, e))?;
        conn.busy_timeout(config.connect_timeout)
            .map_err(|e| Error::connection(Engine::Sqlite, e))?;
        Ok(Self { conn })
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    fn engine(&self) -> Engine {
        Engine::Sqlite
    }

    async fn ensure_schema(&mut self) -> Result<()> {
        self.conn
            .execute_batch(&create_table().to_sql(Dialect::Sqlite))
            .map_err(|e| Error::persistence_with("cannot create analytics_data", e))
    }

    async fn insert_batch(&mut self, rows: &[SessionRow]) -> Result<u64> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| Error::persistence_with("cannot begin transaction", e))?;

        let mut inserted = 0u64;
        for chunk in rows.chunks(batch_size(Dialect::Sqlite)) {
            let sql = insert_rows(chunk.len()).to_sql(Dialect::Sqlite);
            let mut stmt = tx
                .prepare_cached(&sql)
                .map_err(|e| Error::persistence_with("cannot prepare insert", e))?;

            let params: Vec<&dyn ToSql> = chunk
                .iter()
                .flat_map(|row| [&row.country as &dyn ToSql, &row.sessions as &dyn ToSql])
                .collect();
            inserted += stmt
                .execute(params.as_slice())
                .map_err(|e| Error::persistence_with("insert failed", e))?
                as u64;
        }

        // Dropping an uncommitted transaction rolls it back.
        tx.commit()
            .map_err(|e| Error::persistence_with("commit failed", e))?;
        Ok(inserted)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| Error::persistence_with("cannot close database", e))
    }
}
