//! MySQL / MariaDB backend (sqlx).

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};

use super::{batch_size, create_table, insert_rows, Backend, SessionRow};
use crate::config::{DatabaseConfig, Engine};
use crate::error::{Error, Result};
use crate::sql::Dialect;

/// Connection to a MySQL server.
#[derive(Debug)]
pub struct MySqlBackend {
    conn: MySqlConnection,
}

impl MySqlBackend {
    /// Connect, giving up after `config.connect_timeout`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(config.host())
            .port(config.port())
            .username(config.user())
            .password(config.password())
            .database(&config.db_name);

        let conn = tokio::time::timeout(config.connect_timeout, options.connect())
            .await
            .map_err(|elapsed| Error::connection(Engine::MySql, elapsed))?
            .map_err(|e| Error::connection(Engine::MySql, e))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Backend for MySqlBackend {
    fn engine(&self) -> Engine {
        Engine::MySql
    }

    async fn ensure_schema(&mut self) -> Result<()> {
        let sql = create_table().to_sql(Dialect::MySql);
        sqlx::query(&sql)
            .execute(&mut self.conn)
            .await
            .map_err(|e| Error::persistence_with("cannot create analytics_data", e))?;
        Ok(())
    }

    async fn insert_batch(&mut self, rows: &[SessionRow]) -> Result<u64> {
        let mut tx = self
            .conn
            .begin()
            .await
            .map_err(|e| Error::persistence_with("cannot begin transaction", e))?;

        let mut inserted = 0u64;
        for chunk in rows.chunks(batch_size(Dialect::MySql)) {
            let sql = insert_rows(chunk.len()).to_sql(Dialect::MySql);
            let mut query = sqlx::query(&sql);
            for row in chunk {
                query = query.bind(row.country.as_str()).bind(row.sessions);
            }
            inserted += query
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::persistence_with("insert failed", e))?
                .rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| Error::persistence_with("commit failed", e))?;
        Ok(inserted)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| Error::persistence_with("cannot close connection", e))
    }
}
