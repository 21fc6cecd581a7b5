//! DML (Data Manipulation Language) support.
//!
//! Only parameterised multi-row INSERT is needed: values are always bound,
//! never inlined into the statement text.
//!
//! # Examples
//!
//! ```ignore
//! use analytics_export::sql::{Dialect, Insert};
//!
//! let insert = Insert::into("analytics_data")
//!     .columns(["country", "sessions"])
//!     .rows(2);
//!
//! // INSERT INTO "analytics_data" ("country", "sessions") VALUES ($1, $2), ($3, $4)
//! println!("{}", insert.to_sql(Dialect::Postgres));
//! ```

use super::dialect::{Dialect, SqlDialect};

/// Parameterised INSERT statement.
#[derive(Debug, Clone)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: usize,
}

impl Insert {
    /// Create a new INSERT statement with one row of parameters.
    pub fn into(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            rows: 1,
        }
    }

    /// Set the columns to insert.
    pub fn columns(mut self, cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = cols.into_iter().map(|c| c.into()).collect();
        self
    }

    /// Set the number of value rows.
    pub fn rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    /// Largest number of rows one statement may carry in `dialect`.
    pub fn max_rows(&self, dialect: Dialect) -> usize {
        (dialect.max_bind_params() / self.columns.len().max(1)).max(1)
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| dialect.quote_identifier(c))
            .collect();

        let width = self.columns.len();
        let rows: Vec<String> = (0..self.rows)
            .map(|row| {
                let params: Vec<String> = (1..=width)
                    .map(|col| dialect.placeholder(row * width + col))
                    .collect();
                format!("({})", params.join(", "))
            })
            .collect();

        format!(
            "INSERT INTO {} ({}) VALUES {}",
            dialect.quote_identifier(&self.table),
            columns.join(", "),
            rows.join(", ")
        )
    }
}
