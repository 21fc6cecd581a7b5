//! DDL (Data Definition Language) support.
//!
//! # Examples
//!
//! ```ignore
//! use analytics_export::sql::{ColumnDef, CreateTable, DataType, Dialect};
//!
//! let table = CreateTable::new("analytics_data")
//!     .if_not_exists()
//!     .column(ColumnDef::new("country", DataType::Varchar(255)))
//!     .column(ColumnDef::new("sessions", DataType::Int32));
//!
//! println!("{}", table.to_sql(Dialect::Postgres));
//! ```

use super::dialect::{Dialect, SqlDialect};
use super::types::DataType;

/// CREATE TABLE statement.
#[derive(Debug, Clone)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct CreateTable {
    pub if_not_exists: bool,
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl CreateTable {
    /// Create a new CREATE TABLE statement.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            if_not_exists: false,
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add IF NOT EXISTS clause.
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Add a column definition.
    pub fn column(mut self, col: ColumnDef) -> Self {
        self.columns.push(col);
        self
    }

    /// Convert to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut sql = String::from("CREATE TABLE ");
        if self.if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&dialect.quote_identifier(&self.name));

        let columns: Vec<String> = self.columns.iter().map(|c| c.to_sql(dialect)).collect();
        sql.push_str(" (");
        sql.push_str(&columns.join(", "));
        sql.push(')');
        sql
    }
}

/// Column definition for CREATE TABLE.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnDef {
    /// Create a new nullable column definition.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    fn to_sql(&self, dialect: Dialect) -> String {
        format!(
            "{} {}",
            dialect.quote_identifier(&self.name),
            dialect.emit_data_type(&self.data_type)
        )
    }
}
