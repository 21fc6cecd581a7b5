//! SQL dialect definitions and formatting rules.
//!
//! Each supported engine implements `SqlDialect` to handle the syntax the
//! statement builders need:
//!
//! - Identifier quoting: `"` (PostgreSQL/SQLite), `` ` `` (MySQL)
//! - Bind parameters: `?` (SQLite/MySQL) vs `$1, $2, ...` (PostgreSQL)
//! - Column type names
//!
//! # Usage
//!
//! ```ignore
//! use analytics_export::sql::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::MySql;
//! let quoted = dialect.quote_identifier("country");  // `country`
//! ```

pub mod helpers;
mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;

use super::types::DataType;
use crate::config::Engine;

/// SQL dialect trait - defines how SQL constructs are rendered.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Bind parameter marker for the `index`-th parameter (1-based).
    fn placeholder(&self, index: usize) -> String;

    /// Render a column type.
    fn emit_data_type(&self, dt: &DataType) -> String;

    /// Upper bound on bind parameters in one statement.
    fn max_bind_params(&self) -> usize {
        u16::MAX as usize
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    MySql,
    Postgres,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Sqlite => &Sqlite,
            Dialect::MySql => &MySql,
            Dialect::Postgres => &Postgres,
        }
    }
}

impl From<Engine> for Dialect {
    fn from(engine: Engine) -> Self {
        match engine {
            Engine::Sqlite => Dialect::Sqlite,
            Engine::MySql => Dialect::MySql,
            Engine::Postgres => Dialect::Postgres,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn placeholder(&self, index: usize) -> String {
        self.dialect().placeholder(index)
    }

    fn emit_data_type(&self, dt: &DataType) -> String {
        self.dialect().emit_data_type(dt)
    }

    fn max_bind_params(&self) -> usize {
        self.dialect().max_bind_params()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}
