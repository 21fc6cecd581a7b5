//! SQLite SQL dialect.
//!
//! SQLite differences from ANSI:
//! - Type affinity instead of strict column types (INTEGER, TEXT, ...)
//! - `?` positional parameters
//! - At most 999 bound parameters per statement before 3.32

use super::helpers;
use super::SqlDialect;
use crate::sql::types::DataType;

/// SQLite SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn placeholder(&self, index: usize) -> String {
        helpers::placeholder_question(index)
    }

    fn emit_data_type(&self, dt: &DataType) -> String {
        helpers::emit_data_type_sqlite(dt)
    }

    fn max_bind_params(&self) -> usize {
        999
    }
}
