//! PostgreSQL SQL dialect.
//!
//! Follows ANSI closely: double-quoted identifiers and numbered `$n`
//! parameters.

use super::helpers;
use super::SqlDialect;
use crate::sql::types::DataType;

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn placeholder(&self, index: usize) -> String {
        helpers::placeholder_numbered(index)
    }

    fn emit_data_type(&self, dt: &DataType) -> String {
        helpers::emit_data_type_postgres(dt)
    }
}
