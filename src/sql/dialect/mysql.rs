//! MySQL SQL dialect.
//!
//! MySQL differences from ANSI:
//! - Backtick identifier quoting (`` `name` ``)
//! - `?` positional parameters
//! - TEXT columns need a prefix length to be indexed, so bounded strings use VARCHAR

use super::helpers;
use super::SqlDialect;
use crate::sql::types::DataType;

/// MySQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn placeholder(&self, index: usize) -> String {
        helpers::placeholder_question(index)
    }

    fn emit_data_type(&self, dt: &DataType) -> String {
        helpers::emit_data_type_mysql(dt)
    }
}
