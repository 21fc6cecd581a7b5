//! Building blocks shared by the dialect implementations.

use crate::sql::types::DataType;

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, SQLite
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Positional `?` placeholder.
/// Used by: SQLite, MySQL
pub fn placeholder_question(_index: usize) -> String {
    "?".to_string()
}

/// Numbered `$n` placeholder (1-based).
/// Used by: Postgres
pub fn placeholder_numbered(index: usize) -> String {
    format!("${}", index)
}

/// Emit data type for SQLite (type affinity names).
pub fn emit_data_type_sqlite(dt: &DataType) -> String {
    match dt {
        DataType::Int32 => "INTEGER".into(),
        DataType::Varchar(_) => "TEXT".into(),
    }
}

/// Emit data type for MySQL.
pub fn emit_data_type_mysql(dt: &DataType) -> String {
    match dt {
        DataType::Int32 => "INT".into(),
        DataType::Varchar(n) => format!("VARCHAR({})", n),
    }
}

/// Emit data type for PostgreSQL.
pub fn emit_data_type_postgres(dt: &DataType) -> String {
    match dt {
        DataType::Int32 => "INTEGER".into(),
        DataType::Varchar(n) => format!("VARCHAR({})", n),
    }
}
