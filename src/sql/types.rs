//! SQL-level column types for DDL generation.

/// Column type, rendered per dialect by [`super::SqlDialect::emit_data_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit signed integer (INT/INTEGER).
    Int32,

    /// Variable-length string with a maximum length.
    Varchar(u16),
}
