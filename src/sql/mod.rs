//! SQL generation module.
//!
//! Renders the statements the database sink issues, for each supported
//! engine:
//!
//! - [`ddl`] - CREATE TABLE
//! - [`dml`] - parameterised multi-row INSERT
//! - [`dialect`] - SQL dialect implementations

pub mod ddl;
pub mod dialect;
pub mod dml;
pub mod types;

pub use ddl::{ColumnDef, CreateTable};
pub use dialect::{Dialect, SqlDialect};
pub use dml::Insert;
pub use types::DataType;
