//! Persistence targets for an export run.

pub mod database;
pub mod file;

pub use database::{persist, Backend, PersistSummary, SessionRow, TABLE_NAME};
pub use file::{write_csv, write_file, write_json, FileFormat, FileSource, CSV_HEADER};
