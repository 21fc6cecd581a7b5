//! Where a run writes its output.

use std::fmt;
use std::path::PathBuf;

use super::connection::DatabaseConfig;
use crate::sink::FileFormat;

/// Caller-selected output of a pipeline run.
#[derive(Debug, Clone)]
pub enum Destination {
    /// Write the raw response (JSON) or the extracted rows (CSV) to a file.
    File { format: FileFormat, path: PathBuf },
    /// Append the extracted rows to `analytics_data`.
    Database(DatabaseConfig),
}

impl Destination {
    /// Whether this destination consumes extracted rows rather than the raw response.
    pub fn needs_rows(&self) -> bool {
        !matches!(
            self,
            Destination::File {
                format: FileFormat::Json,
                ..
            }
        )
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::File { format, path } => {
                write!(f, "{} file '{}'", format, path.display())
            }
            Destination::Database(config) => f.write_str(&config.describe()),
        }
    }
}
