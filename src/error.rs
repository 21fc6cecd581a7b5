//! Error taxonomy shared by every stage of an export run.
//!
//! Each variant names a class of failure. None of them are retried: the
//! pipeline stops at the first error and reports the stage it happened in.

use std::path::PathBuf;

use crate::config::{Engine, SettingsError};

/// Boxed driver error carried as the source of connection and persistence
/// failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while exporting a report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed credentials, settings, or destination fields.
    #[error("configuration error: {0}")]
    Config(String),

    /// The authorization server or the reporting API rejected the session.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The report request failed at the transport or protocol level.
    #[error("report request failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Request {
        /// HTTP status, when the server answered at all.
        status: Option<u16>,
        message: String,
    },

    /// A row does not have the single-dimension, single-metric shape.
    #[error("malformed row {row} in report {report}: {reason}")]
    MalformedRow {
        /// Index of the report within the response.
        report: usize,
        /// Index of the row within that report.
        row: usize,
        reason: &'static str,
    },

    /// The database was unreachable or refused the credentials.
    #[error("could not connect to {engine} database: {source}")]
    Connection {
        engine: Engine,
        #[source]
        source: BoxError,
    },

    /// Schema creation, insert, or commit failed. Nothing was committed.
    #[error("could not persist rows: {message}")]
    Persistence {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Writing the output file failed.
    #[error("could not write '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested file format is neither `json` nor `csv`.
    #[error("unsupported file format: {0} (supported: json, csv)")]
    UnsupportedFormat(String),

    /// The requested database engine is not one of the supported backends.
    #[error("unsupported database engine: {0} (supported: sqlite, mysql, postgresql)")]
    UnsupportedEngine(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a persistence error without an underlying driver error.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a driver error raised while writing rows.
    pub fn persistence_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Persistence {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wrap a driver error raised while connecting.
    pub fn connection(
        engine: Engine,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            engine,
            source: Box::new(source),
        }
    }

    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<SettingsError> for Error {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::UnsupportedEngine(engine) => Self::UnsupportedEngine(engine),
            SettingsError::UnsupportedFormat(format) => Self::UnsupportedFormat(format),
            other => Self::Config(other.to_string()),
        }
    }
}
