//! # analytics-export
//!
//! Exports a sessions-per-country analytics report to a file or a database.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │   SessionProvider    │  service-account JWT grant or static token
//! └──────────────────────┘
//!            │
//!            ▼ [report::client]
//! ┌──────────────────────┐
//! │  RawReportResponse   │  reports → rows → dimensions / metrics
//! └──────────────────────┘
//!            │
//!            ▼ [report::extract]
//! ┌──────────────────────┐
//! │  FlatRecord stream   │  (country, sessions)
//! └──────────────────────┘
//!            │
//!            ▼ [sink]
//! ┌──────────────────────┐
//! │ JSON / CSV file, or  │
//! │ SQLite / MySQL /     │
//! │ PostgreSQL table     │
//! └──────────────────────┘
//! ```
//!
//! [`pipeline::Pipeline`] drives one run through these stages.

pub mod auth;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod sink;
pub mod sql;

pub use config::{DatabaseConfig, Destination, Engine, Settings};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineError, RunState, RunSummary};
pub use report::{DateRange, FlatRecord, RawReportResponse};
pub use sink::FileFormat;
