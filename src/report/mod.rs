//! Fetching the sessions-per-country report and flattening it into records.

pub mod client;
pub mod extract;
pub mod types;

pub use client::{ReportClient, ReportSource};
pub use extract::{extract, extract_all, FlatRecord, Rows};
pub use types::{DateRange, DateRangeValues, RawReportResponse, Report, ReportData, ReportRow};
