//! Report request parameters and the raw response model.
//!
//! The response types mirror the `reports:batchGet` JSON closely enough to
//! walk reports and rows, and keep every other field in `extra` maps so the
//! raw response can be written back out unchanged.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// ISO 8601 calendar date format used by the API.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive range of calendar dates to report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting a start after the end.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self> {
        if start_date > end_date {
            return Err(Error::config(format!(
                "start date {} is after end date {}",
                start_date, end_date
            )));
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Parse `YYYY-MM-DD` start and end dates.
    pub fn parse(start_date: &str, end_date: &str) -> Result<Self> {
        Self::new(parse_date(start_date)?, parse_date(end_date)?)
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start_date.format(DATE_FORMAT),
            self.end_date.format(DATE_FORMAT)
        )
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| Error::config(format!("invalid date '{}' (expected YYYY-MM-DD): {}", s, e)))
}

/// Raw `batchGet` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReportResponse {
    #[serde(default)]
    pub reports: Vec<Report>,

    /// Fields this crate does not interpret (e.g. `queryCost`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawReportResponse {
    /// Build a response from reports.
    pub fn from_reports(reports: impl IntoIterator<Item = Report>) -> Self {
        Self {
            reports: reports.into_iter().collect(),
            extra: Map::new(),
        }
    }

    /// Total number of rows across all reports.
    pub fn row_count(&self) -> usize {
        self.reports.iter().map(|r| r.rows().len()).sum()
    }
}

/// One result set of the response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_header: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ReportData>,

    /// Present when the API truncated the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Report {
    /// Build a report from rows.
    pub fn with_rows(rows: impl IntoIterator<Item = ReportRow>) -> Self {
        Self {
            data: Some(ReportData {
                rows: rows.into_iter().collect(),
                extra: Map::new(),
            }),
            ..Self::default()
        }
    }

    /// Rows of the report, empty when the API sent no data.
    pub fn rows(&self) -> &[ReportRow] {
        self.data.as_ref().map(|d| d.rows.as_slice()).unwrap_or(&[])
    }
}

/// The `data` object of a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<ReportRow>,

    /// `totals`, `rowCount`, `minimums`, `maximums`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One row: dimension values paired with metric value groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(default)]
    pub dimensions: Vec<String>,

    #[serde(default)]
    pub metrics: Vec<DateRangeValues>,
}

impl ReportRow {
    /// Build a row from dimension values and a single metric group.
    pub fn new(
        dimensions: impl IntoIterator<Item = impl Into<String>>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            dimensions: dimensions.into_iter().map(Into::into).collect(),
            metrics: vec![DateRangeValues {
                values: values.into_iter().map(Into::into).collect(),
                extra: Map::new(),
            }],
        }
    }

    /// First dimension value (the country).
    pub fn country(&self) -> Option<&str> {
        self.dimensions.first().map(String::as_str)
    }

    /// First value of the first metric group (the session count).
    pub fn sessions(&self) -> Option<&str> {
        self.metrics.first()?.values.first().map(String::as_str)
    }
}

/// Metric values for one date range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeValues {
    #[serde(default)]
    pub values: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
