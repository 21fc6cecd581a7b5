//! Flattening of a report response into `(country, sessions)` records.

use std::iter::FusedIterator;

use serde::Serialize;

use super::types::{RawReportResponse, ReportRow};
use crate::error::{Error, Result};

/// One extracted row.
///
/// `sessions` is kept as the API sent it; sinks decide how to type it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatRecord {
    pub country: String,
    pub sessions: String,
}

impl FlatRecord {
    pub fn new(country: impl Into<String>, sessions: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            sessions: sessions.into(),
        }
    }
}

/// Lazy walk over every row of every report, in response order.
///
/// Yields `Err(Error::MalformedRow)` for the first row without a country or
/// sessions value, then ends.
#[derive(Debug)]
pub struct Rows<'a> {
    response: &'a RawReportResponse,
    report: usize,
    row: usize,
    done: bool,
}

impl<'a> Rows<'a> {
    fn new(response: &'a RawReportResponse) -> Self {
        Self {
            response,
            report: 0,
            row: 0,
            done: false,
        }
    }
}

impl Iterator for Rows<'_> {
    type Item = Result<FlatRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let Some(report) = self.response.reports.get(self.report) else {
                self.done = true;
                return None;
            };
            let Some(row) = report.rows().get(self.row) else {
                self.report += 1;
                self.row = 0;
                continue;
            };

            let item = flatten(row).map_err(|reason| Error::MalformedRow {
                report: self.report,
                row: self.row,
                reason,
            });
            self.row += 1;
            if item.is_err() {
                self.done = true;
            }
            return Some(item);
        }
    }
}

impl FusedIterator for Rows<'_> {}

fn flatten(row: &ReportRow) -> std::result::Result<FlatRecord, &'static str> {
    let country = row.country().ok_or("missing country dimension")?;
    let metrics = row.metrics.first().ok_or("missing metric group")?;
    let sessions = metrics.values.first().ok_or("missing sessions value")?;
    Ok(FlatRecord::new(country, sessions.as_str()))
}

/// Iterate the records of a response.
///
/// Walking the same response again yields the same sequence.
pub fn extract(response: &RawReportResponse) -> Rows<'_> {
    Rows::new(response)
}

/// Collect every record, failing on the first malformed row.
pub fn extract_all(response: &RawReportResponse) -> Result<Vec<FlatRecord>> {
    extract(response).collect()
}
