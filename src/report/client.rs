//! HTTP client for the Analytics Reporting API v4.
//!
//! Issues a single `reports:batchGet` query for sessions per country over a
//! date range. The query shape is fixed.
//!
//! # Example
//!
//! ```ignore
//! use analytics_export::report::{DateRange, ReportClient, ReportSource};
//!
//! let client = ReportClient::new(DEFAULT_ENDPOINT, "123456", Duration::from_secs(30))?;
//! let response = client.fetch(&session, &DateRange::parse("2023-01-01", "2023-01-31")?).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::{DateRange, RawReportResponse};
use crate::auth::Session;
use crate::config::ReportSettings;
use crate::error::{Error, Result};

/// Path of the batch query, relative to the API base URL.
pub const BATCH_GET_PATH: &str = "/v4/reports:batchGet";

/// Dimension reported on.
pub const COUNTRY_DIMENSION: &str = "ga:country";

/// Metric reported.
pub const SESSIONS_METRIC: &str = "ga:sessions";

/// Something that can run the report query.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Fetch the report for `range`.
    ///
    /// Fails with `Error::Auth` when the session is expired or rejected and
    /// `Error::Request` for any other failure.
    async fn fetch(&self, session: &Session, range: &DateRange) -> Result<RawReportResponse>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetRequest<'a> {
    report_requests: [ReportRequest<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportRequest<'a> {
    view_id: &'a str,
    date_ranges: [&'a DateRange; 1],
    metrics: [Metric; 1],
    dimensions: [Dimension; 1],
}

#[derive(Debug, Serialize)]
struct Metric {
    expression: &'static str,
}

#[derive(Debug, Serialize)]
struct Dimension {
    name: &'static str,
}

impl<'a> BatchGetRequest<'a> {
    fn sessions_by_country(view_id: &'a str, range: &'a DateRange) -> Self {
        Self {
            report_requests: [ReportRequest {
                view_id,
                date_ranges: [range],
                metrics: [Metric {
                    expression: SESSIONS_METRIC,
                }],
                dimensions: [Dimension {
                    name: COUNTRY_DIMENSION,
                }],
            }],
        }
    }
}

/// Google API error envelope.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Reporting API client bound to one view.
#[derive(Debug, Clone)]
pub struct ReportClient {
    http: reqwest::Client,
    url: String,
    view_id: String,
}

impl ReportClient {
    /// Create a client.
    ///
    /// `endpoint` is the API base URL (without the `/v4/...` path); `timeout`
    /// bounds the whole request, including reading the body.
    pub fn new(endpoint: &str, view_id: impl Into<String>, timeout: Duration) -> Result<Self> {
        let view_id = view_id.into();
        if view_id.trim().is_empty() {
            return Err(Error::config("view id is empty"));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: format!("{}{}", endpoint.trim_end_matches('/'), BATCH_GET_PATH),
            view_id,
        })
    }

    /// Create a client from the `[report]` settings.
    pub fn from_settings(settings: &ReportSettings) -> Result<Self> {
        let endpoint = crate::config::expand_env_vars(&settings.endpoint)?;
        Self::new(&endpoint, settings.resolved_view_id()?, settings.timeout()?)
    }

    /// The view queried.
    pub fn view_id(&self) -> &str {
        &self.view_id
    }

    /// Full URL of the batch query.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReportSource for ReportClient {
    async fn fetch(&self, session: &Session, range: &DateRange) -> Result<RawReportResponse> {
        if session.is_expired() {
            return Err(Error::Auth("session has expired".into()));
        }

        tracing::debug!(view_id = %self.view_id, range = %range, url = %self.url, "requesting report");

        let body = BatchGetRequest::sessions_by_country(&self.view_id, range);
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(session.access_token())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let detail = api_error_message(&text);
            return Err(match status.as_u16() {
                401 | 403 => Error::Auth(format!("reporting API returned {}: {}", status.as_u16(), detail)),
                code => Error::Request {
                    status: Some(code),
                    message: detail,
                },
            });
        }

        let response: RawReportResponse =
            serde_json::from_str(&text).map_err(|e| Error::Request {
                status: Some(status.as_u16()),
                message: format!("malformed response body: {}", e),
            })?;

        for (index, report) in response.reports.iter().enumerate() {
            if report.next_page_token.is_some() {
                tracing::warn!(
                    report = index,
                    rows = report.rows().len(),
                    "report has further pages; only the first page is exported"
                );
            }
        }

        tracing::info!(
            reports = response.reports.len(),
            rows = response.row_count(),
            "report received"
        );
        Ok(response)
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    let message = if e.is_timeout() {
        format!("timed out: {}", e)
    } else {
        e.to_string()
    };
    Error::Request {
        status: e.status().map(|s| s.as_u16()),
        message,
    }
}

fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(ApiErrorResponse { error }) => match error.status {
            Some(status) => format!("{} ({})", error.message, status),
            None => error.message,
        },
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
