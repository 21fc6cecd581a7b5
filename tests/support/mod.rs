//! Local stand-ins for the reporting API and the OAuth token endpoint.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;

pub const BATCH_GET_PATH: &str = "/v4/reports:batchGet";
pub const TOKEN_PATH: &str = "/token";

/// The two-row response used across tests.
pub const SAMPLE_RESPONSE: &str = r#"{
  "reports": [
    {
      "columnHeader": {
        "dimensions": ["ga:country"],
        "metricHeader": {"metricHeaderEntries": [{"name": "ga:sessions", "type": "INTEGER"}]}
      },
      "data": {
        "rows": [
          {"dimensions": ["US"], "metrics": [{"values": ["42"]}]},
          {"dimensions": ["FR"], "metrics": [{"values": ["7"]}]}
        ],
        "totals": [{"values": ["49"]}],
        "rowCount": 2
      }
    }
  ]
}"#;

/// A request the mock received.
#[derive(Debug, Clone)]
pub struct Captured {
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Default)]
struct MockState {
    routes: HashMap<String, (u16, String)>,
    captured: Mutex<Vec<Captured>>,
}

/// Builder for a mock HTTP server answering fixed responses per path.
#[derive(Default)]
pub struct MockServer {
    routes: HashMap<String, (u16, String)>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `path` with `status` and a JSON `body`.
    pub fn route(mut self, path: &str, status: u16, body: impl Into<String>) -> Self {
        self.routes.insert(path.to_string(), (status, body.into()));
        self
    }

    /// Bind to an ephemeral port and serve in the background.
    pub async fn spawn(self) -> RunningServer {
        let state = Arc::new(MockState {
            routes: self.routes,
            captured: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        RunningServer {
            base_url: format!("http://{}", addr),
            state,
        }
    }
}

pub struct RunningServer {
    pub base_url: String,
    state: Arc<MockState>,
}

impl RunningServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Requests received so far, in arrival order.
    pub fn captured(&self) -> Vec<Captured> {
        self.state.captured.lock().unwrap().clone()
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    state.captured.lock().unwrap().push(Captured {
        path: uri.path().to_string(),
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        body,
    });

    match state.routes.get(uri.path()) {
        Some((status, body)) => (
            StatusCode::from_u16(*status).unwrap(),
            [(header::CONTENT_TYPE, "application/json")],
            body.clone(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

/// An address nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
