//! Report client and service-account session tests against a local mock API.

#[path = "../support/mod.rs"]
mod support;

use std::time::Duration;

use analytics_export::auth::{ServiceAccountKey, ServiceAccountProvider, Session, SessionProvider};
use analytics_export::config::DEFAULT_SCOPE;
use analytics_export::report::{extract_all, DateRange, FlatRecord, ReportClient, ReportSource};
use analytics_export::Error;
use chrono::Utc;
use support::{closed_port_url, MockServer, BATCH_GET_PATH, SAMPLE_RESPONSE, TOKEN_PATH};

const FIXTURE_KEY: &str = include_str!("../fixtures/service_account.json");

fn range() -> DateRange {
    DateRange::parse("2023-01-01", "2023-01-31").unwrap()
}

fn client(base_url: &str) -> ReportClient {
    ReportClient::new(base_url, "123456", Duration::from_secs(5)).unwrap()
}

// ============================================================================
// batchGet
// ============================================================================

#[tokio::test]
async fn test_fetch_sends_fixed_query() {
    let server = MockServer::new()
        .route(BATCH_GET_PATH, 200, SAMPLE_RESPONSE)
        .spawn()
        .await;

    let response = client(&server.base_url)
        .fetch(&Session::bearer("ya29.token"), &range())
        .await
        .unwrap();

    assert_eq!(
        extract_all(&response).unwrap(),
        vec![FlatRecord::new("US", "42"), FlatRecord::new("FR", "7")]
    );

    let captured = server.captured();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].path, BATCH_GET_PATH);
    assert_eq!(captured[0].authorization.as_deref(), Some("Bearer ya29.token"));

    let body: serde_json::Value = serde_json::from_str(&captured[0].body).unwrap();
    let request = &body["reportRequests"][0];
    assert_eq!(request["viewId"], "123456");
    assert_eq!(request["dateRanges"][0]["startDate"], "2023-01-01");
    assert_eq!(request["dateRanges"][0]["endDate"], "2023-01-31");
    assert_eq!(request["metrics"][0]["expression"], "ga:sessions");
    assert_eq!(request["dimensions"][0]["name"], "ga:country");
}

#[tokio::test]
async fn test_forbidden_is_auth_error() {
    let server = MockServer::new()
        .route(
            BATCH_GET_PATH,
            403,
            r#"{"error": {"code": 403, "message": "User does not have sufficient permissions for this profile.", "status": "PERMISSION_DENIED"}}"#,
        )
        .spawn()
        .await;

    let err = client(&server.base_url)
        .fetch(&Session::bearer("ya29.token"), &range())
        .await
        .unwrap_err();

    match err {
        Error::Auth(message) => {
            assert!(message.contains("403"));
            assert!(message.contains("sufficient permissions"));
        }
        other => panic!("expected auth error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_is_auth_error() {
    let server = MockServer::new()
        .route(BATCH_GET_PATH, 401, r#"{"error": {"code": 401, "message": "Invalid Credentials"}}"#)
        .spawn()
        .await;

    let err = client(&server.base_url)
        .fetch(&Session::bearer("stale"), &range())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
}

#[tokio::test]
async fn test_server_error_is_request_error() {
    let server = MockServer::new()
        .route(BATCH_GET_PATH, 503, r#"{"error": {"code": 503, "message": "The service is currently unavailable."}}"#)
        .spawn()
        .await;

    let err = client(&server.base_url)
        .fetch(&Session::bearer("ya29.token"), &range())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Request { status: Some(503), .. }));
}

#[tokio::test]
async fn test_malformed_body_is_request_error() {
    let server = MockServer::new()
        .route(BATCH_GET_PATH, 200, r#"{"reports": "not a list"}"#)
        .spawn()
        .await;

    let err = client(&server.base_url)
        .fetch(&Session::bearer("ya29.token"), &range())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Request { status: Some(200), .. }));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_request_error() {
    let err = client(&closed_port_url().await)
        .fetch(&Session::bearer("ya29.token"), &range())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Request { status: None, .. }));
}

#[tokio::test]
async fn test_expired_session_is_rejected_before_sending() {
    let server = MockServer::new()
        .route(BATCH_GET_PATH, 200, SAMPLE_RESPONSE)
        .spawn()
        .await;

    let expired = Session::new("ya29.token", Utc::now() - chrono::Duration::minutes(1));
    let err = client(&server.base_url)
        .fetch(&expired, &range())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Auth(_)));
    assert!(server.captured().is_empty());
}

#[tokio::test]
async fn test_paginated_report_returns_first_page() {
    let server = MockServer::new()
        .route(
            BATCH_GET_PATH,
            200,
            r#"{"reports": [{"data": {"rows": [{"dimensions": ["US"], "metrics": [{"values": ["42"]}]}]}, "nextPageToken": "1"}]}"#,
        )
        .spawn()
        .await;

    let response = client(&server.base_url)
        .fetch(&Session::bearer("ya29.token"), &range())
        .await
        .unwrap();
    assert_eq!(response.reports[0].next_page_token.as_deref(), Some("1"));
    assert_eq!(response.row_count(), 1);
}

// ============================================================================
// Service-account sessions
// ============================================================================

fn fixture_key(token_uri: String) -> ServiceAccountKey {
    let mut key = ServiceAccountKey::from_json(FIXTURE_KEY).unwrap();
    key.token_uri = token_uri;
    key
}

#[tokio::test]
async fn test_service_account_exchanges_assertion() {
    let server = MockServer::new()
        .route(
            TOKEN_PATH,
            200,
            r#"{"access_token": "ya29.issued", "expires_in": 3599, "token_type": "Bearer"}"#,
        )
        .spawn()
        .await;

    let provider = ServiceAccountProvider::new(
        fixture_key(server.url(TOKEN_PATH)),
        DEFAULT_SCOPE,
        Duration::from_secs(5),
    )
    .unwrap();

    let before = Utc::now();
    let session = provider.session().await.unwrap();
    assert_eq!(session.access_token(), "ya29.issued");
    let expires_at = session.expires_at().unwrap();
    assert!(expires_at > before + chrono::Duration::seconds(3500));
    assert!(!session.is_expired());

    let captured = server.captured();
    assert_eq!(captured.len(), 1);
    assert_eq!(
        captured[0].content_type.as_deref(),
        Some("application/x-www-form-urlencoded")
    );
    assert!(captured[0]
        .body
        .contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"));
    let assertion = captured[0]
        .body
        .split('&')
        .find_map(|pair| pair.strip_prefix("assertion="))
        .unwrap();
    assert_eq!(assertion.split('.').count(), 3);
}

#[tokio::test]
async fn test_rejected_grant_is_auth_error() {
    let server = MockServer::new()
        .route(
            TOKEN_PATH,
            400,
            r#"{"error": "invalid_grant", "error_description": "Invalid JWT Signature."}"#,
        )
        .spawn()
        .await;

    let provider = ServiceAccountProvider::new(
        fixture_key(server.url(TOKEN_PATH)),
        DEFAULT_SCOPE,
        Duration::from_secs(5),
    )
    .unwrap();

    match provider.session().await.unwrap_err() {
        Error::Auth(message) => {
            assert!(message.contains("invalid_grant"));
            assert!(message.contains("Invalid JWT Signature."));
        }
        other => panic!("expected auth error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_token_endpoint_is_auth_error() {
    let provider = ServiceAccountProvider::new(
        fixture_key(format!("{}{}", closed_port_url().await, TOKEN_PATH)),
        DEFAULT_SCOPE,
        Duration::from_secs(5),
    )
    .unwrap();

    assert!(matches!(provider.session().await, Err(Error::Auth(_))));
}
