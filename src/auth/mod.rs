//! Authenticated sessions for the reporting API.
//!
//! The pipeline never handles credentials directly. It asks a
//! [`SessionProvider`] for a [`Session`] (a bearer token with an optional
//! expiry) and hands that to the report client.
//!
//! Two providers are available:
//! - [`ServiceAccountProvider`]: signs a JWT with a service-account key and
//!   exchanges it at the token endpoint (OAuth 2.0 JWT bearer grant)
//! - [`StaticTokenProvider`]: wraps an access token obtained elsewhere

pub mod jwt;
pub mod key;

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::ReportSettings;
use crate::error::{Error, Result};
use jwt::{AssertionSigner, Claims};
pub use key::ServiceAccountKey;

/// Grant type for exchanging a signed assertion for an access token.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Bearer token for the reporting API.
#[derive(Clone)]
pub struct Session {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a session that expires at the given instant.
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: Some(expires_at),
        }
    }

    /// Create a session with no known expiry.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    /// The bearer token.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// When the token stops being accepted, if known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token had expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    /// Whether the token has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of authenticated sessions.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Establish a session.
    ///
    /// Fails with `Error::Config` for unusable credentials and `Error::Auth`
    /// when the authorization server rejects them.
    async fn session(&self) -> Result<Session>;
}

/// Provider handing out a pre-issued access token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    session: Session,
}

impl StaticTokenProvider {
    /// Wrap an access token.
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(Error::config("access token is empty"));
        }
        Ok(Self {
            session: Session::bearer(access_token),
        })
    }

    /// Wrap an existing session.
    pub fn from_session(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl SessionProvider for StaticTokenProvider {
    async fn session(&self) -> Result<Session> {
        Ok(self.session.clone())
    }
}

/// Build the provider the settings call for.
///
/// A key file takes precedence over an access token; having neither is a
/// configuration error.
pub fn provider_from_settings(settings: &ReportSettings) -> Result<Box<dyn SessionProvider>> {
    if let Some(key_file) = settings.resolved_key_file()? {
        let provider =
            ServiceAccountProvider::from_key_file(&key_file, &settings.scope, settings.timeout()?)?;
        tracing::debug!(client_email = %provider.client_email(), "using service-account key");
        return Ok(Box::new(provider));
    }
    if let Some(token) = settings.resolved_access_token()? {
        tracing::debug!("using pre-issued access token");
        return Ok(Box::new(StaticTokenProvider::new(token)?));
    }
    Err(Error::config(
        "no credentials configured: set report.key_file or report.access_token",
    ))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Provider exchanging service-account assertions for access tokens.
#[derive(Debug)]
pub struct ServiceAccountProvider {
    key: ServiceAccountKey,
    signer: AssertionSigner,
    scope: String,
    http: reqwest::Client,
}

impl ServiceAccountProvider {
    /// Load a key file and prepare the signer.
    ///
    /// The key is parsed here so a missing or malformed file fails before any
    /// request is attempted.
    pub fn from_key_file(
        path: impl AsRef<Path>,
        scope: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let key = ServiceAccountKey::from_file(path)?;
        Self::new(key, scope, timeout)
    }

    /// Create a provider from a parsed key.
    pub fn new(key: ServiceAccountKey, scope: impl Into<String>, timeout: Duration) -> Result<Self> {
        let der = key.private_key_der()?;
        let signer = AssertionSigner::from_pkcs8(&der)
            .map_err(|e| Error::config(format!("service-account key: {}", e)))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            key,
            signer,
            scope: scope.into(),
            http,
        })
    }

    /// The service account this provider authenticates as.
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims::new(
            &self.key.client_email,
            &self.scope,
            &self.key.token_uri,
            now,
        );
        self.signer
            .sign(&claims, self.key.private_key_id.as_deref())
            .map_err(|e| Error::Auth(format!("cannot sign assertion: {}", e)))
    }
}

#[async_trait]
impl SessionProvider for ServiceAccountProvider {
    async fn session(&self) -> Result<Session> {
        let now = Utc::now();
        let assertion = self.assertion(now)?;

        tracing::debug!(
            client_email = %self.key.client_email,
            token_uri = %self.key.token_uri,
            "exchanging service-account assertion"
        );

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| Error::Auth(format!("token endpoint unreachable: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Auth(format!("cannot read token response: {}", e)))?;

        if !status.is_success() {
            let detail = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(Error::Auth(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                detail
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Auth(format!("malformed token response: {}", e)))?;

        let session = match token.expires_in {
            Some(secs) => Session::new(token.access_token, now + chrono::Duration::seconds(secs)),
            None => Session::bearer(token.access_token),
        };
        tracing::info!(client_email = %self.key.client_email, "session established");
        Ok(session)
    }
}
