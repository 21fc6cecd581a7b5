//! RS256 signing of OAuth 2.0 JWT bearer assertions.
//!
//! A service account proves its identity by signing a short-lived JWT with
//! its private key and exchanging it for an access token. Signing uses the
//! `ring` library; the key arrives as PKCS#8 DER (see [`super::key`]).
//!
//! # Example
//!
//! ```ignore
//! use analytics_export::auth::jwt::{AssertionSigner, Claims};
//!
//! let signer = AssertionSigner::from_pkcs8(&der)?;
//! let claims = Claims::new("svc@project.iam.gserviceaccount.com", scope, token_uri, now);
//! let assertion = signer.sign(&claims, Some("key-id"))?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use chrono::{DateTime, Duration, Utc};
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};
use serde::Serialize;
use thiserror::Error;

/// Lifetime requested for an assertion (the authorization server caps it at one hour).
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Result type for signing operations.
pub type SigningResult<T> = Result<T, SigningError>;

/// Errors that can occur while building an assertion.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The private key is not an RSA PKCS#8 key ring accepts.
    #[error("private key rejected: {0}")]
    KeyRejected(String),

    /// Signing failed.
    #[error("signing failed")]
    SigningFailed,

    /// The header or claims could not be serialized.
    #[error("failed to serialize assertion: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct Header<'a> {
    alg: &'static str,
    typ: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
}

/// Claims of a JWT bearer assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    /// Issuer: the service account email.
    pub iss: String,
    /// Space-separated OAuth scopes.
    pub scope: String,
    /// Audience: the token endpoint.
    pub aud: String,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl Claims {
    /// Build claims issued at `now` and valid for [`ASSERTION_LIFETIME_SECS`].
    pub fn new(
        issuer: impl Into<String>,
        scope: impl Into<String>,
        audience: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let exp = now + Duration::seconds(ASSERTION_LIFETIME_SECS);
        Self {
            iss: issuer.into(),
            scope: scope.into(),
            aud: audience.into(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }
}

/// Signs assertions with a service-account RSA key.
pub struct AssertionSigner {
    key_pair: RsaKeyPair,
    rng: SystemRandom,
}

impl AssertionSigner {
    /// Load a PKCS#8 DER-encoded RSA private key.
    ///
    /// # Errors
    ///
    /// Returns `SigningError::KeyRejected` if ring refuses the key (wrong
    /// algorithm, malformed DER, or a modulus below 2048 bits).
    pub fn from_pkcs8(der: &[u8]) -> SigningResult<Self> {
        let key_pair =
            RsaKeyPair::from_pkcs8(der).map_err(|e| SigningError::KeyRejected(e.to_string()))?;
        Ok(Self {
            key_pair,
            rng: SystemRandom::new(),
        })
    }

    /// Produce a compact `header.claims.signature` JWT.
    pub fn sign(&self, claims: &Claims, key_id: Option<&str>) -> SigningResult<String> {
        let header = Header {
            alg: "RS256",
            typ: "JWT",
            kid: key_id,
        };

        let mut message = BASE64URL.encode(serde_json::to_vec(&header)?);
        message.push('.');
        message.push_str(&BASE64URL.encode(serde_json::to_vec(claims)?));

        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(
                &RSA_PKCS1_SHA256,
                &self.rng,
                message.as_bytes(),
                &mut signature,
            )
            .map_err(|_| SigningError::SigningFailed)?;

        message.push('.');
        message.push_str(&BASE64URL.encode(&signature));
        Ok(message)
    }
}

impl std::fmt::Debug for AssertionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertionSigner").finish_non_exhaustive()
    }
}
