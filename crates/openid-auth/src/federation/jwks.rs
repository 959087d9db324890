//! JSON Web Key Set retrieval.
//!
//! - [`Jwk`] - A single key as published by the provider
//! - [`JwksDocument`] - The decoded `keys` array, in publication order
//! - [`JwksProvider`] - Capability returning the key set behind a `jwks_uri`
//! - [`HttpJwksProvider`] - Default implementation over an [`HttpFetcher`]
//!
//! Keys are decoded loosely: a key with an unsupported `kty` or missing
//! parameters is kept as-is and only rejected when it is converted to a
//! public key, so one odd key never hides the others.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::fetch::{HttpFetcher, fetch_document, validate_scheme};
use crate::config::OidcConfig;
use crate::error::AuthError;

/// A JSON Web Key (RFC 7517).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Key type (`RSA`, `EC`, ...).
    #[serde(default)]
    pub kty: String,

    /// Intended algorithm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Intended use (`sig` or `enc`).
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// EC curve name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC x coordinate (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// Any other members, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Jwk {
    /// Returns `true` if the key is published for encryption only.
    #[must_use]
    pub fn is_encryption_key(&self) -> bool {
        self.key_use.as_deref() == Some("enc")
    }
}

/// A decoded JWKS document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwksDocument {
    /// Keys in the order the provider published them.
    pub keys: Vec<Jwk>,
}

impl JwksDocument {
    /// Decodes a JWKS document from a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Decode` if the body is not JSON or has no `keys` array.
    pub fn from_json(body: &[u8]) -> Result<Self, AuthError> {
        serde_json::from_slice(body).map_err(|e| AuthError::decode(format!("Invalid JWKS: {e}")))
    }

    /// Finds a key by ID.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }
}

/// Capability returning the key set published at a `jwks_uri`.
#[async_trait]
pub trait JwksProvider: Send + Sync {
    /// Fetches and decodes the key set at `jwks_uri`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Fetch` when the document cannot be retrieved and
    /// `AuthError::Decode` when it is malformed.
    async fn get(&self, jwks_uri: &str) -> Result<JwksDocument, AuthError>;
}

/// Fetches key sets over HTTP.
pub struct HttpJwksProvider {
    fetcher: Arc<dyn HttpFetcher>,
    request_timeout: Duration,
    allow_http: bool,
}

impl HttpJwksProvider {
    /// Creates a provider using `fetcher` for transport.
    #[must_use]
    pub fn new(fetcher: Arc<dyn HttpFetcher>, config: &OidcConfig) -> Self {
        Self {
            fetcher,
            request_timeout: config.request_timeout,
            allow_http: config.allow_http,
        }
    }
}

#[async_trait]
impl JwksProvider for HttpJwksProvider {
    async fn get(&self, jwks_uri: &str) -> Result<JwksDocument, AuthError> {
        let url = Url::parse(jwks_uri)
            .map_err(|e| AuthError::fetch(jwks_uri, format!("Invalid JWKS URI: {e}")))?;
        validate_scheme(&url, self.allow_http)?;

        tracing::debug!(url = %url, "Fetching JWKS");

        let response = fetch_document(self.fetcher.as_ref(), &url, self.request_timeout).await?;

        let document = JwksDocument::from_json(&response.body).map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Failed to decode JWKS");
            e
        })?;

        tracing::debug!(url = %url, key_count = document.keys.len(), "Fetched JWKS");

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::fetch::FetchedDocument;

    struct StubFetcher {
        status: u16,
        body: &'static str,
    }

    #[async_trait]
    impl HttpFetcher for StubFetcher {
        async fn fetch(&self, _url: &Url) -> Result<FetchedDocument, AuthError> {
            Ok(FetchedDocument::new(self.status, self.body))
        }
    }

    fn provider(status: u16, body: &'static str) -> HttpJwksProvider {
        HttpJwksProvider::new(Arc::new(StubFetcher { status, body }), &OidcConfig::default())
    }

    #[test]
    fn test_decode_rsa_and_ec_keys() {
        let json = br#"{"keys": [
            {"kty": "RSA", "kid": "r1", "use": "sig", "alg": "RS256", "n": "AQAB", "e": "AQAB"},
            {"kty": "EC", "kid": "e1", "crv": "P-256", "x": "AA", "y": "AA"}
        ]}"#;
        let jwks = JwksDocument::from_json(json).unwrap();

        assert_eq!(jwks.keys.len(), 2);
        assert_eq!(jwks.keys[0].kid.as_deref(), Some("r1"));
        assert_eq!(jwks.keys[0].key_use.as_deref(), Some("sig"));
        assert_eq!(jwks.keys[1].crv.as_deref(), Some("P-256"));
        assert!(jwks.find("e1").is_some());
        assert!(jwks.find("missing").is_none());
    }

    #[test]
    fn test_unknown_kty_is_kept() {
        let json = br#"{"keys": [
            {"kty": "OKP", "kid": "ed1", "crv": "Ed25519", "x": "AA"},
            {"kty": "oct", "kid": "h1", "k": "c2VjcmV0"}
        ]}"#;
        let jwks = JwksDocument::from_json(json).unwrap();

        assert_eq!(jwks.keys.len(), 2);
        assert_eq!(jwks.keys[0].kty, "OKP");
        assert_eq!(
            jwks.keys[1].extra.get("k").and_then(|v| v.as_str()),
            Some("c2VjcmV0")
        );
    }

    #[test]
    fn test_missing_keys_is_decode_error() {
        let err = JwksDocument::from_json(br#"{"other": []}"#).unwrap_err();
        assert!(matches!(err, AuthError::Decode { .. }));
    }

    #[test]
    fn test_encryption_key_detection() {
        let jwks = JwksDocument::from_json(
            br#"{"keys": [{"kty": "RSA", "kid": "x", "use": "enc"}, {"kty": "RSA", "kid": "y"}]}"#,
        )
        .unwrap();
        assert!(jwks.keys[0].is_encryption_key());
        assert!(!jwks.keys[1].is_encryption_key());
    }

    #[tokio::test]
    async fn test_provider_fetches_and_decodes() {
        let jwks = provider(200, r#"{"keys": [{"kty": "RSA", "kid": "k1"}]}"#)
            .get("https://idp.example.com/jwks")
            .await
            .unwrap();
        assert_eq!(jwks.keys.len(), 1);
    }

    #[tokio::test]
    async fn test_provider_maps_status_to_fetch_error() {
        let err = provider(404, "")
            .get("https://idp.example.com/jwks")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_provider_rejects_invalid_json() {
        let err = provider(200, "not json")
            .get("https://idp.example.com/jwks")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_provider_rejects_http_uri() {
        let err = provider(200, r#"{"keys": []}"#)
            .get("http://idp.example.com/jwks")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("only HTTPS"));
    }
}
