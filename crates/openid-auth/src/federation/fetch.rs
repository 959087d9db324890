//! HTTP retrieval of discovery and JWKS documents.
//!
//! Providers never talk to the network directly. They go through an
//! [`HttpFetcher`] handed to them at construction, which makes the transport
//! replaceable (custom TLS, proxies, test doubles) without reaching into the
//! provider internals.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::config::OidcConfig;
use crate::error::AuthError;

/// Raw response of a document fetch.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Bytes,
}

impl FetchedDocument {
    /// Creates a document from a status code and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx responses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to GET a URL.
///
/// Implementations report transport failures as [`AuthError::Fetch`].
/// Non-success statuses are returned as-is; the caller decides what they mean.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Fetches `url` and returns its status and body.
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument, AuthError>;
}

/// [`HttpFetcher`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    max_response_size: usize,
}

impl ReqwestFetcher {
    /// Creates a fetcher using the timeout and size limit from `config`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: &OidcConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AuthError::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self::from_client(client, config.max_response_size))
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn from_client(client: reqwest::Client, max_response_size: usize) -> Self {
        Self {
            client,
            max_response_size,
        }
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument, AuthError> {
        let response = self
            .client
            .get(url.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, error = %e, "HTTP request failed");
                AuthError::fetch(url.as_str(), e.to_string())
            })?;

        let status = response.status().as_u16();

        if let Some(len) = response.content_length() {
            if len as usize > self.max_response_size {
                return Err(too_large(url, self.max_response_size));
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::fetch(url.as_str(), e.to_string()))?;

        // Content-Length may be absent (chunked responses)
        if body.len() > self.max_response_size {
            return Err(too_large(url, self.max_response_size));
        }

        Ok(FetchedDocument { status, body })
    }
}

fn too_large(url: &Url, max_size: usize) -> AuthError {
    AuthError::fetch(
        url.as_str(),
        format!("Response exceeds maximum size of {max_size} bytes"),
    )
}

/// Fetches `url` through `fetcher`, bounded by `timeout`, and requires a 2xx status.
pub(crate) async fn fetch_document(
    fetcher: &dyn HttpFetcher,
    url: &Url,
    timeout: Duration,
) -> Result<FetchedDocument, AuthError> {
    let document = tokio::time::timeout(timeout, fetcher.fetch(url))
        .await
        .map_err(|_| {
            tracing::warn!(url = %url, ?timeout, "Fetch timed out");
            AuthError::fetch(url.as_str(), format!("timed out after {timeout:?}"))
        })??;

    if !document.is_success() {
        tracing::warn!(url = %url, status = document.status, "Fetch returned non-success status");
        return Err(AuthError::fetch(
            url.as_str(),
            format!("HTTP status {}", document.status),
        ));
    }

    Ok(document)
}

/// Validates that the URL uses an allowed scheme.
pub(crate) fn validate_scheme(url: &Url, allow_http: bool) -> Result<(), AuthError> {
    match url.scheme() {
        "https" => Ok(()),
        "http" if allow_http => Ok(()),
        scheme => Err(AuthError::fetch(
            url.as_str(),
            format!("Invalid URL scheme: {scheme} (only HTTPS is allowed)"),
        )),
    }
}
