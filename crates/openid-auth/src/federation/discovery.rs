//! OpenID Connect Discovery client and caching.
//!
//! This module fetches provider metadata from the
//! `.well-known/openid-configuration` endpoint of an issuer:
//!
//! - [`DiscoveryProvider`] - Capability returning the discovery document of an issuer
//! - [`HttpDiscoveryProvider`] - Default implementation over an [`HttpFetcher`]
//! - [`DiscoveryCache`] - Memoizes documents per issuer
//!
//! Discovery documents do not expire with time. An entry is replaced only when
//! the key resolver asks for it, after the issuer's JWKS could not be fetched
//! with the cached `jwks_uri`.
//!
//! # Security Considerations
//!
//! - Only HTTPS issuer URLs are allowed (configurable for testing)
//! - The issuer in the document must match the issuer it was fetched for
//! - Fetches are bounded by the configured timeout

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use url::Url;

use super::fetch::{HttpFetcher, fetch_document, validate_scheme};
use super::oidc::DiscoveryDocument;
use crate::config::OidcConfig;
use crate::error::AuthError;

/// Capability returning the discovery document of an issuer.
#[async_trait]
pub trait DiscoveryProvider: Send + Sync {
    /// Fetches the discovery document for `issuer`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Fetch` when the document cannot be retrieved and
    /// `AuthError::Decode` when it is malformed or names another issuer.
    async fn get(&self, issuer: &str) -> Result<DiscoveryDocument, AuthError>;
}

/// Fetches discovery documents over HTTP.
pub struct HttpDiscoveryProvider {
    fetcher: Arc<dyn HttpFetcher>,
    request_timeout: Duration,
    allow_http: bool,
}

impl HttpDiscoveryProvider {
    /// Creates a provider using `fetcher` for transport.
    #[must_use]
    pub fn new(fetcher: Arc<dyn HttpFetcher>, config: &OidcConfig) -> Self {
        Self {
            fetcher,
            request_timeout: config.request_timeout,
            allow_http: config.allow_http,
        }
    }

    /// Builds the discovery URL from an issuer URL.
    ///
    /// The document lives at `{issuer}/.well-known/openid-configuration`,
    /// keeping any path component of the issuer.
    fn build_discovery_url(issuer: &Url) -> Url {
        let mut discovery_url = issuer.clone();

        let path = issuer.path().trim_end_matches('/');
        discovery_url.set_path(&format!("{}/.well-known/openid-configuration", path));

        discovery_url
    }
}

#[async_trait]
impl DiscoveryProvider for HttpDiscoveryProvider {
    async fn get(&self, issuer: &str) -> Result<DiscoveryDocument, AuthError> {
        let issuer_url = Url::parse(issuer)
            .map_err(|e| AuthError::fetch(issuer, format!("Invalid issuer URL: {e}")))?;
        validate_scheme(&issuer_url, self.allow_http)?;

        let discovery_url = Self::build_discovery_url(&issuer_url);
        tracing::debug!(issuer = %issuer, url = %discovery_url, "Fetching OIDC discovery document");

        let response =
            fetch_document(self.fetcher.as_ref(), &discovery_url, self.request_timeout).await?;

        let document = DiscoveryDocument::from_json(&response.body).map_err(|e| {
            tracing::warn!(issuer = %issuer, error = %e, "Failed to decode OIDC discovery document");
            e
        })?;

        // "The issuer value returned MUST be identical to the Issuer URL that
        // was directly used to retrieve the configuration information."
        if normalize_issuer(&document.issuer) != normalize_issuer(issuer) {
            return Err(AuthError::decode(format!(
                "Discovery issuer mismatch: expected {}, got {}",
                normalize_issuer(issuer),
                normalize_issuer(&document.issuer)
            )));
        }

        Ok(document)
    }
}

/// In-memory cache of discovery documents, keyed by normalized issuer.
pub struct DiscoveryCache {
    provider: Arc<dyn DiscoveryProvider>,
    cache: RwLock<HashMap<String, DiscoveryDocument>>,
}

impl DiscoveryCache {
    /// Creates an empty cache in front of `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn DiscoveryProvider>) -> Self {
        Self {
            provider,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Gets a discovery document, fetching it on first use.
    ///
    /// # Errors
    ///
    /// Propagates the provider's error when the document is not cached and
    /// cannot be fetched.
    pub async fn get(&self, issuer: &str) -> Result<DiscoveryDocument, AuthError> {
        let key = normalize_issuer(issuer);

        if let Some(document) = self.cache.read().await.get(key) {
            tracing::trace!(issuer = %issuer, "Cache hit for OIDC discovery");
            return Ok(document.clone());
        }

        self.refresh(issuer).await
    }

    /// Fetches a fresh document and replaces the cached one.
    ///
    /// # Errors
    ///
    /// Propagates the provider's error; the cached entry is left untouched.
    pub async fn refresh(&self, issuer: &str) -> Result<DiscoveryDocument, AuthError> {
        let document = self.provider.get(issuer).await?;

        self.cache
            .write()
            .await
            .insert(normalize_issuer(issuer).to_string(), document.clone());

        Ok(document)
    }

    /// Removes the cached document for `issuer`.
    pub async fn invalidate(&self, issuer: &str) {
        self.cache.write().await.remove(normalize_issuer(issuer));
        tracing::debug!(issuer = %issuer, "Invalidated cache for OIDC discovery");
    }

    /// Clears all entries from the cache.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    /// Returns the number of entries in the cache.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Returns `true` if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }
}

/// Normalizes an issuer for comparison and cache lookups.
///
/// This removes trailing slashes to ensure consistent lookups.
pub(crate) fn normalize_issuer(issuer: &str) -> &str {
    issuer.trim_end_matches('/')
}
