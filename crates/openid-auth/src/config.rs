//! Validator configuration.
//!
//! [`OidcConfig`] collects the settings shared by the fetchers, the key cache
//! and the token validator. It deserializes from any serde format, with
//! durations written in humantime notation.
//!
//! # Example (TOML)
//!
//! ```toml
//! request_timeout = "5s"
//! leeway = "30s"
//!
//! [[providers]]
//! issuer = "https://accounts.example.com"
//! client_ids = ["my-client"]
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::token::provider::Provider;

/// Root configuration for ID token validation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OidcConfig {
    /// Issuers accepted by the default providers getter, with their client IDs.
    pub providers: Vec<Provider>,

    /// HTTP request timeout for discovery and JWKS fetches.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Maximum accepted size of a discovery or JWKS response body, in bytes.
    pub max_response_size: usize,

    /// Whether to allow HTTP (non-HTTPS) issuer and JWKS URLs.
    /// This should only be enabled for testing.
    pub allow_http: bool,

    /// Clock skew tolerated when checking `exp` and `nbf`.
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,

    /// Realm advertised in `WWW-Authenticate` challenges.
    pub realm: String,
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            request_timeout: Duration::from_secs(10), // 10 seconds
            max_response_size: 1024 * 1024,           // 1 MB
            allow_http: false,
            leeway: Duration::ZERO,
            realm: "openid".to_string(),
        }
    }
}

impl OidcConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an accepted provider.
    #[must_use]
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.providers.push(provider);
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the maximum response size.
    #[must_use]
    pub fn with_max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }

    /// Allows HTTP (non-HTTPS) issuer and JWKS URLs.
    ///
    /// # Warning
    ///
    /// This should only be used for testing. Discovery and JWKS retrieval
    /// should always use HTTPS in production.
    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// Sets the clock skew tolerance.
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Sets the `WWW-Authenticate` realm.
    #[must_use]
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The request timeout or maximum response size is zero
    /// - A provider has an empty issuer or no client IDs
    /// - The realm contains a double quote
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "request_timeout must be > 0".to_string(),
            ));
        }

        if self.max_response_size == 0 {
            return Err(ConfigError::InvalidValue(
                "max_response_size must be > 0".to_string(),
            ));
        }

        for provider in &self.providers {
            provider
                .check()
                .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        }

        if self.realm.contains('"') {
            return Err(ConfigError::InvalidValue(
                "realm cannot contain '\"'".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
