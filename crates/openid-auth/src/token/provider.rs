//! Trusted issuers and their client IDs.
//!
//! A [`Provider`] pairs an issuer with the client IDs whose tokens it may
//! sign for this service. Which providers apply to a request is decided by a
//! [`ProvidersGetter`], so multi-tenant services can pick them per request.

use async_trait::async_trait;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// An accepted issuer and its client IDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Issuer URL, as it appears in the `iss` claim.
    pub issuer: String,

    /// Client IDs accepted in the `aud` claim.
    pub client_ids: Vec<String>,
}

impl Provider {
    /// Creates a provider.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the issuer is empty or no client
    /// ID is given.
    pub fn new<I, S>(issuer: impl Into<String>, client_ids: I) -> Result<Self, AuthError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = Self {
            issuer: issuer.into(),
            client_ids: client_ids.into_iter().map(Into::into).collect(),
        };
        provider.check()?;
        Ok(provider)
    }

    /// Checks that the provider is usable.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the issuer is empty or the
    /// client ID list is empty or contains an empty ID.
    pub fn check(&self) -> Result<(), AuthError> {
        if self.issuer.trim().is_empty() {
            return Err(AuthError::configuration("provider issuer cannot be empty"));
        }
        if self.client_ids.is_empty() {
            return Err(AuthError::configuration(format!(
                "provider {} has no client IDs",
                self.issuer
            )));
        }
        if self.client_ids.iter().any(|id| id.is_empty()) {
            return Err(AuthError::configuration(format!(
                "provider {} has an empty client ID",
                self.issuer
            )));
        }
        Ok(())
    }

    /// Returns `true` if `issuer` is exactly this provider's issuer.
    #[must_use]
    pub fn matches_issuer(&self, issuer: &str) -> bool {
        self.issuer == issuer
    }

    /// Returns `true` if any of `audience` is one of this provider's client IDs.
    #[must_use]
    pub fn accepts_audience(&self, audience: &[String]) -> bool {
        audience.iter().any(|aud| self.client_ids.contains(aud))
    }
}

/// Selects the providers accepted for a request.
#[async_trait]
pub trait ProvidersGetter: Send + Sync {
    /// Returns the providers whose tokens are accepted for `parts`.
    ///
    /// # Errors
    ///
    /// Implementations return `AuthError::Configuration` when the accepted
    /// providers cannot be determined.
    async fn providers(&self, parts: &Parts) -> Result<Vec<Provider>, AuthError>;
}

/// The same providers for every request.
#[derive(Debug, Clone, Default)]
pub struct StaticProviders {
    providers: Vec<Provider>,
}

impl StaticProviders {
    /// Creates a getter returning `providers`.
    #[must_use]
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl ProvidersGetter for StaticProviders {
    async fn providers(&self, _parts: &Parts) -> Result<Vec<Provider>, AuthError> {
        Ok(self.providers.clone())
    }
}
