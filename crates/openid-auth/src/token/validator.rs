//! ID token validation.
//!
//! [`IdTokenValidator`] runs every presented token through the same steps and
//! stops at the first failure:
//!
//! 1. Read `kid`, `alg` and `iss` without trusting them
//! 2. Match `iss` against the providers accepted for the request
//! 3. Look up the signing key (refreshing the issuer's keys on a miss)
//! 4. Verify the signature
//! 5. Check issuer, audience, expiry and not-before
//!
//! Only the key lookup in step 3 ever retries anything.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::request::Parts;

use super::claims::{IdTokenClaims, ValidatedToken};
use super::provider::{Provider, ProvidersGetter, StaticProviders};
use super::unverified::UnverifiedToken;
use super::verifier::{JwtTokenVerifier, TokenVerifier};
use crate::config::OidcConfig;
use crate::error::AuthError;
use crate::federation::fetch::{HttpFetcher, ReqwestFetcher};
use crate::federation::key_set::{DefaultKeySetResolver, KeySetResolver};
use crate::federation::signing_key::SigningKeyCache;

/// Validates raw ID tokens presented with a request.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Validates `token` against the providers accepted for `parts`.
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` of the first step that fails.
    async fn validate(&self, parts: &Parts, token: &str) -> Result<ValidatedToken, AuthError>;
}

/// The default [`TokenValidator`].
pub struct IdTokenValidator {
    keys: Arc<SigningKeyCache>,
    verifier: Arc<dyn TokenVerifier>,
    providers: Arc<dyn ProvidersGetter>,
    leeway: Duration,
}

impl IdTokenValidator {
    /// Creates a validator for `config` with the default HTTP fetcher,
    /// key resolver, verifier and static providers.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the configuration is invalid or
    /// the HTTP client cannot be built.
    pub fn new(config: &OidcConfig) -> Result<Self, AuthError> {
        Self::builder(config.clone()).build()
    }

    /// Starts a builder for replacing individual collaborators.
    #[must_use]
    pub fn builder(config: OidcConfig) -> IdTokenValidatorBuilder {
        IdTokenValidatorBuilder::new(config)
    }

    /// Returns the signing key cache.
    #[must_use]
    pub fn keys(&self) -> &SigningKeyCache {
        &self.keys
    }

    /// Validates `token` against an explicit provider set.
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` of the first step that fails.
    pub async fn validate_with(
        &self,
        providers: &[Provider],
        token: &str,
    ) -> Result<ValidatedToken, AuthError> {
        let unverified = UnverifiedToken::parse(token)?;
        self.validate_parsed(unverified, providers, token).await
    }

    async fn validate_parsed(
        &self,
        unverified: UnverifiedToken,
        providers: &[Provider],
        token: &str,
    ) -> Result<ValidatedToken, AuthError> {
        if providers.is_empty() {
            return Err(AuthError::configuration("no providers configured"));
        }

        // The same issuer may be listed more than once with different client IDs
        let accepted: Vec<&Provider> = providers
            .iter()
            .filter(|p| p.matches_issuer(&unverified.issuer))
            .collect();

        let Some(issuer) = accepted.first().map(|p| p.issuer.as_str()) else {
            tracing::debug!(issuer = %unverified.issuer, "Token from unknown issuer");
            return Err(AuthError::unknown_issuer(&unverified.issuer));
        };

        let key = self
            .keys
            .get_key(issuer, &unverified.kid)
            .await
            .map_err(|e| match e {
                AuthError::KeyNotFound { issuer, kid } => AuthError::UnknownKey { issuer, kid },
                other => other,
            })?;

        let claims = self.verifier.verify(token, &key)?;

        self.check_claims(
            &claims,
            issuer,
            &accepted,
            time::OffsetDateTime::now_utc().unix_timestamp(),
        )?;

        tracing::debug!(
            issuer = %issuer,
            kid = %unverified.kid,
            sub = %claims.sub,
            "Validated ID token"
        );

        Ok(ValidatedToken::new(
            token,
            unverified.kid,
            unverified.algorithm,
            issuer,
            claims,
        ))
    }

    fn check_claims(
        &self,
        claims: &IdTokenClaims,
        issuer: &str,
        accepted: &[&Provider],
        now: i64,
    ) -> Result<(), AuthError> {
        if claims.iss != issuer {
            return Err(AuthError::issuer_mismatch(issuer, &claims.iss));
        }

        if !accepted.iter().any(|p| p.accepts_audience(&claims.aud)) {
            return Err(AuthError::AudienceMismatch {
                audience: claims.aud.clone(),
            });
        }

        let leeway = i64::try_from(self.leeway.as_secs()).unwrap_or(i64::MAX);

        if now >= claims.exp.saturating_add(leeway) {
            return Err(AuthError::token_expired(format!(
                "expired at {}, now {now}",
                claims.exp
            )));
        }

        if let Some(nbf) = claims.nbf {
            if nbf.saturating_sub(leeway) > now {
                return Err(AuthError::token_expired(format!(
                    "not valid before {nbf}, now {now}"
                )));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl TokenValidator for IdTokenValidator {
    async fn validate(&self, parts: &Parts, token: &str) -> Result<ValidatedToken, AuthError> {
        let unverified = UnverifiedToken::parse(token)?;
        let providers = self.providers.providers(parts).await?;
        self.validate_parsed(unverified, &providers, token).await
    }
}

/// Builder for [`IdTokenValidator`].
pub struct IdTokenValidatorBuilder {
    config: OidcConfig,
    fetcher: Option<Arc<dyn HttpFetcher>>,
    resolver: Option<Arc<dyn KeySetResolver>>,
    verifier: Option<Arc<dyn TokenVerifier>>,
    providers: Option<Arc<dyn ProvidersGetter>>,
}

impl IdTokenValidatorBuilder {
    fn new(config: OidcConfig) -> Self {
        Self {
            config,
            fetcher: None,
            resolver: None,
            verifier: None,
            providers: None,
        }
    }

    /// Uses `fetcher` for discovery and JWKS retrieval.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn HttpFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Uses `resolver` for key sets, bypassing discovery and JWKS fetching.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn KeySetResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Uses `verifier` for signature checks.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn TokenVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Uses `providers` to select accepted providers per request.
    #[must_use]
    pub fn with_providers_getter(mut self, providers: Arc<dyn ProvidersGetter>) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Builds the validator.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the configuration is invalid or
    /// the default HTTP client cannot be built.
    pub fn build(self) -> Result<IdTokenValidator, AuthError> {
        self.config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let resolver = match self.resolver {
            Some(resolver) => resolver,
            None => {
                let fetcher = match self.fetcher {
                    Some(fetcher) => fetcher,
                    None => Arc::new(ReqwestFetcher::new(&self.config)?),
                };
                Arc::new(DefaultKeySetResolver::from_fetcher(fetcher, &self.config))
            }
        };

        let providers = self
            .providers
            .unwrap_or_else(|| Arc::new(StaticProviders::new(self.config.providers.clone())));

        Ok(IdTokenValidator {
            keys: Arc::new(SigningKeyCache::new(resolver)),
            verifier: self.verifier.unwrap_or_else(|| Arc::new(JwtTokenVerifier)),
            providers,
            leeway: self.config.leeway,
        })
    }
}
