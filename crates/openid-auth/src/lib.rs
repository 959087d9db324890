//! # openid-auth
//!
//! OpenID Connect ID Token validation for axum services.
//!
//! This crate provides:
//! - OpenID Connect discovery and JWK set retrieval
//! - JWK to PEM conversion for RSA and EC (P-256, P-384) keys
//! - A per-issuer signing key cache that refreshes once per key rotation
//! - ID token validation against a set of accepted providers
//! - Axum layers and extractors for tokens and users
//!
//! ## Overview
//!
//! A request's bearer token is parsed without verification to learn its
//! issuer and key ID. The issuer must be one of the accepted providers. The
//! key is looked up in the cache, which on a miss runs discovery, fetches the
//! JWK set and re-encodes every key as PEM. Concurrent misses for the same
//! issuer share a single refresh. The signature is then verified and the
//! issuer, audience and validity window are checked.
//!
//! ## Modules
//!
//! - [`config`] - Validator configuration
//! - [`federation`] - Discovery, JWK sets and the signing key cache
//! - [`token`] - Providers, claims and the validation pipeline
//! - [`middleware`] - Axum layers, extractors and error responses

pub mod config;
pub mod error;
pub mod federation;
pub mod middleware;
pub mod token;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, OidcConfig};
pub use error::{AuthError, ErrorCategory};
pub use federation::{
    DefaultKeySetResolver, DiscoveryDocument, HttpFetcher, Jwk, KeySetResolver, ReqwestFetcher,
    ResolvedKey, SigningKeyCache,
};
pub use middleware::{
    AuthenticateLayer, AuthenticateUserLayer, AuthenticatedUser, ContinueOnError,
    DefaultErrorHandler, ErrorDecision, ErrorHandler, IdToken, OidcAuth, User,
};
pub use token::{
    IdTokenClaims, IdTokenValidator, Provider, ProvidersGetter, StaticProviders, TokenValidator,
    ValidatedToken,
};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use openid_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{ConfigError, OidcConfig};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::middleware::{
        AuthenticateLayer, AuthenticateUserLayer, AuthenticatedUser, ContinueOnError,
        DefaultErrorHandler, ErrorDecision, ErrorHandler, IdToken, IdTokenGetter, OidcAuth, User,
    };
    pub use crate::token::{
        IdTokenClaims, IdTokenValidator, Provider, ProvidersGetter, StaticProviders,
        TokenValidator, ValidatedToken,
    };
}
