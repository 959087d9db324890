//! ID token validation.
//!
//! This module provides:
//!
//! - Accepted providers and per-request provider selection
//! - Unverified header and issuer inspection
//! - ID token claims
//! - Signature verification
//! - The validation pipeline

pub mod claims;
pub mod provider;
pub mod unverified;
pub mod validator;
pub mod verifier;

pub use claims::{IdTokenClaims, ValidatedToken};
pub use provider::{Provider, ProvidersGetter, StaticProviders};
pub use unverified::UnverifiedToken;
pub use validator::{IdTokenValidator, IdTokenValidatorBuilder, TokenValidator};
pub use verifier::{JwtTokenVerifier, TokenVerifier};
