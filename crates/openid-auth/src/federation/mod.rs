//! Identity provider federation.
//!
//! This module turns an issuer URL into the public keys needed to verify its
//! ID tokens:
//!
//! - HTTP retrieval of provider documents ([`fetch`])
//! - OpenID Connect discovery ([`oidc`], [`discovery`])
//! - JWK set fetching ([`jwks`])
//! - JWK to PEM key set resolution ([`key_set`])
//! - Rotation-aware signing key caching ([`signing_key`])

pub mod discovery;
pub mod fetch;
pub mod jwks;
pub mod key_set;
pub mod oidc;
pub mod signing_key;

pub use discovery::{DiscoveryCache, DiscoveryProvider, HttpDiscoveryProvider};
pub use fetch::{FetchedDocument, HttpFetcher, ReqwestFetcher};
pub use jwks::{HttpJwksProvider, Jwk, JwksDocument, JwksProvider};
pub use key_set::{
    DefaultKeySetResolver, KeyEncoder, KeyRejection, KeySetResolver, PemKeyEncoder, ResolvedKey,
    ResolvedKeySet,
};
pub use oidc::DiscoveryDocument;
pub use signing_key::SigningKeyCache;
