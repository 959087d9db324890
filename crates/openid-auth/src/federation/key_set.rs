//! Issuer key set resolution.
//!
//! Turns an issuer into the PEM-encoded public keys it currently publishes:
//! discovery document, then JWKS, then one [`KeyEncoder`] call per key.
//!
//! A key that cannot be encoded is skipped and reported in
//! [`ResolvedKeySet::rejected`]; the rest of the set is still usable. Keys
//! published with `use: "enc"` are never used for signature checks.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::pkcs8::EncodePublicKey as _;
use rsa::{BigUint, RsaPublicKey};

use super::discovery::{DiscoveryCache, HttpDiscoveryProvider};
use super::fetch::HttpFetcher;
use super::jwks::{HttpJwksProvider, Jwk, JwksProvider};
use crate::config::OidcConfig;
use crate::error::AuthError;

/// A public key ready for signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    /// Issuer that published the key.
    pub issuer: String,
    /// Key ID.
    pub kid: String,
    /// JWK key type (`RSA` or `EC`).
    pub kty: String,
    /// Algorithm declared by the JWK, if any.
    pub algorithm: Option<String>,
    /// SPKI `PUBLIC KEY` PEM.
    pub pem: String,
}

impl ResolvedKey {
    /// Returns `true` for RSA keys.
    #[must_use]
    pub fn is_rsa(&self) -> bool {
        self.kty == "RSA"
    }

    /// Returns `true` for elliptic curve keys.
    #[must_use]
    pub fn is_ec(&self) -> bool {
        self.kty == "EC"
    }
}

/// A JWK that was left out of a key set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRejection {
    /// Key ID (empty when the JWK has none).
    pub kid: String,
    /// Why the key was rejected.
    pub reason: String,
}

/// Outcome of resolving one issuer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedKeySet {
    /// Usable keys, in JWKS order.
    pub keys: Vec<ResolvedKey>,
    /// Keys that could not be used.
    pub rejected: Vec<KeyRejection>,
}

impl ResolvedKeySet {
    /// Finds a usable key by ID.
    #[must_use]
    pub fn get(&self, kid: &str) -> Option<&ResolvedKey> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    /// Returns the number of usable keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if no key is usable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Converts a JWK into a PEM-encoded public key.
pub trait KeyEncoder: Send + Sync {
    /// Encodes `jwk` as an SPKI PEM string.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyEncoding` for unsupported key types and for
    /// missing or malformed key parameters.
    fn encode(&self, jwk: &Jwk) -> Result<String, AuthError>;
}

/// Encodes RSA and EC (P-256, P-384) JWKs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PemKeyEncoder;

impl PemKeyEncoder {
    fn encode_rsa(kid: &str, jwk: &Jwk) -> Result<String, AuthError> {
        let n = decode_param(kid, "n", jwk.n.as_deref())?;
        let e = decode_param(kid, "e", jwk.e.as_deref())?;

        let key = RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
            .map_err(|e| AuthError::key_encoding(kid, format!("Invalid RSA key: {e}")))?;

        key.to_public_key_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|e| AuthError::key_encoding(kid, format!("PEM encoding failed: {e}")))
    }

    fn encode_ec(kid: &str, jwk: &Jwk) -> Result<String, AuthError> {
        let x = decode_param(kid, "x", jwk.x.as_deref())?;
        let y = decode_param(kid, "y", jwk.y.as_deref())?;

        // Uncompressed SEC1 point
        let mut point = Vec::with_capacity(1 + x.len() + y.len());
        point.push(0x04);
        point.extend_from_slice(&x);
        point.extend_from_slice(&y);

        match jwk.crv.as_deref() {
            Some("P-256") => {
                use p256::pkcs8::EncodePublicKey as _;

                check_coordinate_len(kid, &x, &y, 32)?;
                let key = p256::PublicKey::from_sec1_bytes(&point)
                    .map_err(|_| AuthError::key_encoding(kid, "Invalid P-256 point"))?;
                key.to_public_key_pem(p256::pkcs8::LineEnding::LF)
                    .map_err(|e| AuthError::key_encoding(kid, format!("PEM encoding failed: {e}")))
            }
            Some("P-384") => {
                use p384::pkcs8::EncodePublicKey as _;

                check_coordinate_len(kid, &x, &y, 48)?;
                let key = p384::PublicKey::from_sec1_bytes(&point)
                    .map_err(|_| AuthError::key_encoding(kid, "Invalid P-384 point"))?;
                key.to_public_key_pem(p384::pkcs8::LineEnding::LF)
                    .map_err(|e| AuthError::key_encoding(kid, format!("PEM encoding failed: {e}")))
            }
            Some(crv) => Err(AuthError::key_encoding(
                kid,
                format!("Unsupported curve: {crv}"),
            )),
            None => Err(AuthError::key_encoding(kid, "Missing EC parameter 'crv'")),
        }
    }
}

impl KeyEncoder for PemKeyEncoder {
    fn encode(&self, jwk: &Jwk) -> Result<String, AuthError> {
        let kid = jwk
            .kid
            .as_deref()
            .ok_or_else(|| AuthError::key_encoding("", "JWK has no 'kid'"))?;

        match jwk.kty.as_str() {
            "RSA" => Self::encode_rsa(kid, jwk),
            "EC" => Self::encode_ec(kid, jwk),
            "" => Err(AuthError::key_encoding(kid, "JWK has no 'kty'")),
            other => Err(AuthError::key_encoding(
                kid,
                format!("Unsupported key type: {other}"),
            )),
        }
    }
}

fn decode_param(kid: &str, name: &str, value: Option<&str>) -> Result<Vec<u8>, AuthError> {
    let value =
        value.ok_or_else(|| AuthError::key_encoding(kid, format!("Missing parameter '{name}'")))?;

    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| AuthError::key_encoding(kid, format!("Invalid base64url in '{name}': {e}")))
}

fn check_coordinate_len(kid: &str, x: &[u8], y: &[u8], expected: usize) -> Result<(), AuthError> {
    if x.len() != expected || y.len() != expected {
        return Err(AuthError::key_encoding(
            kid,
            format!("EC coordinates must be {expected} bytes"),
        ));
    }
    Ok(())
}

/// Capability resolving an issuer into its current key set.
#[async_trait]
pub trait KeySetResolver: Send + Sync {
    /// Resolves the signing keys currently published by `issuer`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Fetch` or `AuthError::Decode` when the discovery
    /// document or the JWKS cannot be obtained. Individual bad keys do not
    /// fail the resolution.
    async fn resolve(&self, issuer: &str) -> Result<ResolvedKeySet, AuthError>;
}

/// Resolves keys through discovery, JWKS retrieval and a [`KeyEncoder`].
pub struct DefaultKeySetResolver {
    discovery: Arc<DiscoveryCache>,
    jwks: Arc<dyn JwksProvider>,
    encoder: Arc<dyn KeyEncoder>,
}

impl DefaultKeySetResolver {
    /// Creates a resolver from its parts.
    #[must_use]
    pub fn new(
        discovery: Arc<DiscoveryCache>,
        jwks: Arc<dyn JwksProvider>,
        encoder: Arc<dyn KeyEncoder>,
    ) -> Self {
        Self {
            discovery,
            jwks,
            encoder,
        }
    }

    /// Creates a resolver that fetches discovery and JWKS documents with
    /// `fetcher` and encodes keys with [`PemKeyEncoder`].
    #[must_use]
    pub fn from_fetcher(fetcher: Arc<dyn HttpFetcher>, config: &OidcConfig) -> Self {
        let discovery = HttpDiscoveryProvider::new(fetcher.clone(), config);
        Self::new(
            Arc::new(DiscoveryCache::new(Arc::new(discovery))),
            Arc::new(HttpJwksProvider::new(fetcher, config)),
            Arc::new(PemKeyEncoder),
        )
    }

    /// Returns the discovery cache used by this resolver.
    #[must_use]
    pub fn discovery(&self) -> &DiscoveryCache {
        &self.discovery
    }

    fn resolve_key(&self, issuer: &str, jwk: &Jwk) -> Result<ResolvedKey, AuthError> {
        if jwk.is_encryption_key() {
            return Err(AuthError::key_encoding(
                jwk.kid.clone().unwrap_or_default(),
                "encryption key",
            ));
        }

        let pem = self.encoder.encode(jwk)?;

        Ok(ResolvedKey {
            issuer: issuer.to_string(),
            kid: jwk.kid.clone().unwrap_or_default(),
            kty: jwk.kty.clone(),
            algorithm: jwk.alg.clone(),
            pem,
        })
    }
}

#[async_trait]
impl KeySetResolver for DefaultKeySetResolver {
    async fn resolve(&self, issuer: &str) -> Result<ResolvedKeySet, AuthError> {
        let discovery = self.discovery.get(issuer).await?;

        let jwks = match self.jwks.get(&discovery.jwks_uri).await {
            Ok(jwks) => jwks,
            Err(e) => {
                // The jwks_uri may have moved; rediscover on the next attempt
                self.discovery.invalidate(issuer).await;
                return Err(e);
            }
        };

        let mut set = ResolvedKeySet::default();

        for jwk in &jwks.keys {
            match self.resolve_key(issuer, jwk) {
                Ok(key) if set.get(&key.kid).is_some() => {
                    tracing::warn!(issuer = %issuer, kid = %key.kid, "Duplicate kid in JWKS, keeping the first key");
                    set.rejected.push(KeyRejection {
                        kid: key.kid,
                        reason: "duplicate kid".to_string(),
                    });
                }
                Ok(key) => set.keys.push(key),
                Err(e) => {
                    let rejection = match e {
                        AuthError::KeyEncoding { kid, message } => KeyRejection {
                            kid,
                            reason: message,
                        },
                        other => KeyRejection {
                            kid: jwk.kid.clone().unwrap_or_default(),
                            reason: other.to_string(),
                        },
                    };
                    tracing::warn!(
                        issuer = %issuer,
                        kid = %rejection.kid,
                        reason = %rejection.reason,
                        "Skipping unusable JWK"
                    );
                    set.rejected.push(rejection);
                }
            }
        }

        tracing::debug!(
            issuer = %issuer,
            keys = set.keys.len(),
            rejected = set.rejected.len(),
            "Resolved signing keys"
        );

        Ok(set)
    }
}
