//! Shared fixtures for unit tests.

use jsonwebtoken::{Algorithm, EncodingKey, Header};

use crate::federation::jwks::Jwk;
use crate::federation::key_set::ResolvedKey;

pub(crate) const RSA_K1_PEM: &str = include_str!("../tests/fixtures/rsa_k1.pem");
pub(crate) const RSA_K1_PUBLIC_PEM: &str = include_str!("../tests/fixtures/rsa_k1.pub.pem");
pub(crate) const RSA_K2_PEM: &str = include_str!("../tests/fixtures/rsa_k2.pem");
pub(crate) const RSA_K2_PUBLIC_PEM: &str = include_str!("../tests/fixtures/rsa_k2.pub.pem");
pub(crate) const EC_P256_PEM: &str = include_str!("../tests/fixtures/ec_p256.pem");
pub(crate) const EC_P256_PUBLIC_PEM: &str = include_str!("../tests/fixtures/ec_p256.pub.pem");
pub(crate) const EC_P384_PUBLIC_PEM: &str = include_str!("../tests/fixtures/ec_p384.pub.pem");

fn jwk(json: &str, kid: &str) -> Jwk {
    let mut jwk: Jwk = serde_json::from_str(json).unwrap();
    jwk.kid = Some(kid.to_string());
    jwk
}

pub(crate) fn rsa_k1_jwk(kid: &str) -> Jwk {
    jwk(include_str!("../tests/fixtures/rsa_k1.jwk.json"), kid)
}

pub(crate) fn rsa_k2_jwk(kid: &str) -> Jwk {
    jwk(include_str!("../tests/fixtures/rsa_k2.jwk.json"), kid)
}

pub(crate) fn ec_p256_jwk(kid: &str) -> Jwk {
    jwk(include_str!("../tests/fixtures/ec_p256.jwk.json"), kid)
}

pub(crate) fn ec_p384_jwk(kid: &str) -> Jwk {
    jwk(include_str!("../tests/fixtures/ec_p384.jwk.json"), kid)
}

pub(crate) fn resolved_key(issuer: &str, kid: &str, kty: &str, pem: &str) -> ResolvedKey {
    ResolvedKey {
        issuer: issuer.to_string(),
        kid: kid.to_string(),
        kty: kty.to_string(),
        algorithm: None,
        pem: pem.to_string(),
    }
}

/// Signs `claims` with an RSA private key under RS256.
pub(crate) fn sign_rs256(claims: &serde_json::Value, kid: &str, private_pem: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap();
    jsonwebtoken::encode(&header, claims, &key).unwrap()
}

/// Signs `claims` with the P-256 private key under ES256.
pub(crate) fn sign_es256(claims: &serde_json::Value, kid: &str) -> String {
    let mut header = Header::new(Algorithm::ES256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_ec_pem(EC_P256_PEM.as_bytes()).unwrap();
    jsonwebtoken::encode(&header, claims, &key).unwrap()
}

/// Current Unix time in seconds.
pub(crate) fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
