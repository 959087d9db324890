//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use openid_auth::AuthError;
use openid_auth::federation::{FetchedDocument, HttpFetcher};
use serde_json::{Value, json};
use url::Url;

pub const ISSUER: &str = "https://idp.example.com";
pub const CLIENT_ID: &str = "client-42";

pub const RSA_K1_PEM: &str = include_str!("../fixtures/rsa_k1.pem");
pub const RSA_K2_PEM: &str = include_str!("../fixtures/rsa_k2.pem");
pub const EC_P256_PEM: &str = include_str!("../fixtures/ec_p256.pem");

/// Returns a fixture JWK with `kid` set.
pub fn jwk(fixture: &str, kid: &str) -> Value {
    let json = match fixture {
        "rsa_k1" => include_str!("../fixtures/rsa_k1.jwk.json"),
        "rsa_k2" => include_str!("../fixtures/rsa_k2.jwk.json"),
        "ec_p256" => include_str!("../fixtures/ec_p256.jwk.json"),
        "ec_p384" => include_str!("../fixtures/ec_p384.jwk.json"),
        other => panic!("unknown fixture {other}"),
    };
    let mut jwk: Value = serde_json::from_str(json).unwrap();
    jwk["kid"] = Value::String(kid.to_string());
    jwk
}

/// In-memory identity provider serving discovery and JWKS documents.
pub struct MockIdp {
    issuer: String,
    jwks: Mutex<Value>,
    discovery_fetches: AtomicUsize,
    jwks_fetches: AtomicUsize,
}

impl MockIdp {
    pub fn new(keys: Vec<Value>) -> Self {
        Self {
            issuer: ISSUER.to_string(),
            jwks: Mutex::new(json!({ "keys": keys })),
            discovery_fetches: AtomicUsize::new(0),
            jwks_fetches: AtomicUsize::new(0),
        }
    }

    pub fn jwks_uri(&self) -> String {
        format!("{}/protocol/certs", self.issuer)
    }

    /// Replaces the published key set.
    pub fn rotate(&self, keys: Vec<Value>) {
        *self.jwks.lock().unwrap() = json!({ "keys": keys });
    }

    pub fn discovery_fetches(&self) -> usize {
        self.discovery_fetches.load(Ordering::SeqCst)
    }

    pub fn jwks_fetches(&self) -> usize {
        self.jwks_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpFetcher for MockIdp {
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument, AuthError> {
        let discovery = format!("{}/.well-known/openid-configuration", self.issuer);

        if url.as_str() == discovery {
            self.discovery_fetches.fetch_add(1, Ordering::SeqCst);
            let body = json!({
                "issuer": self.issuer,
                "jwks_uri": self.jwks_uri(),
                "id_token_signing_alg_values_supported": ["RS256", "ES256"]
            });
            return Ok(FetchedDocument::new(200, body.to_string()));
        }

        if url.as_str() == self.jwks_uri() {
            self.jwks_fetches.fetch_add(1, Ordering::SeqCst);
            let body = self.jwks.lock().unwrap().to_string();
            return Ok(FetchedDocument::new(200, body));
        }

        Ok(FetchedDocument::new(404, "not found"))
    }
}

/// Routes `tracing` output to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// Claims of a token that is currently valid for [`CLIENT_ID`].
pub fn valid_claims(sub: &str) -> Value {
    json!({
        "iss": ISSUER,
        "sub": sub,
        "aud": CLIENT_ID,
        "exp": now() + 300,
        "iat": now(),
        "email": format!("{sub}@example.com"),
        "name": "Alice Liddell"
    })
}

pub fn sign(claims: &Value, alg: Algorithm, kid: &str, private_pem: &str) -> String {
    let mut header = Header::new(alg);
    header.kid = Some(kid.to_string());
    let key = match alg {
        Algorithm::ES256 | Algorithm::ES384 => EncodingKey::from_ec_pem(private_pem.as_bytes()),
        _ => EncodingKey::from_rsa_pem(private_pem.as_bytes()),
    }
    .unwrap();
    jsonwebtoken::encode(&header, claims, &key).unwrap()
}
