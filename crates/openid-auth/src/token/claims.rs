//! ID token claims and the validated token.

use std::collections::HashMap;

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

/// Standard OIDC ID token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Issuer identifier.
    pub iss: String,

    /// Subject identifier.
    #[serde(default)]
    pub sub: String,

    /// Audience (can be string or array, handled by serde).
    #[serde(default, deserialize_with = "deserialize_audience")]
    pub aud: Vec<String>,

    /// Expiration time (Unix timestamp).
    #[serde(deserialize_with = "deserialize_numeric_date")]
    pub exp: i64,

    /// Not before (Unix timestamp).
    #[serde(
        default,
        deserialize_with = "deserialize_optional_numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub nbf: Option<i64>,

    /// Issued at time (Unix timestamp).
    #[serde(
        default,
        deserialize_with = "deserialize_optional_numeric_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub iat: Option<i64>,

    /// Authorized party.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,

    /// Nonce value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    // Standard OIDC profile claims
    /// User's email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Whether email is verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,

    /// User's full name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// User's preferred username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// Extra claims not defined in the struct.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl IdTokenClaims {
    /// Returns an extra claim by name.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&serde_json::Value> {
        self.extra.get(name)
    }
}

/// Custom deserializer for audience which can be a string or array.
fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => Ok(vec![s]),
        OneOrMany::Many(v) => Ok(v),
    }
}

/// A JWT NumericDate: seconds since the epoch, possibly fractional.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumericDate {
    Seconds(i64),
    Fractional(f64),
}

impl NumericDate {
    /// Whole seconds, truncating any fraction.
    fn into_seconds<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            NumericDate::Seconds(secs) => Ok(secs),
            NumericDate::Fractional(secs) if secs.is_finite() => Ok(secs.trunc() as i64),
            NumericDate::Fractional(_) => Err(E::custom("NumericDate must be finite")),
        }
    }
}

fn deserialize_numeric_date<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    NumericDate::deserialize(deserializer)?.into_seconds()
}

fn deserialize_optional_numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<NumericDate>::deserialize(deserializer)?
        .map(NumericDate::into_seconds)
        .transpose()
}

/// An ID token that passed every validation step.
///
/// Only the validator constructs this type.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedToken {
    raw: String,
    kid: String,
    algorithm: Algorithm,
    issuer: String,
    claims: IdTokenClaims,
}

impl ValidatedToken {
    pub(crate) fn new(
        raw: impl Into<String>,
        kid: impl Into<String>,
        algorithm: Algorithm,
        issuer: impl Into<String>,
        claims: IdTokenClaims,
    ) -> Self {
        Self {
            raw: raw.into(),
            kid: kid.into(),
            algorithm,
            issuer: issuer.into(),
            claims,
        }
    }

    /// The compact token as presented.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Key ID the token was verified with.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Configured issuer the token was accepted for.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Subject identifier.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    /// Verified claims.
    #[must_use]
    pub fn claims(&self) -> &IdTokenClaims {
        &self.claims
    }

    /// Consumes the token, returning its claims.
    #[must_use]
    pub fn into_claims(self) -> IdTokenClaims {
        self.claims
    }
}
