//! OpenID Connect Discovery document.
//!
//! Only `issuer` and `jwks_uri` are needed to resolve signing keys; the
//! remaining well-known fields are kept when the provider publishes them.
//! See [OpenID Connect Discovery 1.0](https://openid.net/specs/openid-connect-discovery-1_0.html).

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Provider metadata served from `/.well-known/openid-configuration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    /// URL that the OP asserts as its Issuer Identifier.
    pub issuer: String,

    /// URL of the OP's JSON Web Key Set document.
    pub jwks_uri: String,

    /// URL of the OP's Authorization Endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,

    /// URL of the OP's Token Endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,

    /// URL of the OP's UserInfo Endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,

    /// JWS algorithms supported for the ID Token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token_signing_alg_values_supported: Option<Vec<String>>,
}

impl DiscoveryDocument {
    /// Decodes a discovery document from a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Decode` if the body is not JSON, or if `issuer` or
    /// `jwks_uri` is missing or empty.
    pub fn from_json(body: &[u8]) -> Result<Self, AuthError> {
        let document: Self = serde_json::from_slice(body)
            .map_err(|e| AuthError::decode(format!("Invalid discovery document: {e}")))?;

        if document.issuer.trim().is_empty() {
            return Err(AuthError::decode("Discovery document has an empty issuer"));
        }
        if document.jwks_uri.trim().is_empty() {
            return Err(AuthError::decode("Discovery document has an empty jwks_uri"));
        }

        Ok(document)
    }
}
