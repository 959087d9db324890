//! Structural inspection of a token before its signature is checked.
//!
//! Nothing read here is trusted. The key ID and issuer only decide which key
//! the token must verify against.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, decode_header};

use crate::error::AuthError;

/// Routing information read from an unverified compact JWT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedToken {
    /// Key ID from the header.
    pub kid: String,
    /// Signing algorithm from the header.
    pub algorithm: Algorithm,
    /// Issuer claimed by the payload.
    pub issuer: String,
}

impl UnverifiedToken {
    /// Reads the header `kid` and `alg` and the payload `iss` of `token`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenParse` if the token is not a three-part
    /// compact JWS, a part is not valid base64url JSON, or `kid` or `iss`
    /// is missing.
    pub fn parse(token: &str) -> Result<Self, AuthError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(AuthError::token_parse(format!(
                "expected 3 segments, found {}",
                parts.len()
            )));
        }

        let header =
            decode_header(token).map_err(|e| AuthError::token_parse(format!("Invalid header: {e}")))?;

        let kid = header
            .kid
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| AuthError::token_parse("Token header has no 'kid'"))?;

        let payload = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|e| AuthError::token_parse(format!("Invalid payload encoding: {e}")))?;

        let payload: serde_json::Value = serde_json::from_slice(&payload)
            .map_err(|e| AuthError::token_parse(format!("Invalid payload: {e}")))?;

        let issuer = payload
            .get("iss")
            .and_then(|iss| iss.as_str())
            .filter(|iss| !iss.is_empty())
            .ok_or_else(|| AuthError::token_parse("Token has no 'iss' claim"))?;

        Ok(Self {
            kid,
            algorithm: header.alg,
            issuer: issuer.to_string(),
        })
    }
}
