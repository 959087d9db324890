//! Locating the raw ID token in a request.

use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AuthError;

/// Extracts the raw ID token from a request.
pub trait IdTokenGetter: Send + Sync {
    /// Returns the compact token carried by `parts`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingToken` when the request carries no token.
    fn token(&self, parts: &Parts) -> Result<String, AuthError>;
}

/// Reads `Authorization: Bearer <token>`. The scheme is case-insensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerTokenGetter;

impl IdTokenGetter for BearerTokenGetter {
    fn token(&self, parts: &Parts) -> Result<String, AuthError> {
        let value = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AuthError::missing_token("Missing Authorization header"))?
            .to_str()
            .map_err(|_| AuthError::token_parse("Authorization header is not valid ASCII"))?;

        let (scheme, token) = value
            .trim()
            .split_once(' ')
            .unwrap_or((value.trim(), ""));

        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::missing_token("Authorization scheme is not Bearer"));
        }

        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::token_parse("Empty Bearer token"));
        }

        Ok(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder();
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token() {
        let token = BearerTokenGetter.token(&parts(Some("Bearer abc.def.ghi"))).unwrap();
        assert_eq!(token, "abc.def.ghi");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        for header in ["bearer abc", "BEARER abc", "BeArEr   abc  "] {
            assert_eq!(BearerTokenGetter.token(&parts(Some(header))).unwrap(), "abc");
        }
    }

    #[test]
    fn test_missing_header() {
        let err = BearerTokenGetter.token(&parts(None)).unwrap_err();
        assert!(matches!(err, AuthError::MissingToken { .. }));
    }

    #[test]
    fn test_other_scheme() {
        let err = BearerTokenGetter
            .token(&parts(Some("Basic dXNlcjpwYXNz")))
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingToken { .. }));
    }

    #[test]
    fn test_empty_token() {
        for header in ["Bearer", "Bearer ", "Bearer    "] {
            let err = BearerTokenGetter.token(&parts(Some(header))).unwrap_err();
            assert!(matches!(err, AuthError::TokenParse { .. }), "{header:?}");
        }
    }
}
