//! Authenticated user projection of a validated token.

use serde::Serialize;

use crate::error::AuthError;
use crate::token::claims::{IdTokenClaims, ValidatedToken};

/// The user behind a validated ID token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// Issuer that authenticated the user.
    pub issuer: String,

    /// Subject identifier, unique within the issuer.
    pub id: String,

    /// Email address, if the token carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Display name, taken from `name` or else `preferred_username`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// All verified claims.
    pub claims: IdTokenClaims,
}

impl User {
    /// Builds the user from a validated token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserMapping` if the token has no subject.
    pub fn from_token(token: &ValidatedToken) -> Result<Self, AuthError> {
        let claims = token.claims();

        if claims.sub.trim().is_empty() {
            return Err(AuthError::user_mapping("token has no 'sub' claim"));
        }

        Ok(Self {
            issuer: token.issuer().to_string(),
            id: claims.sub.clone(),
            email: claims.email.clone(),
            name: claims
                .name
                .clone()
                .or_else(|| claims.preferred_username.clone()),
            claims: claims.clone(),
        })
    }

    /// Returns a globally unique identifier (`issuer#subject`).
    #[must_use]
    pub fn unique_id(&self) -> String {
        format!("{}#{}", self.issuer, self.id)
    }
}

impl TryFrom<&ValidatedToken> for User {
    type Error = AuthError;

    fn try_from(token: &ValidatedToken) -> Result<Self, Self::Error> {
        Self::from_token(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::Algorithm;
    use serde_json::json;

    fn token(claims: serde_json::Value) -> ValidatedToken {
        ValidatedToken::new(
            "a.b.c",
            "k1",
            Algorithm::RS256,
            "https://idp.example.com",
            serde_json::from_value(claims).unwrap(),
        )
    }

    #[test]
    fn test_user_from_token() {
        let token = token(json!({
            "iss": "https://idp.example.com",
            "sub": "alice",
            "aud": "client-42",
            "exp": 1,
            "email": "alice@example.com",
            "name": "Alice Liddell",
            "preferred_username": "alice"
        }));

        let user = User::from_token(&token).unwrap();

        assert_eq!(user.issuer, "https://idp.example.com");
        assert_eq!(user.id, "alice");
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
        assert_eq!(user.name.as_deref(), Some("Alice Liddell"));
        assert_eq!(user.unique_id(), "https://idp.example.com#alice");
    }

    #[test]
    fn test_name_falls_back_to_preferred_username() {
        let token = token(json!({
            "iss": "https://idp.example.com",
            "sub": "bob",
            "aud": "client-42",
            "exp": 1,
            "preferred_username": "bobby"
        }));

        let user = User::try_from(&token).unwrap();
        assert_eq!(user.name.as_deref(), Some("bobby"));
        assert!(user.email.is_none());
    }

    #[test]
    fn test_missing_subject_fails() {
        let token = token(json!({
            "iss": "https://idp.example.com",
            "aud": "client-42",
            "exp": 1
        }));

        let err = User::from_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::UserMapping { .. }));
    }
}
