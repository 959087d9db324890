//! Error handling for authentication middleware.
//!
//! An [`ErrorHandler`] decides what happens when a request fails
//! authentication: answer it right away, or let it through without an
//! identity. [`DefaultErrorHandler`] always answers, with an RFC 6750
//! challenge.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

/// Realm used when none is configured.
pub const DEFAULT_REALM: &str = "openid";

/// Outcome of an [`ErrorHandler`].
#[derive(Debug)]
pub enum ErrorDecision {
    /// Stop processing and send this response.
    Halt(Response),
    /// Keep processing the request without an identity.
    Continue,
}

/// Decides how authentication failures are answered.
pub trait ErrorHandler: Send + Sync {
    /// Handles `error` raised while authenticating the request in `parts`.
    fn handle(&self, error: &AuthError, parts: &Parts) -> ErrorDecision;
}

/// Answers every failure with [`error_response`].
#[derive(Debug, Clone)]
pub struct DefaultErrorHandler {
    realm: String,
}

impl DefaultErrorHandler {
    /// Creates a handler advertising `realm` in its challenges.
    #[must_use]
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
        }
    }
}

impl Default for DefaultErrorHandler {
    fn default() -> Self {
        Self::new(DEFAULT_REALM)
    }
}

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, error: &AuthError, parts: &Parts) -> ErrorDecision {
        tracing::debug!(
            method = %parts.method,
            path = %parts.uri.path(),
            category = %error.category(),
            error = %error,
            "Authentication failed"
        );
        ErrorDecision::Halt(error_response(error, &self.realm))
    }
}

/// Lets every request through, authenticated or not.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinueOnError;

impl ErrorHandler for ContinueOnError {
    fn handle(&self, error: &AuthError, _parts: &Parts) -> ErrorDecision {
        tracing::trace!(error = %error, "Continuing without identity");
        ErrorDecision::Continue
    }
}

/// Builds the default response for `error`.
///
/// Setup errors answer `500`; everything else answers `401` with a
/// `WWW-Authenticate: Bearer` challenge. A request without a token gets a
/// bare challenge carrying only the realm. The JSON body is
/// `{"error": ..., "error_description": ...}`.
#[must_use]
pub fn error_response(error: &AuthError, realm: &str) -> Response {
    if error.is_setup_error() {
        tracing::warn!(error = %error, "Authentication is misconfigured");
        let body = json!({
            "error": "server_error",
            "error_description": error.to_string(),
        });
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
    }

    let description = error.to_string();
    let challenge = match error.oauth_error_code() {
        Some(code) => build_www_authenticate_header(realm, Some((code, &description))),
        None => build_www_authenticate_header(realm, None),
    };

    let body = json!({
        "error": error.oauth_error_code().unwrap_or("unauthorized"),
        "error_description": description,
    });

    let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    if let Ok(value) = HeaderValue::from_str(&challenge) {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, value);
    }
    response
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        error_response(&self, DEFAULT_REALM)
    }
}

/// Builds the WWW-Authenticate header value for 401 responses.
///
/// Format: `Bearer realm="openid", error="invalid_token", error_description="..."`
fn build_www_authenticate_header(realm: &str, error: Option<(&str, &str)>) -> String {
    let realm = quoted_string(realm);
    match error {
        Some((code, description)) => format!(
            "Bearer realm=\"{}\", error=\"{}\", error_description=\"{}\"",
            realm,
            code,
            quoted_string(description)
        ),
        None => format!("Bearer realm=\"{}\"", realm),
    }
}

/// Escapes `value` for use inside an RFC 7230 quoted-string.
///
/// Control characters cannot appear in a header value and become spaces.
fn quoted_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\t' => quoted.push(c),
            c if c.is_control() => quoted.push(' '),
            c => quoted.push(c),
        }
    }
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Request;

    fn www_authenticate(response: &Response) -> String {
        response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_validation_error_response() {
        let response = AuthError::token_expired("expired at 1, now 2").into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = www_authenticate(&response);
        assert!(challenge.starts_with("Bearer realm=\"openid\""));
        assert!(challenge.contains("error=\"invalid_token\""));
        assert!(challenge.contains("error_description=\"Token expired: expired at 1, now 2\""));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "invalid_token");
        assert_eq!(json["error_description"], "Token expired: expired at 1, now 2");
    }

    #[tokio::test]
    async fn test_missing_token_response() {
        let response = error_response(&AuthError::missing_token("Missing Authorization header"), "api");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(www_authenticate(&response), "Bearer realm=\"api\"");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_every_token_error_is_unauthorized() {
        let errors = [
            AuthError::token_parse("x"),
            AuthError::unknown_issuer("https://evil.example.com"),
            AuthError::unknown_key("https://idp.example.com", "k9"),
            AuthError::signature("x"),
            AuthError::issuer_mismatch("a", "b"),
            AuthError::AudienceMismatch { audience: vec![] },
            AuthError::user_mapping("x"),
            AuthError::fetch("https://idp.example.com/jwks", "HTTP status 503"),
            AuthError::decode("x"),
        ];

        for error in errors {
            let response = error.clone().into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{error:?}");
            assert!(www_authenticate(&response).contains("invalid_token"));
        }
    }

    #[tokio::test]
    async fn test_setup_error_is_server_error() {
        let response = AuthError::configuration("no providers configured").into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn test_www_authenticate_header_escaping() {
        let header = build_www_authenticate_header(
            "openid",
            Some(("invalid_token", "Token contains \"quotes\"")),
        );
        assert!(header.contains("\\\"quotes\\\""));
    }

    #[test]
    fn test_realm_is_escaped() {
        let response = error_response(&AuthError::signature("bad"), "my \"api\"\n");

        let challenge = www_authenticate(&response);
        assert!(challenge.starts_with("Bearer realm=\"my \\\"api\\\" \""));
        assert!(challenge.contains("error=\"invalid_token\""));

        let response = error_response(&AuthError::missing_token("x"), "a\\b");
        assert_eq!(www_authenticate(&response), "Bearer realm=\"a\\\\b\"");
    }

    #[test]
    fn test_description_control_characters_keep_header() {
        let response = error_response(&AuthError::token_parse("line one\r\nline two"), "openid");
        assert!(www_authenticate(&response).contains("line one  line two"));
    }

    #[test]
    fn test_handlers() {
        let (parts, _) = Request::new(()).into_parts();
        let error = AuthError::signature("bad");

        match DefaultErrorHandler::new("api").handle(&error, &parts) {
            ErrorDecision::Halt(response) => {
                assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
                assert!(www_authenticate(&response).contains("realm=\"api\""));
            }
            ErrorDecision::Continue => panic!("default handler must halt"),
        }

        assert!(matches!(
            ContinueOnError.handle(&error, &parts),
            ErrorDecision::Continue
        ));
    }
}
