//! Error types for ID token validation and signing key resolution.
//!
//! Every failure in the pipeline is an [`AuthError`]. Errors carry owned
//! strings only, so a single refresh failure can be cloned and handed to every
//! caller that was waiting on it.

use std::fmt;

/// Errors that can occur while resolving signing keys or validating ID tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// A discovery or JWKS document could not be fetched (transport failure,
    /// non-success status, timeout, oversized body or disallowed scheme).
    #[error("Fetch failed for {url}: {message}")]
    Fetch {
        /// The URL that was requested.
        url: String,
        /// Description of the failure.
        message: String,
    },

    /// A discovery or JWKS document was fetched but could not be decoded.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the decoding failure.
        message: String,
    },

    /// A JWK could not be converted into a usable public key.
    #[error("Key encoding failed for kid '{kid}': {message}")]
    KeyEncoding {
        /// The key ID of the offending JWK (empty when the JWK has none).
        kid: String,
        /// Why the key could not be encoded.
        message: String,
    },

    /// The key ID is absent from the issuer's key set, even after a refresh.
    #[error("Key '{kid}' not found for issuer {issuer}")]
    KeyNotFound {
        /// The issuer whose key set was searched.
        issuer: String,
        /// The key ID that was requested.
        kid: String,
    },

    /// The token is not a structurally valid compact JWT.
    #[error("Malformed token: {message}")]
    TokenParse {
        /// Description of the structural problem.
        message: String,
    },

    /// No token could be extracted from the request.
    #[error("Missing token: {message}")]
    MissingToken {
        /// Description of why no token was found.
        message: String,
    },

    /// The token claims an issuer that is not configured for this request.
    #[error("Unknown issuer: {issuer}")]
    UnknownIssuer {
        /// The issuer claimed by the token.
        issuer: String,
    },

    /// The token references a key ID the issuer does not publish.
    #[error("Unknown signing key '{kid}' for issuer {issuer}")]
    UnknownKey {
        /// The issuer claimed by the token.
        issuer: String,
        /// The key ID from the token header.
        kid: String,
    },

    /// The token signature could not be verified.
    #[error("Invalid signature: {message}")]
    Signature {
        /// Description of the verification failure.
        message: String,
    },

    /// The token is expired or not yet valid.
    #[error("Token expired: {message}")]
    TokenExpired {
        /// Description of the time check that failed.
        message: String,
    },

    /// The verified issuer does not match the expected issuer.
    #[error("Issuer mismatch: expected {expected}, got {actual}")]
    IssuerMismatch {
        /// The expected issuer.
        expected: String,
        /// The issuer found in the token.
        actual: String,
    },

    /// None of the token audiences is an expected client ID.
    #[error("Audience mismatch: {audience:?} contains no expected client ID")]
    AudienceMismatch {
        /// The audiences found in the token.
        audience: Vec<String>,
    },

    /// A user identity could not be built from the validated token.
    #[error("User mapping failed: {message}")]
    UserMapping {
        /// Description of the mapping failure.
        message: String,
    },

    /// The validator is misconfigured (for example, no providers).
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `Fetch` error.
    #[must_use]
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Decode` error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a new `KeyEncoding` error.
    #[must_use]
    pub fn key_encoding(kid: impl Into<String>, message: impl Into<String>) -> Self {
        Self::KeyEncoding {
            kid: kid.into(),
            message: message.into(),
        }
    }

    /// Creates a new `KeyNotFound` error.
    #[must_use]
    pub fn key_not_found(issuer: impl Into<String>, kid: impl Into<String>) -> Self {
        Self::KeyNotFound {
            issuer: issuer.into(),
            kid: kid.into(),
        }
    }

    /// Creates a new `TokenParse` error.
    #[must_use]
    pub fn token_parse(message: impl Into<String>) -> Self {
        Self::TokenParse {
            message: message.into(),
        }
    }

    /// Creates a new `MissingToken` error.
    #[must_use]
    pub fn missing_token(message: impl Into<String>) -> Self {
        Self::MissingToken {
            message: message.into(),
        }
    }

    /// Creates a new `UnknownIssuer` error.
    #[must_use]
    pub fn unknown_issuer(issuer: impl Into<String>) -> Self {
        Self::UnknownIssuer {
            issuer: issuer.into(),
        }
    }

    /// Creates a new `UnknownKey` error.
    #[must_use]
    pub fn unknown_key(issuer: impl Into<String>, kid: impl Into<String>) -> Self {
        Self::UnknownKey {
            issuer: issuer.into(),
            kid: kid.into(),
        }
    }

    /// Creates a new `Signature` error.
    #[must_use]
    pub fn signature(message: impl Into<String>) -> Self {
        Self::Signature {
            message: message.into(),
        }
    }

    /// Creates a new `TokenExpired` error.
    #[must_use]
    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::TokenExpired {
            message: message.into(),
        }
    }

    /// Creates an `IssuerMismatch` error.
    #[must_use]
    pub fn issuer_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::IssuerMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a new `UserMapping` error.
    #[must_use]
    pub fn user_mapping(message: impl Into<String>) -> Self {
        Self::UserMapping {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if the error stems from validator setup rather than from
    /// the presented token.
    #[must_use]
    pub fn is_setup_error(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns `true` if the error describes a problem with the presented token.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::TokenParse { .. }
                | Self::MissingToken { .. }
                | Self::UnknownIssuer { .. }
                | Self::UnknownKey { .. }
                | Self::Signature { .. }
                | Self::TokenExpired { .. }
                | Self::IssuerMismatch { .. }
                | Self::AudienceMismatch { .. }
                | Self::UserMapping { .. }
        )
    }

    /// Returns `true` if the error came from talking to the identity provider.
    #[must_use]
    pub fn is_external_error(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. }
                | Self::Decode { .. }
                | Self::KeyEncoding { .. }
                | Self::KeyNotFound { .. }
        )
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch { .. } | Self::Decode { .. } => ErrorCategory::Federation,
            Self::KeyEncoding { .. } | Self::KeyNotFound { .. } | Self::UnknownKey { .. } => {
                ErrorCategory::Key
            }
            Self::TokenParse { .. }
            | Self::Signature { .. }
            | Self::TokenExpired { .. }
            | Self::IssuerMismatch { .. }
            | Self::AudienceMismatch { .. } => ErrorCategory::Token,
            Self::MissingToken { .. } | Self::UnknownIssuer { .. } | Self::UserMapping { .. } => {
                ErrorCategory::Authentication
            }
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Returns the RFC 6750 error code used in `WWW-Authenticate` challenges.
    ///
    /// `None` means the request carried no credentials at all, in which case
    /// the challenge must not include an error code.
    #[must_use]
    pub fn oauth_error_code(&self) -> Option<&'static str> {
        match self {
            Self::MissingToken { .. } => None,
            Self::Configuration { .. } => Some("server_error"),
            _ => Some("invalid_token"),
        }
    }
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The request did not authenticate (no token, unknown issuer, no subject).
    Authentication,
    /// The token itself is malformed or fails a claim check.
    Token,
    /// A signing key could not be found or encoded.
    Key,
    /// Discovery or JWKS retrieval failed.
    Federation,
    /// The validator is misconfigured.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Key => write!(f, "key"),
            Self::Federation => write!(f, "federation"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
