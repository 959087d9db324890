//! Axum integration.
//!
//! This module provides:
//!
//! - Locating the raw token in a request ([`IdTokenGetter`])
//! - Error decisions and RFC 6750 responses ([`ErrorHandler`])
//! - Layers validating every request ([`AuthenticateLayer`], [`AuthenticateUserLayer`])
//! - Per-handler extractors ([`IdToken`], [`AuthenticatedUser`])
//! - The [`User`] projection of a validated token
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, Extension, routing::get};
//! use openid_auth::middleware::{OidcAuth, User};
//!
//! async fn me(Extension(user): Extension<User>) -> String {
//!     user.unique_id()
//! }
//!
//! let auth = OidcAuth::new(&config)?;
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .layer(auth.user_layer());
//! ```

pub mod auth;
pub mod error;
pub mod extract;
pub mod user;

pub use auth::{
    AuthenticateLayer, AuthenticateService, AuthenticateUserLayer, AuthenticatedUser, IdToken,
    OidcAuth,
};
pub use error::{
    ContinueOnError, DEFAULT_REALM, DefaultErrorHandler, ErrorDecision, ErrorHandler,
    error_response,
};
pub use extract::{BearerTokenGetter, IdTokenGetter};
pub use user::User;
