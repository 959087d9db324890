//! ID token authentication layers and extractors.
//!
//! Two ways to protect routes, each in a token-only and a user flavour:
//!
//! - [`AuthenticateLayer`] / [`AuthenticateUserLayer`] wrap a whole router.
//!   They insert [`ValidatedToken`] (and [`User`]) into the request extensions.
//! - [`IdToken`] / [`AuthenticatedUser`] are extractors for individual
//!   handlers and compose with other extractors such as `Path`.
//!
//! Failures go to the configured [`ErrorHandler`]. When it decides to
//! continue, layers call the inner service without an identity and the
//! `Option<_>` extractors yield `None`.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, extract::Path, routing::get};
//! use openid_auth::middleware::{AuthenticatedUser, OidcAuth};
//!
//! async fn get_item(Path(id): Path<u32>, AuthenticatedUser(user): AuthenticatedUser) -> String {
//!     format!("item {} for {}", id, user.id)
//! }
//!
//! let auth = OidcAuth::new(&config)?;
//! let app = Router::new()
//!     .route("/items/{id}", get(get_item))
//!     .with_state(auth);
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts, Request},
    http::request::Parts,
    response::Response,
};
use tower::{Layer, Service};

use super::error::{DefaultErrorHandler, ErrorDecision, ErrorHandler, error_response};
use super::extract::{BearerTokenGetter, IdTokenGetter};
use super::user::User;
use crate::config::OidcConfig;
use crate::error::AuthError;
use crate::token::claims::ValidatedToken;
use crate::token::validator::{IdTokenValidator, TokenValidator};

// =============================================================================
// Shared state
// =============================================================================

/// Everything the layers and extractors need to authenticate a request.
///
/// Cheap to clone. Use it as router state (or make it reachable through
/// `FromRef`) for the extractors, or build layers from it.
#[derive(Clone)]
pub struct OidcAuth {
    validator: Arc<dyn TokenValidator>,
    token_getter: Arc<dyn IdTokenGetter>,
    error_handler: Arc<dyn ErrorHandler>,
    realm: String,
}

impl OidcAuth {
    /// Creates the default setup for `config`: [`IdTokenValidator`], bearer
    /// header extraction and [`DefaultErrorHandler`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the validator cannot be built.
    pub fn new(config: &OidcConfig) -> Result<Self, AuthError> {
        let validator = IdTokenValidator::new(config)?;
        Ok(Self::from_validator(Arc::new(validator)).with_realm(config.realm.clone()))
    }

    /// Wraps an existing validator.
    #[must_use]
    pub fn from_validator(validator: Arc<dyn TokenValidator>) -> Self {
        Self {
            validator,
            token_getter: Arc::new(BearerTokenGetter),
            error_handler: Arc::new(DefaultErrorHandler::default()),
            realm: super::error::DEFAULT_REALM.to_string(),
        }
    }

    /// Replaces how the raw token is located in the request.
    #[must_use]
    pub fn with_token_getter(mut self, getter: Arc<dyn IdTokenGetter>) -> Self {
        self.token_getter = getter;
        self
    }

    /// Replaces the error handler.
    #[must_use]
    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    /// Sets the realm of default challenges.
    ///
    /// Quotes and backslashes in `realm` are escaped in the challenge.
    ///
    /// This also resets the error handler to a [`DefaultErrorHandler`] for
    /// that realm; call [`with_error_handler`](Self::with_error_handler) after
    /// this to keep a custom one.
    #[must_use]
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self.error_handler = Arc::new(DefaultErrorHandler::new(self.realm.clone()));
        self
    }

    /// Locates and validates the token of a request.
    ///
    /// # Errors
    ///
    /// Returns the token getter's or the validator's error.
    pub async fn authenticate(&self, parts: &Parts) -> Result<ValidatedToken, AuthError> {
        let token = self.token_getter.token(parts)?;
        self.validator.validate(parts, &token).await
    }

    /// Like [`authenticate`](Self::authenticate), and also builds the [`User`].
    ///
    /// # Errors
    ///
    /// Additionally returns `AuthError::UserMapping` if no user can be built.
    pub async fn authenticate_user(
        &self,
        parts: &Parts,
    ) -> Result<(ValidatedToken, User), AuthError> {
        let token = self.authenticate(parts).await?;
        let user = User::from_token(&token)?;
        Ok((token, user))
    }

    /// Creates a layer validating every request.
    #[must_use]
    pub fn layer(&self) -> AuthenticateLayer {
        AuthenticateLayer::new(self.clone())
    }

    /// Creates a layer validating every request and building its user.
    #[must_use]
    pub fn user_layer(&self) -> AuthenticateUserLayer {
        AuthenticateUserLayer::new(self.clone())
    }

    fn fallback_response(&self, error: &AuthError) -> Response {
        error_response(error, &self.realm)
    }
}

/// Recorded in the request extensions when a layer let a failed request through.
#[derive(Debug, Clone)]
struct AuthFailure(AuthError);

// =============================================================================
// Layers
// =============================================================================

/// Validates the ID token of every request.
///
/// On success the [`ValidatedToken`] is inserted into the request extensions.
#[derive(Clone)]
pub struct AuthenticateLayer {
    auth: OidcAuth,
}

impl AuthenticateLayer {
    /// Creates the layer.
    #[must_use]
    pub fn new(auth: OidcAuth) -> Self {
        Self { auth }
    }
}

impl<S> Layer<S> for AuthenticateLayer {
    type Service = AuthenticateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthenticateService {
            inner,
            auth: self.auth.clone(),
            with_user: false,
        }
    }
}

/// Validates the ID token of every request and builds its [`User`].
///
/// On success both the [`ValidatedToken`] and the [`User`] are inserted into
/// the request extensions.
#[derive(Clone)]
pub struct AuthenticateUserLayer {
    auth: OidcAuth,
}

impl AuthenticateUserLayer {
    /// Creates the layer.
    #[must_use]
    pub fn new(auth: OidcAuth) -> Self {
        Self { auth }
    }
}

impl<S> Layer<S> for AuthenticateUserLayer {
    type Service = AuthenticateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthenticateService {
            inner,
            auth: self.auth.clone(),
            with_user: true,
        }
    }
}

/// Service produced by [`AuthenticateLayer`] and [`AuthenticateUserLayer`].
#[derive(Clone)]
pub struct AuthenticateService<S> {
    inner: S,
    auth: OidcAuth,
    with_user: bool,
}

impl<S> Service<Request> for AuthenticateService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let auth = self.auth.clone();
        let with_user = self.with_user;

        // Use the service that was driven to readiness
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let (mut parts, body) = req.into_parts();

            let outcome = if with_user {
                auth.authenticate_user(&parts)
                    .await
                    .map(|(token, user)| (token, Some(user)))
            } else {
                auth.authenticate(&parts).await.map(|token| (token, None))
            };

            match outcome {
                Ok((token, user)) => {
                    parts.extensions.insert(token);
                    if let Some(user) = user {
                        parts.extensions.insert(user);
                    }
                }
                Err(error) => match auth.error_handler.handle(&error, &parts) {
                    ErrorDecision::Halt(response) => return Ok(response),
                    ErrorDecision::Continue => {
                        parts.extensions.insert(AuthFailure(error));
                    }
                },
            }

            inner.call(Request::from_parts(parts, body)).await
        })
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// Resolves the token of a request, reusing a layer's result when present.
async fn resolve_token(parts: &Parts, auth: &OidcAuth) -> Result<ValidatedToken, AuthError> {
    if let Some(token) = parts.extensions.get::<ValidatedToken>() {
        return Ok(token.clone());
    }
    if let Some(AuthFailure(error)) = parts.extensions.get::<AuthFailure>() {
        return Err(error.clone());
    }
    auth.authenticate(parts).await
}

async fn resolve_user(parts: &Parts, auth: &OidcAuth) -> Result<User, AuthError> {
    if let Some(user) = parts.extensions.get::<User>() {
        return Ok(user.clone());
    }
    let token = resolve_token(parts, auth).await?;
    User::from_token(&token)
}

/// Runs the error handler unless a layer already did.
fn decide(parts: &Parts, auth: &OidcAuth, error: &AuthError) -> ErrorDecision {
    if parts.extensions.get::<AuthFailure>().is_some() {
        return ErrorDecision::Continue;
    }
    auth.error_handler.handle(error, parts)
}

/// Extractor yielding the validated ID token of the request.
///
/// Rejects the request with the error handler's response. If the handler
/// chooses to continue, the default response is sent instead, since the
/// handler cannot run without a token; use `Option<IdToken>` to accept
/// unauthenticated requests.
#[derive(Debug, Clone)]
pub struct IdToken(pub ValidatedToken);

impl<S> FromRequestParts<S> for IdToken
where
    S: Send + Sync,
    OidcAuth: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = OidcAuth::from_ref(state);

        match resolve_token(parts, &auth).await {
            Ok(token) => Ok(IdToken(token)),
            Err(error) => Err(match decide(parts, &auth, &error) {
                ErrorDecision::Halt(response) => response,
                ErrorDecision::Continue => auth.fallback_response(&error),
            }),
        }
    }
}

impl<S> OptionalFromRequestParts<S> for IdToken
where
    S: Send + Sync,
    OidcAuth: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let auth = OidcAuth::from_ref(state);

        match resolve_token(parts, &auth).await {
            Ok(token) => Ok(Some(IdToken(token))),
            Err(error) => match decide(parts, &auth, &error) {
                ErrorDecision::Halt(response) => Err(response),
                ErrorDecision::Continue => Ok(None),
            },
        }
    }
}

/// Extractor yielding the authenticated user of the request.
///
/// Behaves like [`IdToken`] and additionally fails when no [`User`] can be
/// built from the token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    OidcAuth: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = OidcAuth::from_ref(state);

        match resolve_user(parts, &auth).await {
            Ok(user) => Ok(AuthenticatedUser(user)),
            Err(error) => Err(match decide(parts, &auth, &error) {
                ErrorDecision::Halt(response) => response,
                ErrorDecision::Continue => auth.fallback_response(&error),
            }),
        }
    }
}

impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    OidcAuth: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let auth = OidcAuth::from_ref(state);

        match resolve_user(parts, &auth).await {
            Ok(user) => Ok(Some(AuthenticatedUser(user))),
            Err(error) => match decide(parts, &auth, &error) {
                ErrorDecision::Halt(response) => Err(response),
                ErrorDecision::Continue => Ok(None),
            },
        }
    }
}
