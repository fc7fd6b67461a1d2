//! Authentication middleware.
//!
//! Every `/api` request must carry `Authorization: Bearer <jwt>`. The token
//! is checked by the [`TokenVerifier`](crate::verifier::TokenVerifier) held
//! in [`AppState`]; its subject becomes the request's [`Identity`].

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tasklist_types::SubjectId;

use crate::error::ServerError;
use crate::state::AppState;
use crate::verifier::{Claims, TokenError};

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Authenticated caller, taken from a verified bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: SubjectId,
    pub email: Option<String>,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            subject: SubjectId::new(claims.sub),
            email: claims.email,
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| ServerError::Unauthorized("no authenticated identity".to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth Error
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing authorization header.
    MissingToken,
    /// Header present but not a `Bearer` credential.
    InvalidFormat,
    /// Credential failed verification.
    InvalidToken(TokenError),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing authorization token"),
            AuthError::InvalidFormat => write!(f, "Invalid authorization format"),
            AuthError::InvalidToken(e) => write!(f, "Invalid token: {}", e),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for ServerError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken | AuthError::InvalidFormat => {
                ServerError::Unauthorized(e.to_string())
            }
            AuthError::InvalidToken(_) => ServerError::Forbidden(e.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServerError::from(self).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication middleware function.
///
/// Validates the request and injects the [`Identity`] into request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = validate_request(&request, &state)?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn validate_request(request: &Request<Body>, state: &AppState) -> Result<Identity, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|_| AuthError::InvalidFormat)?;
    let token = bearer_token(value).ok_or(AuthError::InvalidFormat)?;

    let claims = state.verifier().verify(token).map_err(AuthError::InvalidToken)?;
    Ok(Identity::from(claims))
}

/// Extract the credential from a `Bearer <token>` header value.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
