//! Login, OAuth callback and logout routes.
//!
//! The callback is a small state machine:
//!
//! ```text
//! AwaitingCode ──exchange ok──▶ SessionEstablished
//!      │
//!      └──provider error / missing code / exchange failed──▶ AuthError
//! ```
//!
//! Both outcomes are terminal. There is no retry; a failed exchange sends
//! the browser to the configured error page.

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{BridgeError, Result};
use crate::identity::IdentityProvider;
use crate::pkce::PkceChallenge;
use crate::proxy::{BridgeState, SessionInfo, now, resolve_session, write_back};
use crate::session::{
    SessionCookie, clear_cookie, parse_cookie, read_session, session_set_cookie,
    verifier_cookie_name, verifier_set_cookie,
};

/// Query parameters the provider appends to the callback URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub next: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Progress of one callback request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackState {
    AwaitingCode {
        code: String,
        code_verifier: Option<String>,
        next: String,
    },
    SessionEstablished {
        session: SessionCookie,
        next: String,
    },
    AuthError {
        message: String,
    },
}

impl CallbackState {
    /// Initial state from the callback query and the stored PKCE verifier.
    pub fn from_params(params: CallbackParams, code_verifier: Option<String>) -> Self {
        if let Some(error) = params.error {
            let message = params
                .error_description
                .filter(|d| !d.is_empty())
                .unwrap_or(error);
            return CallbackState::AuthError { message };
        }

        match params.code.filter(|c| !c.is_empty()) {
            Some(code) => CallbackState::AwaitingCode {
                code,
                code_verifier,
                next: safe_next(params.next.as_deref()),
            },
            None => CallbackState::AuthError {
                message: "missing authorization code".to_string(),
            },
        }
    }

    /// Run the code exchange. Terminal states are returned unchanged.
    pub async fn advance(self, identity: &dyn IdentityProvider) -> Self {
        let (code, code_verifier, next) = match self {
            CallbackState::AwaitingCode {
                code,
                code_verifier,
                next,
            } => (code, code_verifier, next),
            terminal => return terminal,
        };

        match identity
            .exchange_code(&code, code_verifier.as_deref())
            .await
        {
            Ok(session) => CallbackState::SessionEstablished {
                session: SessionCookie::from(session),
                next,
            },
            Err(e) => CallbackState::AuthError {
                message: e.to_string(),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CallbackState::AwaitingCode { .. })
    }
}

/// Only same-site absolute paths are honoured as redirect targets.
///
/// Control characters are refused too; they cannot go into a `Location`
/// header.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.contains(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

fn error_redirect(state: &BridgeState, message: &str) -> String {
    let separator = if state.config.error_path.contains('?') {
        '&'
    } else {
        '?'
    };
    format!(
        "{}{}message={}",
        state.config.error_path,
        separator,
        urlencoding::encode(message)
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /auth/callback - Complete the authorization-code exchange.
pub async fn callback_handler(
    State(state): State<BridgeState>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<Response> {
    let cookie = &state.config.cookie;
    let verifier_name = verifier_cookie_name(cookie);
    let code_verifier = parse_cookie(&headers, &verifier_name);

    let outcome = CallbackState::from_params(params, code_verifier)
        .advance(state.identity.as_ref())
        .await;

    let clear_verifier = clear_cookie(cookie, &verifier_name)?;

    match outcome {
        CallbackState::SessionEstablished { session, next } => {
            info!(user_id = %session.user_id, "Session established");
            let session_cookie = session_set_cookie(cookie, &session, now())?;
            Ok((
                AppendHeaders([
                    (header::SET_COOKIE, session_cookie),
                    (header::SET_COOKIE, clear_verifier),
                ]),
                Redirect::to(&next),
            )
                .into_response())
        }
        CallbackState::AuthError { message } => {
            warn!(error = %message, "Login failed");
            Ok((
                AppendHeaders([(header::SET_COOKIE, clear_verifier)]),
                Redirect::to(&error_redirect(&state, &message)),
            )
                .into_response())
        }
        CallbackState::AwaitingCode { .. } => Err(BridgeError::Internal(
            "callback ended before the code exchange".to_string(),
        )),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginParams {
    pub next: Option<String>,
}

/// GET /auth/login - Redirect to the provider with a fresh PKCE challenge.
pub async fn login_handler(
    State(state): State<BridgeState>,
    Query(params): Query<LoginParams>,
    headers: HeaderMap,
) -> Result<Response> {
    let callback = match &state.config.callback_url {
        Some(url) => url.clone(),
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
                .ok_or_else(|| BridgeError::BadRequest("missing Host header".to_string()))?;
            format!("http://{}/auth/callback", host)
        }
    };

    let next = safe_next(params.next.as_deref());
    let separator = if callback.contains('?') { '&' } else { '?' };
    let redirect_to = format!("{}{}next={}", callback, separator, urlencoding::encode(&next));

    let pkce = PkceChallenge::generate();
    let location = state.identity.authorize_url(&redirect_to, &pkce.challenge);
    let verifier_cookie = verifier_set_cookie(&state.config.cookie, &pkce.verifier)?;

    Ok((
        AppendHeaders([(header::SET_COOKIE, verifier_cookie)]),
        Redirect::to(&location),
    )
        .into_response())
}

/// POST /auth/logout - Best-effort sign-out, then drop the cookie.
pub async fn logout_handler(
    State(state): State<BridgeState>,
    headers: HeaderMap,
) -> Result<Response> {
    let cookie = &state.config.cookie;

    if let Some(session) = read_session(&headers, cookie)
        && let Err(e) = state.identity.sign_out(&session.access_token).await
    {
        warn!(error = %e, "Provider sign-out failed, clearing cookie anyway");
    }

    let cleared = clear_cookie(cookie, &cookie.name)?;
    Ok((
        StatusCode::NO_CONTENT,
        AppendHeaders([(header::SET_COOKIE, cleared)]),
    )
        .into_response())
}

/// GET /auth/session - Describe the current session.
pub async fn session_handler(
    State(state): State<BridgeState>,
    headers: HeaderMap,
) -> Result<Response> {
    let resolved = resolve_session(&state, &headers).await?;
    let response = Json(SessionInfo::from(&resolved)).into_response();
    write_back(&state, &resolved, response)
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorParams {
    pub message: Option<String>,
}

/// GET /auth/error - Plain-text login failure page.
pub async fn error_handler(Query(params): Query<ErrorParams>) -> String {
    format!(
        "Sign-in failed: {}\n",
        params.message.as_deref().unwrap_or("unknown error")
    )
}
