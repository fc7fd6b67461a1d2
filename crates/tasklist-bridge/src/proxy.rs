//! Session bridge server.
//!
//! Browsers call `/api/proxy/{*path}` with their session cookie. The bridge
//! resolves the session with the identity provider, then forwards the
//! request to the backend with the session's access token as a bearer
//! credential. Requests without a usable cookie never reach the backend.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    middleware::{self, Next},
    response::Response,
    routing::{any, get, post},
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::callback;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::identity::{IdentityUser, SharedIdentityProvider};
use crate::passthrough::{Passthrough, proxied_path};
use crate::session::{SessionCookie, parse_cookie, read_session, session_set_cookie};

/// Shared state for bridge handlers.
#[derive(Clone)]
pub struct BridgeState {
    pub config: Arc<BridgeConfig>,
    pub identity: SharedIdentityProvider,
    pub passthrough: Passthrough,
}

impl BridgeState {
    /// Build state with a fresh HTTP client for the backend.
    pub fn new(config: BridgeConfig, identity: SharedIdentityProvider) -> Self {
        Self::with_client(config, identity, Client::new())
    }

    /// Build state sharing an existing HTTP client for the backend.
    pub fn with_client(
        config: BridgeConfig,
        identity: SharedIdentityProvider,
        client: Client,
    ) -> Self {
        let passthrough = Passthrough::new(client, config.backend_url.clone());
        Self {
            config: Arc::new(config),
            identity,
            passthrough,
        }
    }
}

impl std::fmt::Debug for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeState")
            .field("config", &self.config)
            .field("passthrough", &self.passthrough)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session resolution
// ─────────────────────────────────────────────────────────────────────────────

/// A session cookie that the identity provider has vouched for.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub session: SessionCookie,
    pub user: IdentityUser,
    /// The session was refreshed and must be written back to the browser.
    pub refreshed: bool,
}

/// Read the session cookie, refresh it if expired, and confirm it with the
/// identity provider.
pub async fn resolve_session(state: &BridgeState, headers: &HeaderMap) -> Result<ResolvedSession> {
    let mut session = read_session(headers, &state.config.cookie)
        .ok_or_else(|| BridgeError::Unauthorized("missing or invalid session cookie".to_string()))?;

    let mut refreshed = false;
    if session.is_expired(now()) {
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            return Err(BridgeError::Unauthorized("session expired".to_string()));
        };
        session = SessionCookie::from(state.identity.refresh(refresh_token).await?);
        refreshed = true;
        debug!(user_id = %session.user_id, "Session refreshed");
    }

    let user = state.identity.get_user(&session.access_token).await?;
    Ok(ResolvedSession {
        session,
        user,
        refreshed,
    })
}

/// Append `Set-Cookie` for a refreshed session.
pub(crate) fn write_back(
    state: &BridgeState,
    resolved: &ResolvedSession,
    mut response: Response,
) -> Result<Response> {
    if resolved.refreshed {
        let cookie = session_set_cookie(&state.config.cookie, &resolved.session, now())?;
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// ANY /api/proxy/{*path} - Forward to the backend with the session's bearer.
pub async fn proxy_handler(
    State(state): State<BridgeState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    // The raw URI path, not the decoded wildcard, so encoded separators
    // reach the backend still encoded.
    let path = proxied_path(uri.path())?;
    let resolved = resolve_session(&state, &headers).await?;

    let response = state
        .passthrough
        .forward(
            method,
            path,
            uri.query(),
            &headers,
            body,
            &resolved.session.access_token,
        )
        .await?;

    write_back(&state, &resolved, response)
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Log each bridge request with whether it carried a session cookie.
///
/// A 401 is the normal answer to a browser that has not signed in yet, so
/// it logs at `debug`. Failures reaching the backend or the identity
/// provider surface as 5xx and log at `error`.
async fn log_bridge_request(
    State(state): State<BridgeState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.request_logging {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let has_session = parse_cookie(request.headers(), &state.config.cookie.name).is_some();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis();
    let status = response.status();
    let code = status.as_u16();
    if status.is_server_error() {
        tracing::error!(%method, %path, status = code, has_session, duration_ms, "Bridge request failed");
    } else if status == StatusCode::UNAUTHORIZED {
        debug!(%method, %path, has_session, duration_ms, "No usable session");
    } else if status.is_client_error() {
        warn!(%method, %path, status = code, has_session, duration_ms, "Bridge request rejected");
    } else {
        info!(%method, %path, status = code, has_session, duration_ms, "Bridge request handled");
    }

    response
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// The session bridge HTTP server.
pub struct BridgeServer {
    state: BridgeState,
}

impl BridgeServer {
    pub fn from_state(state: BridgeState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &BridgeState {
        &self.state
    }

    /// Build the axum router.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(health))
            .route(
                "/api/proxy/{*path}",
                any(proxy_handler).layer(DefaultBodyLimit::max(self.state.config.max_body_size)),
            )
            .route("/auth/login", get(callback::login_handler))
            .route("/auth/callback", get(callback::callback_handler))
            .route("/auth/logout", post(callback::logout_handler))
            .route("/auth/session", get(callback::session_handler))
            .route("/auth/error", get(callback::error_handler))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                log_bridge_request,
            ))
            .layer(TraceLayer::new_for_http());

        if let Some(cors) = cors_layer(&self.state.config.cors_origins) {
            router = router.layer(cors);
        }

        router.with_state(self.state.clone())
    }

    /// Run the bridge on the configured bind address.
    pub async fn run(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.state.config.bind_address).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let local_addr = listener.local_addr()?;
        info!(
            addr = %local_addr,
            backend = %self.state.config.backend_url,
            "Starting session bridge"
        );
        axum::serve(listener, self.router()).await
    }

    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}

/// CORS for the configured front-end origins, or `None` when empty.
///
/// Browsers send the session cookie, so credentials are allowed. Bearer
/// tokens never come from the browser, so `Authorization` is not.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
    )
}

/// Body of `GET /auth/session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub expires_at: i64,
}

impl From<&ResolvedSession> for SessionInfo {
    fn from(resolved: &ResolvedSession) -> Self {
        Self {
            user_id: resolved.user.id.clone(),
            email: resolved.user.email.clone(),
            expires_at: resolved.session.expires_at,
        }
    }
}
