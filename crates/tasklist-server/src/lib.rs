//! Bearer-authenticated task API.
//!
//! The backend half of tasklist: every `/api` request carries a JWT which is
//! verified against the shared secret, and the token's subject scopes all
//! reads and writes against the configured [`TaskStore`].
//!
//! # Routes
//!
//! - `GET /health` (no auth)
//! - `GET /api/tasks`
//! - `POST /api/tasks`
//! - `PATCH /api/tasks/{id}`
//! - `DELETE /api/tasks/{id}`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tasklist_server::{AppState, Server, ServerConfig, TokenVerifier};
//! use tasklist_store::SqliteStore;
//!
//! let state = AppState::new(
//!     ServerConfig::new().with_bind_address("127.0.0.1:8080".parse()?),
//!     TokenVerifier::new(&secret),
//!     Arc::new(SqliteStore::open("tasks.db")?),
//! );
//! Server::from_state(state).run().await?;
//! ```
//!
//! [`TaskStore`]: tasklist_store::TaskStore

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod state;
pub mod verifier;

pub use auth::{AuthError, Identity, auth_middleware, bearer_token};
pub use config::ServerConfig;
pub use error::{ErrorResponse, Result, ServerError};
pub use logging::request_logging_middleware;
pub use state::AppState;
pub use verifier::{Audience, Claims, TokenError, TokenVerifier};

use std::net::SocketAddr;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// The tasklist backend HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(routes::health_routes())
            .nest("/api", self.api_routes())
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                logging::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http());

        if let Some(cors) = cors_layer(&self.state.config.cors_origins) {
            router = router.layer(cors);
        }

        router.with_state(self.state.clone())
    }

    /// API routes. All of them require a bearer credential.
    fn api_routes(&self) -> Router<AppState> {
        use axum::routing::{get, patch};

        Router::new()
            .route(
                "/tasks",
                get(routes::list_tasks_handler).post(routes::create_task_handler),
            )
            .route(
                "/tasks/{id}",
                patch(routes::update_task_handler).delete(routes::delete_task_handler),
            )
            .layer(DefaultBodyLimit::max(self.state.config.max_body_size))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth::auth_middleware,
            ))
    }

    /// Run the server on the configured bind address.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address.
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener (useful for ephemeral ports).
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let router = self.router();

        if let Ok(addr) = listener.local_addr() {
            info!(store = self.state.store.name(), "Starting server on {}", addr);
        }

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}

/// Build a CORS layer for the given origins, or `None` when the list is empty.
pub(crate) fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
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
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}
