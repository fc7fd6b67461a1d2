//! Session bridge for tasklist.
//!
//! Sits between the browser and the backend. The browser only ever holds an
//! HttpOnly session cookie; the bridge turns it into the bearer credential
//! the backend expects, and owns the login flow that creates the cookie.
//!
//! # Components
//!
//! - [`proxy`] - `/api/proxy/{*path}` forwarding and the axum server
//! - [`callback`] - `/auth/login`, `/auth/callback`, `/auth/logout`, `/auth/session`
//! - [`identity`] - identity provider seam and its hosted-service client
//! - [`session`] - session cookie codec and `Set-Cookie` construction
//! - [`passthrough`] - backend request forwarding
//! - [`pkce`] - PKCE verifier/challenge pairs for the login redirect

pub mod callback;
pub mod config;
pub mod error;
pub mod identity;
pub mod passthrough;
pub mod pkce;
pub mod proxy;
pub mod session;

pub use callback::{CallbackParams, CallbackState, safe_next};
pub use config::BridgeConfig;
pub use error::{BridgeError, ErrorResponse, Result};
pub use identity::{
    GoTrueConfig, GoTrueProvider, IdentityError, IdentityProvider, IdentityResult,
    IdentitySession, IdentityUser, SharedIdentityProvider,
};
pub use passthrough::Passthrough;
pub use pkce::PkceChallenge;
pub use proxy::{BridgeServer, BridgeState, ResolvedSession, SessionInfo, resolve_session};
pub use session::SessionCookie;
