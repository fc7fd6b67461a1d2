//! Error types for the session bridge.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::identity::IdentityError;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors surfaced by bridge routes.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// No usable session cookie, or the identity provider rejected it.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The backend could not be reached or its response could not be read.
    #[error("Proxy request failed: {0}")]
    ProxyRequestFailed(String),

    /// The identity provider could not be reached.
    #[error("Identity provider unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<IdentityError> for BridgeError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::Rejected { .. } => BridgeError::Unauthorized(e.to_string()),
            IdentityError::Network(msg) | IdentityError::InvalidResponse(msg) => {
                BridgeError::IdentityUnavailable(msg)
            }
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl BridgeError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            BridgeError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            BridgeError::ProxyRequestFailed(_) => (StatusCode::BAD_GATEWAY, "proxy_request_failed"),
            BridgeError::IdentityUnavailable(_) => {
                (StatusCode::BAD_GATEWAY, "identity_unavailable")
            }
            BridgeError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            BridgeError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "Bridge error");
        } else {
            tracing::warn!(status = %status, code, error = %message, "Bridge rejected request");
        }

        (
            status,
            Json(ErrorResponse {
                code: code.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_rejection_is_401() {
        let err = BridgeError::from(IdentityError::Rejected {
            status: 401,
            message: "invalid JWT".to_string(),
        });
        assert_eq!(err.status_and_code().0, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_identity_network_failure_is_502() {
        let err = BridgeError::from(IdentityError::Network("connection refused".to_string()));
        assert_eq!(err.status_and_code().0, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_proxy_failure_code() {
        let err = BridgeError::ProxyRequestFailed("timeout".to_string());
        assert_eq!(
            err.status_and_code(),
            (StatusCode::BAD_GATEWAY, "proxy_request_failed")
        );
    }
}
