//! Identity provider integration.
//!
//! The bridge needs five things from the provider: the authorize URL to
//! send browsers to, the authorization-code exchange, session refresh,
//! session resolution (who does this access token belong to) and sign-out.
//! [`IdentityProvider`] is the seam; [`GoTrueProvider`] speaks the hosted
//! auth service's `/auth/v1` REST API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The provider answered and refused (bad code, revoked session, ...).
    #[error("Identity provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The provider could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with something we could not parse.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(e: reqwest::Error) -> Self {
        IdentityError::Network(e.to_string())
    }
}

pub type IdentityResult<T> = std::result::Result<T, IdentityError>;

/// An authenticated user as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A session issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Access token expiry (seconds since epoch).
    pub expires_at: i64,
    pub user: IdentityUser,
}

/// Operations the bridge needs from the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL to send the browser to for login.
    fn authorize_url(&self, redirect_to: &str, code_challenge: &str) -> String;

    /// Exchange an authorization code for a session.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> IdentityResult<IdentitySession>;

    /// Trade a refresh credential for a new session.
    async fn refresh(&self, refresh_token: &str) -> IdentityResult<IdentitySession>;

    /// Resolve the user an access token belongs to.
    async fn get_user(&self, access_token: &str) -> IdentityResult<IdentityUser>;

    /// Revoke the session behind an access token.
    async fn sign_out(&self, access_token: &str) -> IdentityResult<()>;
}

/// Shared, dynamically dispatched identity provider.
pub type SharedIdentityProvider = Arc<dyn IdentityProvider>;

// ─────────────────────────────────────────────────────────────────────────────
// GoTrue
// ─────────────────────────────────────────────────────────────────────────────

/// Connection settings for the hosted auth service.
#[derive(Debug, Clone)]
pub struct GoTrueConfig {
    /// Project base URL; endpoints live under `/auth/v1`.
    pub url: String,
    /// Public API key sent as the `apikey` header.
    pub anon_key: String,
    /// OAuth provider for the authorize redirect (e.g. `github`).
    pub provider: String,
    pub timeout: Duration,
}

impl GoTrueConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            provider: "github".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: IdentityUser,
}

impl TokenResponse {
    fn into_session(self, now: i64) -> IdentitySession {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now + secs))
            .unwrap_or(now);
        IdentitySession {
            access_token: self.access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expires_at,
            user: self.user,
        }
    }
}

#[derive(Debug, Serialize)]
struct PkceExchangeRequest<'a> {
    auth_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_verifier: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// [`IdentityProvider`] backed by the hosted auth service.
#[derive(Debug, Clone)]
pub struct GoTrueProvider {
    client: Client,
    config: GoTrueConfig,
}

impl GoTrueProvider {
    pub fn new(config: GoTrueConfig) -> IdentityResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GoTrueConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.url.trim_end_matches('/'), path)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.endpoint(path))
            .header("apikey", &self.config.anon_key)
    }

    async fn check(response: Response) -> IdentityResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                ["error_description", "msg", "message", "error"]
                    .iter()
                    .find_map(|key| v.get(key).and_then(|m| m.as_str()).map(String::from))
            })
            .unwrap_or(body);

        Err(IdentityError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn session_from(response: Response) -> IdentityResult<IdentitySession> {
        let response = Self::check(response).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(format!("token response: {}", e)))?;
        Ok(token.into_session(chrono::Utc::now().timestamp()))
    }
}

#[async_trait]
impl IdentityProvider for GoTrueProvider {
    fn authorize_url(&self, redirect_to: &str, code_challenge: &str) -> String {
        let params = [
            ("provider", self.config.provider.as_str()),
            ("redirect_to", redirect_to),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "s256"),
        ];

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.endpoint("authorize"), query)
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> IdentityResult<IdentitySession> {
        let response = self
            .post("token")
            .query(&[("grant_type", "pkce")])
            .json(&PkceExchangeRequest {
                auth_code: code,
                code_verifier,
            })
            .send()
            .await?;

        let session = Self::session_from(response).await?;
        debug!(user_id = %session.user.id, "Exchanged authorization code");
        Ok(session)
    }

    async fn refresh(&self, refresh_token: &str) -> IdentityResult<IdentitySession> {
        let response = self
            .post("token")
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let session = Self::session_from(response).await?;
        debug!(user_id = %session.user.id, "Refreshed session");
        Ok(session)
    }

    async fn get_user(&self, access_token: &str) -> IdentityResult<IdentityUser> {
        let response = self
            .client
            .get(self.endpoint("user"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(format!("user response: {}", e)))
    }

    async fn sign_out(&self, access_token: &str) -> IdentityResult<()> {
        let response = self.post("logout").bearer_auth(access_token).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GoTrueProvider {
        GoTrueProvider::new(GoTrueConfig::new("https://id.example.com/", "anon")).unwrap()
    }

    #[test]
    fn test_authorize_url() {
        let url = provider().authorize_url("http://localhost:3000/auth/callback?next=/", "chal");
        assert!(url.starts_with("https://id.example.com/auth/v1/authorize?provider=github&"));
        assert!(url.contains(
            "redirect_to=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback%3Fnext%3D%2F"
        ));
        assert!(url.contains("code_challenge=chal"));
        assert!(url.contains("code_challenge_method=s256"));
    }

    #[test]
    fn test_expiry_from_expires_in() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"","expires_in":3600,
                "user":{"id":"u1"}}"#,
        )
        .unwrap();
        let session = token.into_session(1_000);
        assert_eq!(session.expires_at, 4_600);
        assert!(session.refresh_token.is_none());
    }

    #[test]
    fn test_explicit_expires_at_wins() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"expires_at":99,
                "user":{"id":"u1","email":"u@example.com"}}"#,
        )
        .unwrap();
        let session = token.into_session(1_000);
        assert_eq!(session.expires_at, 99);
        assert_eq!(session.user.email.as_deref(), Some("u@example.com"));
    }
}
