//! Session cookie codec.
//!
//! The browser holds the session as a single cookie whose value is the
//! base64url (unpadded) encoding of a small JSON document:
//!
//! ```text
//! { "access_token": "...", "refresh_token": "...", "expires_at": 1714557600, "user_id": "..." }
//! ```
//!
//! Attributes (`SameSite`, `Secure`, `Domain`) come from [`CookieSection`];
//! `Path=/` and `HttpOnly` are always set.

use axum::http::{HeaderMap, HeaderValue, header::COOKIE};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use tasklist_config::CookieSection;

use crate::error::{BridgeError, Result};
use crate::identity::IdentitySession;

/// Lifetime of the PKCE verifier cookie set by `/auth/login`.
pub const VERIFIER_COOKIE_MAX_AGE: i64 = 600;

/// Session state carried in the browser cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry of the access token (seconds since epoch).
    pub expires_at: i64,
    pub user_id: String,
}

impl From<IdentitySession> for SessionCookie {
    fn from(session: IdentitySession) -> Self {
        Self {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_at: session.expires_at,
            user_id: session.user.id,
        }
    }
}

impl SessionCookie {
    /// Encode as a cookie value.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| BridgeError::Internal(format!("Failed to encode session: {}", e)))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decode a cookie value. Any deviation from the format is an error.
    pub fn decode(value: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(value.trim()).ok()?;
        let session: Self = serde_json::from_slice(&bytes).ok()?;
        (!session.access_token.is_empty()).then_some(session)
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// Seconds until expiry, never negative.
    pub fn max_age(&self, now: i64) -> i64 {
        (self.expires_at - now).max(0)
    }
}

/// Name of the cookie holding the PKCE verifier between login and callback.
pub fn verifier_cookie_name(config: &CookieSection) -> String {
    format!("{}-code-verifier", config.name)
}

/// Read a cookie by name from the request headers.
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
}

/// Read and decode the session cookie.
pub fn read_session(headers: &HeaderMap, config: &CookieSection) -> Option<SessionCookie> {
    parse_cookie(headers, &config.name).and_then(|value| SessionCookie::decode(&value))
}

fn build_cookie(config: &CookieSection, name: &str, value: &str, max_age: i64) -> Result<HeaderValue> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        name, value, config.same_site, max_age
    );
    if config.secure {
        cookie.push_str("; Secure");
    }
    if let Some(domain) = &config.domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }

    HeaderValue::from_str(&cookie)
        .map_err(|e| BridgeError::Internal(format!("Invalid cookie header: {}", e)))
}

/// `Set-Cookie` value storing the session.
pub fn session_set_cookie(
    config: &CookieSection,
    session: &SessionCookie,
    now: i64,
) -> Result<HeaderValue> {
    build_cookie(config, &config.name, &session.encode()?, session.max_age(now))
}

/// `Set-Cookie` value storing the PKCE verifier.
pub fn verifier_set_cookie(config: &CookieSection, verifier: &str) -> Result<HeaderValue> {
    build_cookie(
        config,
        &verifier_cookie_name(config),
        verifier,
        VERIFIER_COOKIE_MAX_AGE,
    )
}

/// `Set-Cookie` value removing the named cookie.
pub fn clear_cookie(config: &CookieSection, name: &str) -> Result<HeaderValue> {
    build_cookie(config, name, "", 0)
}

#[cfg(test)]
mod tests {
    use tasklist_config::SameSite;

    use super::*;

    fn session() -> SessionCookie {
        SessionCookie {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: 1_000,
            user_id: "user-1".to_string(),
        }
    }

    #[test]
    fn test_encode_is_unpadded_base64url_json() {
        let encoded = session().encode().unwrap();
        assert!(!encoded.contains('='));

        let json: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(&encoded).unwrap()).unwrap();
        assert_eq!(json["access_token"], "access");
        assert_eq!(json["user_id"], "user-1");
        assert_eq!(SessionCookie::decode(&encoded), Some(session()));
    }

    #[test]
    fn test_decode_rejects_other_formats() {
        assert!(SessionCookie::decode("").is_none());
        assert!(SessionCookie::decode("not base64!").is_none());
        // Raw JSON is not accepted, only the encoded form
        assert!(SessionCookie::decode(r#"{"access_token":"a"}"#).is_none());
        let missing_fields = URL_SAFE_NO_PAD.encode(br#"{"access_token":"a"}"#);
        assert!(SessionCookie::decode(&missing_fields).is_none());
    }

    #[test]
    fn test_expiry() {
        let s = session();
        assert!(!s.is_expired(999));
        assert!(s.is_expired(1_000));
        assert_eq!(s.max_age(400), 600);
        assert_eq!(s.max_age(5_000), 0);
    }

    #[test]
    fn test_parse_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("a=1; tasklist-session=abc; b=2"));
        assert_eq!(parse_cookie(&headers, "tasklist-session").as_deref(), Some("abc"));
        assert_eq!(parse_cookie(&headers, "b").as_deref(), Some("2"));
        assert!(parse_cookie(&headers, "missing").is_none());
    }

    #[test]
    fn test_set_cookie_attributes() {
        let config = CookieSection {
            name: "sid".to_string(),
            same_site: SameSite::None,
            secure: true,
            domain: Some("example.com".to_string()),
        };

        let value = session_set_cookie(&config, &session(), 400).unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("sid="));
        assert!(value.contains("Path=/"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=None"));
        assert!(value.contains("Max-Age=600"));
        assert!(value.contains("; Secure"));
        assert!(value.contains("Domain=example.com"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let config = CookieSection::default();
        let value = clear_cookie(&config, &config.name).unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("tasklist-session=;"));
        assert!(value.contains("Max-Age=0"));
        assert!(value.contains("SameSite=Lax"));
        assert!(!value.contains("Secure"));
    }
}
