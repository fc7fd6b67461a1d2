//! Bearer credential verification.
//!
//! Credentials are HS256 JWTs signed with a secret shared between the
//! identity provider and this server. A verified token yields its claim
//! set; the `sub` claim scopes every task operation.

use std::fmt;
use std::time::Duration;

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use tasklist_types::SubjectId;
use thiserror::Error;
use tracing::debug;

/// Why a credential was rejected.
///
/// Claims that parse but fail validation (wrong audience or issuer, empty
/// subject) are reported as [`TokenError::Malformed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// The `aud` claim, which may be a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

/// Claim set carried by a bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// Expires at (seconds since epoch).
    pub exp: u64,
    /// Issued at (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Claims {
    pub fn subject(&self) -> SubjectId {
        SubjectId::new(&self.sub)
    }
}

/// Verifies (and, for tooling, issues) HS256 bearer credentials.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
    audience: Option<String>,
    issuer: Option<String>,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Create a verifier for the given shared secret.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.validate_aud = false;

        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            validation,
            audience: None,
            issuer: None,
        }
    }

    /// Require the `aud` claim to contain `audience`.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        let audience = audience.into();
        self.validation.set_audience(&[audience.as_str()]);
        self.validation.validate_aud = true;
        self.require_claim("aud");
        self.audience = Some(audience);
        self
    }

    /// Require the `iss` claim to equal `issuer`.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();
        self.validation.set_issuer(&[issuer.as_str()]);
        self.require_claim("iss");
        self.issuer = Some(issuer);
        self
    }

    /// A configured audience or issuer is only checked when the claim is
    /// present, so it must also be required.
    fn require_claim(&mut self, claim: &str) {
        self.validation.required_spec_claims.insert(claim.to_string());
    }

    /// Allowed clock skew when checking `exp`.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.validation.leeway = leeway.as_secs();
        self
    }

    /// Verify a credential (without the `Bearer ` prefix).
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            let err = match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            };
            debug!(error = %err, "Bearer credential rejected");
            err
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(TokenError::Malformed("empty subject".to_string()));
        }

        Ok(data.claims)
    }

    /// Issue a credential for `subject` valid for `ttl`.
    ///
    /// Carries the configured audience and issuer so it passes [`verify`].
    ///
    /// [`verify`]: Self::verify
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, TokenError> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let exp = now
            .checked_add(ttl.as_secs())
            .filter(|exp| i64::try_from(*exp).is_ok())
            .ok_or_else(|| {
                TokenError::Malformed(format!("ttl of {}s is out of range", ttl.as_secs()))
            })?;
        let claims = Claims {
            sub: subject.to_string(),
            exp,
            iat: Some(now),
            aud: self.audience.clone().map(Audience::One),
            iss: self.issuer.clone(),
            email: None,
            role: Some("authenticated".to_string()),
        };
        self.sign(&claims)
    }

    /// Sign an arbitrary claim set with the shared secret.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Malformed(e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
