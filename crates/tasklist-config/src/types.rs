//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [server]                 # backend API listener
//! [auth]                   # bearer credential verification
//! [store]                  # record store (remote table or local SQLite)
//! [bridge]                 # session bridge listener + backend URL
//! [bridge.identity]        # identity provider endpoint and key
//! [bridge.cookie]          # session cookie attributes
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default backend port.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default bridge port.
pub const DEFAULT_BRIDGE_PORT: u16 = 3000;

/// Default bind address for both listeners.
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default outbound request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "tasklist-session";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TasklistConfig {
    pub server: Option<ServerSection>,
    pub auth: Option<AuthSection>,
    pub store: Option<StoreSection>,
    pub bridge: Option<BridgeSection>,
}

impl TasklistConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced wholesale, matching how a project-local file
    /// is expected to restate the section it overrides.
    pub fn merge(&mut self, other: TasklistConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.auth.is_some() {
            self.auth = other.auth;
        }
        if other.store.is_some() {
            self.store = other.store;
        }
        if other.bridge.is_some() {
            self.bridge = other.bridge;
        }
    }

    /// The `[server]` section, or defaults.
    pub fn server(&self) -> ServerSection {
        self.server.clone().unwrap_or_default()
    }

    /// The `[auth]` section, or defaults.
    pub fn auth(&self) -> AuthSection {
        self.auth.clone().unwrap_or_default()
    }

    /// The `[store]` section, or defaults.
    pub fn store(&self) -> StoreSection {
        self.store.clone().unwrap_or_default()
    }

    /// The `[bridge]` section, or defaults.
    pub fn bridge(&self) -> BridgeSection {
        self.bridge.clone().unwrap_or_default()
    }

    /// Check that everything the backend server needs is present.
    pub fn validate_for_server(&self) -> Result<()> {
        let auth = self.auth();
        if auth.jwt_secret.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingField {
                field: "jwt_secret".to_string(),
                context: "[auth] (or TASKLIST_JWT_SECRET)".to_string(),
            });
        }

        let store = self.store();
        if store.backend == StoreBackend::Rest {
            if store.url.is_none() {
                return Err(ConfigError::MissingField {
                    field: "url".to_string(),
                    context: "[store] (or TASKLIST_STORE_URL)".to_string(),
                });
            }
            if store.service_key.is_none() {
                return Err(ConfigError::MissingField {
                    field: "service_key".to_string(),
                    context: "[store] (or TASKLIST_STORE_KEY)".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Check that everything the session bridge needs is present.
    pub fn validate_for_bridge(&self) -> Result<()> {
        let bridge = self.bridge();

        if bridge.backend_url.is_none() {
            return Err(ConfigError::MissingField {
                field: "backend_url".to_string(),
                context: "[bridge] (or TASKLIST_BACKEND_URL)".to_string(),
            });
        }
        if bridge.identity.url.is_none() {
            return Err(ConfigError::MissingField {
                field: "url".to_string(),
                context: "[bridge.identity] (or TASKLIST_IDP_URL)".to_string(),
            });
        }
        if bridge.identity.anon_key.is_none() {
            return Err(ConfigError::MissingField {
                field: "anon_key".to_string(),
                context: "[bridge.identity] (or TASKLIST_IDP_KEY)".to_string(),
            });
        }

        bridge.cookie.validate()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// Backend API listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
    /// Enable the request logging middleware.
    pub request_logging: bool,
    /// Browser origins allowed to call the backend directly.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_SERVER_PORT,
            request_logging: true,
            allowed_origins: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Bearer credential verification settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Shared HS256 signing secret.
    pub jwt_secret: Option<String>,
    /// Expected `aud` claim. Not checked when unset.
    pub audience: Option<String>,
    /// Expected `iss` claim. Not checked when unset.
    pub issuer: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// Which record store implementation the backend talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Remote REST table on the managed database.
    Rest,
    /// Local SQLite file.
    #[default]
    Sqlite,
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub backend: StoreBackend,
    /// Base URL of the managed database (REST backend).
    pub url: Option<String>,
    /// Service key sent as `apikey` and bearer (REST backend).
    pub service_key: Option<String>,
    /// Remote table name.
    pub table: String,
    /// Database file (SQLite backend). In-memory when unset.
    pub path: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: None,
            service_key: None,
            table: "tasks".to_string(),
            path: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bridge
// ─────────────────────────────────────────────────────────────────────────────

/// Session bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSection {
    pub bind: String,
    pub port: u16,
    /// Base URL of the backend API the bridge forwards to.
    pub backend_url: Option<String>,
    /// Path the auth callback redirects to on failure.
    pub error_path: String,
    /// Browser origins allowed to call the bridge cross-origin.
    pub allowed_origins: Vec<String>,
    pub request_logging: bool,
    pub timeout_secs: u64,
    pub identity: IdentitySection,
    pub cookie: CookieSection,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_BRIDGE_PORT,
            backend_url: None,
            error_path: "/auth/error".to_string(),
            allowed_origins: Vec::new(),
            request_logging: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            identity: IdentitySection::default(),
            cookie: CookieSection::default(),
        }
    }
}

/// Identity provider endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySection {
    /// Base URL of the identity provider.
    pub url: Option<String>,
    /// Public (anon) API key.
    pub anon_key: Option<String>,
    /// OAuth provider name passed to the authorize endpoint.
    pub provider: String,
    /// Public URL of this bridge's `/auth/callback`.
    pub redirect_url: Option<String>,
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            provider: "github".to_string(),
            redirect_url: None,
        }
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// Session cookie attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSection {
    pub name: String,
    pub same_site: SameSite,
    pub secure: bool,
    pub domain: Option<String>,
}

impl Default for CookieSection {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            same_site: SameSite::default(),
            secure: false,
            domain: None,
        }
    }
}

impl CookieSection {
    /// Browsers drop `SameSite=None` cookies that are not `Secure`.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.contains([';', '=', ' ']) {
            return Err(ConfigError::Invalid {
                field: "bridge.cookie.name".to_string(),
                reason: format!("'{}' is not a valid cookie name", self.name),
            });
        }
        if self.same_site == SameSite::None && !self.secure {
            return Err(ConfigError::Invalid {
                field: "bridge.cookie.same_site".to_string(),
                reason: "same_site = \"none\" requires secure = true".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
