//! Bridge configuration.

use std::net::SocketAddr;

use tasklist_config::CookieSection;

/// Default max body size forwarded to the backend (64 KB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;

/// Bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub bind_address: SocketAddr,

    /// Backend base URL; proxied paths land under `{backend_url}/api/`.
    pub backend_url: String,

    /// Path browsers are redirected to when login fails.
    pub error_path: String,

    /// Public URL of `/auth/callback`. Derived from the `Host` header when unset.
    pub callback_url: Option<String>,

    /// Session cookie attributes.
    pub cookie: CookieSection,

    /// CORS allowed origins (empty = no CORS).
    pub cors_origins: Vec<String>,

    pub request_logging: bool,

    pub max_body_size: usize,
}

impl BridgeConfig {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 3000)),
            backend_url: backend_url.into(),
            error_path: "/auth/error".to_string(),
            callback_url: None,
            cookie: CookieSection::default(),
            cors_origins: Vec::new(),
            request_logging: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    pub fn with_error_path(mut self, path: impl Into<String>) -> Self {
        self.error_path = path.into();
        self
    }

    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    pub fn with_cookie(mut self, cookie: CookieSection) -> Self {
        self.cookie = cookie;
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }
}
