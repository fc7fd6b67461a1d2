//! Common test utilities for bridge integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tasklist_bridge::{
    BridgeConfig, BridgeServer, BridgeState, IdentityError, IdentityProvider, IdentityResult,
    IdentitySession, IdentityUser, SessionCookie,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// In-process identity provider with a fixed set of live sessions.
#[derive(Default)]
pub struct MockIdentity {
    /// access token -> user id
    pub users: HashMap<String, String>,
    /// refresh token -> (new access token, user id)
    pub refresh: HashMap<String, (String, String)>,
    pub get_user_calls: AtomicUsize,
}

impl MockIdentity {
    pub fn with_user(mut self, access_token: &str, user_id: &str) -> Self {
        self.users.insert(access_token.to_string(), user_id.to_string());
        self
    }

    pub fn with_refresh(mut self, refresh_token: &str, access_token: &str, user_id: &str) -> Self {
        self.refresh.insert(
            refresh_token.to_string(),
            (access_token.to_string(), user_id.to_string()),
        );
        self.users.insert(access_token.to_string(), user_id.to_string());
        self
    }

    pub fn get_user_calls(&self) -> usize {
        self.get_user_calls.load(Ordering::SeqCst)
    }
}

fn rejected() -> IdentityError {
    IdentityError::Rejected {
        status: 401,
        message: "invalid JWT".to_string(),
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    fn authorize_url(&self, redirect_to: &str, code_challenge: &str) -> String {
        format!(
            "https://id.test/authorize?redirect_to={}&code_challenge={}",
            urlencoding::encode(redirect_to),
            code_challenge
        )
    }

    async fn exchange_code(
        &self,
        _code: &str,
        _code_verifier: Option<&str>,
    ) -> IdentityResult<IdentitySession> {
        Err(rejected())
    }

    async fn refresh(&self, refresh_token: &str) -> IdentityResult<IdentitySession> {
        let (access_token, user_id) = self.refresh.get(refresh_token).ok_or_else(rejected)?;
        Ok(IdentitySession {
            access_token: access_token.clone(),
            refresh_token: Some(format!("{}-next", refresh_token)),
            expires_at: chrono::Utc::now().timestamp() + 3600,
            user: IdentityUser {
                id: user_id.clone(),
                email: None,
            },
        })
    }

    async fn get_user(&self, access_token: &str) -> IdentityResult<IdentityUser> {
        self.get_user_calls.fetch_add(1, Ordering::SeqCst);
        let id = self.users.get(access_token).ok_or_else(rejected)?;
        Ok(IdentityUser {
            id: id.clone(),
            email: None,
        })
    }

    async fn sign_out(&self, _access_token: &str) -> IdentityResult<()> {
        Ok(())
    }
}

/// Session cookie value for `access_token`, valid for an hour.
pub fn live_cookie(access_token: &str, user_id: &str) -> String {
    SessionCookie {
        access_token: access_token.to_string(),
        refresh_token: None,
        expires_at: chrono::Utc::now().timestamp() + 3600,
        user_id: user_id.to_string(),
    }
    .encode()
    .expect("encode session")
}

/// A bridge running in the background on an ephemeral port.
pub struct TestBridge {
    pub addr: SocketAddr,
    pub client: Client,
    _handle: JoinHandle<()>,
}

impl TestBridge {
    pub async fn start(config: BridgeConfig, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = BridgeState::new(config.with_request_logging(false), identity);
        let server = BridgeServer::from_state(state);
        let handle = tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            addr,
            client,
            _handle: handle,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Start a request carrying the session cookie.
    pub fn with_cookie(
        &self,
        method: reqwest::Method,
        path: &str,
        cookie_value: &str,
    ) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("cookie", format!("tasklist-session={}", cookie_value))
    }
}
