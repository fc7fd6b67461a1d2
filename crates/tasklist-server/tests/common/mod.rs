//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tasklist_server::{AppState, Server, ServerConfig, TokenVerifier};
use tasklist_store::SqliteStore;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Shared secret used by every test server.
pub const TEST_SECRET: &str = "integration-test-secret";

/// A backend server running in the background on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    /// Direct handle on the store behind the server.
    pub store: Arc<SqliteStore>,
    verifier: TokenVerifier,
    _handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let store = Arc::new(SqliteStore::open_in_memory()?);
        let verifier = TokenVerifier::new(TEST_SECRET);
        let config = ServerConfig::new()
            .with_bind_address(addr)
            .with_request_logging(false);

        let state = AppState::new(config, verifier.clone(), store.clone());
        let server = Server::from_state(state);
        let handle = tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });

        Ok(Self {
            addr,
            client: Client::new(),
            store,
            verifier,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Mint a valid bearer credential for `subject`.
    pub fn token_for(&self, subject: &str) -> String {
        self.verifier
            .issue(subject, Duration::from_secs(600))
            .expect("failed to issue test token")
    }

    /// Start a request with a bearer credential for `subject`.
    pub fn as_user(&self, method: reqwest::Method, path: &str, subject: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(self.token_for(subject))
    }
}
