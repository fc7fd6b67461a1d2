//! Application state shared across handlers.

use std::sync::Arc;

use tasklist_store::SharedTaskStore;

use crate::config::ServerConfig;
use crate::verifier::TokenVerifier;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Bearer credential verifier.
    pub verifier: Arc<TokenVerifier>,

    /// Owner-scoped task store.
    pub store: SharedTaskStore,
}

impl AppState {
    /// Create a new application state.
    pub fn new(config: ServerConfig, verifier: TokenVerifier, store: SharedTaskStore) -> Self {
        Self {
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            store,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    pub fn store(&self) -> &SharedTaskStore {
        &self.store
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("verifier", &self.verifier)
            .field("store", &self.store.name())
            .finish()
    }
}
