//! CLI command handlers.

use std::path::PathBuf;

use anyhow::Result;
use tasklist_config::{SearchPaths, TasklistConfig};

pub mod bridge;
pub mod serve;
pub mod tasks;
pub mod token;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Server URL to connect to.
    pub server_url: String,
    /// Explicit config file, bypassing discovery.
    pub config_path: Option<PathBuf>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Load config files (or the explicit `--config` file), then apply
    /// environment overrides.
    pub fn load_config(&self) -> Result<TasklistConfig> {
        let search = match &self.config_path {
            Some(path) => SearchPaths::explicit(path),
            None => SearchPaths::default(),
        };
        let loaded = tasklist_config::load_config(&search, |key| std::env::var(key).ok())?;

        for warning in &loaded.warnings {
            eprintln!("warning: {}", warning);
        }

        if self.verbose {
            if loaded.loaded_from.is_empty() {
                eprintln!("No config files found, using defaults + environment");
            }
            for source in &loaded.loaded_from {
                eprintln!("Loaded config: {}", source.display());
            }
        }

        Ok(loaded.config)
    }
}

/// Parse `bind:port` into a socket address.
pub(crate) fn socket_addr(bind: &str, port: u16) -> Result<std::net::SocketAddr> {
    format!("{}:{}", bind, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {}:{}: {}", bind, port, e))
}
