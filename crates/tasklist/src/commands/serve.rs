//! Serve command - runs the task API backend.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::info;

use tasklist_config::{StoreBackend, TasklistConfig};
use tasklist_server::{AppState, Server, ServerConfig, TokenVerifier};
use tasklist_store::{RestStore, RestStoreConfig, SharedTaskStore, SqliteStore, TaskStore};

use super::{Context, socket_addr};

/// Arguments for the serve command.
///
/// CLI arguments override config file and environment values.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Shared signing secret for bearer tokens
    #[arg(long)]
    pub jwt_secret: Option<String>,

    /// SQLite database file (overrides config; in-memory when unset)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.load_config()?;
    apply_cli_overrides(&mut config, &args);
    config.validate_for_server()?;

    let section = config.server();
    let auth = config.auth();

    let secret = auth.jwt_secret.as_deref().unwrap_or_default();
    let mut verifier = TokenVerifier::new(secret);
    if let Some(audience) = auth.audience {
        verifier = verifier.with_audience(audience);
    }
    if let Some(issuer) = auth.issuer {
        verifier = verifier.with_issuer(issuer);
    }

    let store = open_store(&config)?;
    info!(store = store.name(), "Record store ready");

    let server_config = ServerConfig::new()
        .with_bind_address(socket_addr(&section.bind, section.port)?)
        .with_request_logging(section.request_logging)
        .with_cors_origins(section.allowed_origins);

    if ctx.verbose {
        eprintln!("Listening on {}", server_config.bind_address);
    }

    let state = AppState::new(server_config, verifier, store);
    Server::from_state(state).run().await?;
    Ok(())
}

fn apply_cli_overrides(config: &mut TasklistConfig, args: &ServeArgs) {
    if args.port.is_some() || args.bind.is_some() {
        let server = config.server.get_or_insert_with(Default::default);
        if let Some(port) = args.port {
            server.port = port;
        }
        if let Some(ref bind) = args.bind {
            server.bind = bind.clone();
        }
    }
    if let Some(ref secret) = args.jwt_secret {
        config.auth.get_or_insert_with(Default::default).jwt_secret = Some(secret.clone());
    }
    if let Some(ref db) = args.db {
        let store = config.store.get_or_insert_with(Default::default);
        store.backend = StoreBackend::Sqlite;
        store.path = Some(db.clone());
    }
}

/// Build the configured record store.
fn open_store(config: &TasklistConfig) -> Result<SharedTaskStore> {
    let store = config.store();
    match store.backend {
        StoreBackend::Sqlite => {
            let sqlite = match &store.path {
                Some(path) => SqliteStore::open(path)
                    .with_context(|| format!("Failed to open {}", path.display()))?,
                None => SqliteStore::open_in_memory()?,
            };
            Ok(Arc::new(sqlite))
        }
        StoreBackend::Rest => {
            let url = store.url.unwrap_or_default();
            let key = store.service_key.unwrap_or_default();
            let rest_config = RestStoreConfig::new(url, key)
                .with_table(store.table)
                .with_timeout(Duration::from_secs(store.timeout_secs));
            Ok(Arc::new(RestStore::new(rest_config)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ServeArgs {
        ServeArgs {
            port: None,
            bind: None,
            jwt_secret: None,
            db: None,
        }
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = TasklistConfig::from_toml(
            r#"
            [server]
            port = 9000

            [auth]
            jwt_secret = "from-file"
            "#,
        )
        .unwrap();

        let args = ServeArgs {
            port: Some(9100),
            jwt_secret: Some("from-cli".to_string()),
            ..args()
        };
        apply_cli_overrides(&mut config, &args);

        assert_eq!(config.server().port, 9100);
        assert_eq!(config.auth().jwt_secret.as_deref(), Some("from-cli"));
    }

    #[test]
    fn test_db_flag_selects_sqlite() {
        let mut config = TasklistConfig::from_toml(
            r#"
            [store]
            backend = "rest"
            url = "https://db.example.com"
            "#,
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("tasks.db");
        apply_cli_overrides(
            &mut config,
            &ServeArgs {
                db: Some(db.clone()),
                ..args()
            },
        );

        assert_eq!(config.store().backend, StoreBackend::Sqlite);
        let store = open_store(&config).unwrap();
        assert_eq!(store.name(), "sqlite");
        assert!(db.exists());
    }

    #[test]
    fn test_default_store_is_in_memory_sqlite() {
        let store = open_store(&TasklistConfig::new()).unwrap();
        assert_eq!(store.name(), "sqlite");
    }
}
