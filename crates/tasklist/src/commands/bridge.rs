//! Bridge command - runs the session bridge.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use tasklist_bridge::{BridgeConfig, BridgeServer, BridgeState, GoTrueConfig, GoTrueProvider};
use tasklist_config::{BridgeSection, TasklistConfig};

use super::{Context, socket_addr};

/// Arguments for the bridge command.
#[derive(Args, Debug)]
pub struct BridgeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Backend API base URL (overrides config)
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Identity provider base URL (overrides config)
    #[arg(long)]
    pub idp_url: Option<String>,
}

/// Run the bridge command.
pub async fn run(args: BridgeArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.load_config()?;
    apply_cli_overrides(&mut config, &args);
    config.validate_for_bridge()?;

    let section = config.bridge();
    let timeout = Duration::from_secs(section.timeout_secs);

    let identity = &section.identity;
    let gotrue = GoTrueConfig::new(
        identity.url.clone().unwrap_or_default(),
        identity.anon_key.clone().unwrap_or_default(),
    )
    .with_provider(identity.provider.clone())
    .with_timeout(timeout);
    let provider = GoTrueProvider::new(gotrue)?;

    let bridge_config = bridge_config(&section)?;
    if ctx.verbose {
        eprintln!(
            "Bridging {} -> {}",
            bridge_config.bind_address, bridge_config.backend_url
        );
    }

    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let state = BridgeState::with_client(bridge_config, Arc::new(provider), client);
    BridgeServer::from_state(state).run().await?;
    Ok(())
}

fn apply_cli_overrides(config: &mut TasklistConfig, args: &BridgeArgs) {
    if args.port.is_none()
        && args.bind.is_none()
        && args.backend_url.is_none()
        && args.idp_url.is_none()
    {
        return;
    }

    let bridge = config.bridge.get_or_insert_with(Default::default);
    if let Some(port) = args.port {
        bridge.port = port;
    }
    if let Some(ref bind) = args.bind {
        bridge.bind = bind.clone();
    }
    if let Some(ref url) = args.backend_url {
        bridge.backend_url = Some(url.clone());
    }
    if let Some(ref url) = args.idp_url {
        bridge.identity.url = Some(url.clone());
    }
}

fn bridge_config(section: &BridgeSection) -> Result<BridgeConfig> {
    let mut config = BridgeConfig::new(section.backend_url.clone().unwrap_or_default())
        .with_bind_address(socket_addr(&section.bind, section.port)?)
        .with_error_path(section.error_path.clone())
        .with_cookie(section.cookie.clone())
        .with_cors_origins(section.allowed_origins.clone())
        .with_request_logging(section.request_logging);
    if let Some(ref url) = section.identity.redirect_url {
        config = config.with_callback_url(url.clone());
    }
    Ok(config)
}
