//! Tasklist - multi-user todo list
//!
//! Main entry point for the tasklist CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{bridge, serve, tasks, token};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Tasklist - multi-user todo list backend, session bridge and client
#[derive(Parser)]
#[command(name = "tasklist")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Server URL (default: http://localhost:8080)
    #[arg(long, global = true, env = "TASKLIST_SERVER_URL")]
    pub server: Option<String>,

    /// Path to config file (overrides default discovery)
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the task API backend
    Serve(serve::ServeArgs),

    /// Start the session bridge in front of the backend
    Bridge(bridge::BridgeArgs),

    /// List and edit your tasks
    Tasks(tasks::TasksArgs),

    /// Mint a development bearer token
    Token(token::TokenArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "tasklist=debug,tasklist_server=debug,tasklist_bridge=debug,tasklist_store=debug,tasklist_client=debug,tasklist_config=debug,info"
    } else {
        "tasklist=info,tasklist_server=info,tasklist_bridge=info,tasklist_store=info,warn"
    };

    let log_dir = tasklist_config::xdg_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "tasklist.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "tasklist=trace,tasklist_server=trace,tasklist_bridge=trace,tasklist_store=trace,tasklist_client=trace,tasklist_config=trace,info",
                )),
        )
        .init();

    let server_url = cli
        .server
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let ctx = commands::Context {
        server_url,
        config_path: cli.config,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Serve(args) => serve::run(args, &ctx).await,
        Commands::Bridge(args) => bridge::run(args, &ctx).await,
        Commands::Tasks(args) => tasks::run(args, &ctx).await,
        Commands::Token(args) => token::run(args, &ctx).await,
    }
}
