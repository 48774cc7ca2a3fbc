//! ---
//! fao_section: "01-core-functionality"
//! fao_subsection: "binary"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Binary entrypoint for the Factory AI Optimize daemon."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use fao_api::{spawn_api_server, ApiState};
use fao_common::config::AppConfig;
use fao_common::logging::init_tracing;
use fao_core::FactoryState;
use serde_json::json;
use tokio::signal;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Factory AI Optimize daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "ADDR", help = "Override the API listen address")]
    listen: Option<SocketAddr>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print version information and exit"
    )]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Serve the factory API")]
    Run,
    #[command(about = "Load and validate configuration, print a summary and exit")]
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("Factory AI Optimize {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    dotenvy::dotenv().ok();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/factory.toml"));
    candidates.push(PathBuf::from("configs/factory.example.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(listen) = cli.listen {
        config.api.listen = listen;
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            init_tracing("faod", &config.logging)?;
            match &loaded.source {
                Some(path) => info!(path = %path.display(), "configuration loaded"),
                None => info!("no configuration file found; using built-in defaults"),
            }
            run_daemon(config).await?
        }
        Commands::CheckConfig => {
            let summary = json!({
                "source": loaded.source.as_ref().map(|path| path.display().to_string()),
                "cameras": config.cameras.iter().map(|camera| &camera.id).collect::<Vec<_>>(),
                "drones": config.drones.iter().map(|drone| &drone.id).collect::<Vec<_>>(),
                "aiModel": config.ai.model,
                "aiConfigured": config.ai.is_configured(),
                "listen": config.api.listen.to_string(),
                "replayFile": config.simulation.replay_file.as_ref().map(|path| path.display().to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

async fn run_daemon(config: AppConfig) -> Result<()> {
    let api_settings = config.api.clone();
    info!(
        cameras = config.cameras.len(),
        drones = config.drones.len(),
        max_concurrent_processes = config.limits.max_concurrent_processes,
        data_retention_days = config.limits.data_retention_days,
        "starting factory services"
    );

    let factory = Arc::new(
        FactoryState::from_config(config).context("failed to initialise factory services")?,
    );

    let state = Arc::new(ApiState::new(factory));
    let server = spawn_api_server(state, api_settings.listen, api_settings.static_dir)?;
    info!(address = %server.addr(), "daemon running; waiting for termination signal");

    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");
    server.shutdown().await?;
    Ok(())
}
