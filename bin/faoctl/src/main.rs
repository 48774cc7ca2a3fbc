//! ---
//! fao_section: "05-networking-external-interfaces"
//! fao_subsection: "binary"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Control CLI for operators interacting with the factory daemon."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use fao_common::logging::init_cli;
use fao_sim::{seeded_rng, ProductionSimulator};
use serde_json::Value;

mod client;
mod render;

use client::FactoryClient;

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Factory AI Optimize control utility",
    long_about = None
)]
struct Cli {
    #[arg(
        long,
        env = "FAO_URL",
        default_value = "http://127.0.0.1:3000",
        help = "Base URL of the daemon API"
    )]
    url: String,

    #[arg(long, default_value_t = 30, help = "Request timeout in seconds")]
    timeout: u64,

    #[arg(long, help = "Print raw JSON responses")]
    json: bool,

    #[arg(short, long, help = "Enable debug logging on stderr")]
    verbose: bool,

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
    #[command(about = "Run one factory analysis cycle")]
    Analyze,
    #[command(about = "Show the digital twin snapshot")]
    Twin,
    #[command(about = "Upload a photogrammetry JSON payload to the digital twin")]
    Photogrammetry {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    #[command(about = "Dispatch a drone inspection")]
    Inspect {
        area: String,
        #[arg(long)]
        drone: Option<String>,
    },
    #[command(about = "Show drone fleet status")]
    Drones,
    #[command(about = "Simulate a production run")]
    Simulate {
        #[arg(long, default_value_t = 8.0)]
        hours: f64,
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
        #[arg(long, help = "Run the simulator in-process instead of calling the daemon")]
        local: bool,
        #[arg(long, requires = "local", help = "Seed for the in-process simulator")]
        seed: Option<u64>,
    },
    #[command(about = "Estimate cost and ROI of a generated insight")]
    CostBenefit {
        #[arg(value_name = "SUGGESTION_ID")]
        id: String,
    },
    #[command(about = "Show camera, drone and model configuration")]
    Config,
    #[command(about = "Show the factory floor layout")]
    Layout,
    #[command(about = "Check daemon health")]
    Health,
    #[command(about = "Summarise twin, cameras and drones")]
    Dashboard,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_cli(cli.verbose);
    if cli.version {
        println!("faoctl {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let client = FactoryClient::new(&cli.url, Duration::from_secs(cli.timeout))?;
    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Analyze => {
            let response = client.analyze().await?;
            emit(cli.json, &response, render::insights);
        }
        Commands::Twin => print_json(&client.digital_twin().await?),
        Commands::Photogrammetry { file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("unable to read {}", file.display()))?;
            let payload: Value = serde_json::from_str(&contents)
                .with_context(|| format!("invalid JSON in {}", file.display()))?;
            print_json(&client.photogrammetry(payload).await?);
        }
        Commands::Inspect { area, drone } => {
            let result = client.inspect(&area, drone.as_deref()).await?;
            emit(cli.json, &result, render::inspection);
        }
        Commands::Drones => {
            let drones = client.drones().await?;
            emit(cli.json, &drones, render::fleet);
        }
        Commands::Simulate {
            hours,
            speed,
            local,
            seed,
        } => {
            let report = if local {
                let simulator = ProductionSimulator::new(seeded_rng(seed, 0));
                serde_json::to_value(simulator.run_simulation(hours, speed))?
            } else {
                client.simulate(hours, speed).await?
            };
            emit(cli.json, &report, render::simulation);
        }
        Commands::CostBenefit { id } => print_json(&client.cost_benefit(&id).await?),
        Commands::Config => print_json(&client.config().await?),
        Commands::Layout => print_json(&client.layout().await?),
        Commands::Health => print_json(&client.health().await?),
        Commands::Dashboard => {
            let (config, drones, twin) =
                tokio::try_join!(client.config(), client.drones(), client.digital_twin())?;
            print!("{}", render::dashboard(&config, &drones, &twin));
        }
    }
    Ok(())
}

fn emit(raw: bool, value: &Value, renderer: fn(&Value) -> String) {
    if raw {
        print_json(value);
    } else {
        print!("{}", renderer(value));
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}
