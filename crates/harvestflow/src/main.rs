mod commands;
mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hflow")]
#[command(about = "Build VM images on Harvester HCI", long_about = None)]
struct Cli {
    /// Verbose logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the source image, boot a builder VM and tear it down
    Build {
        /// Configuration file (defaults to harvestflow.yaml lookup)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the build result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check the configuration without touching the cluster
    Validate {
        /// Configuration file (defaults to harvestflow.yaml lookup)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Also verify the API token against the cluster
        #[arg(long)]
        check_auth: bool,
    },
    /// Show version information
    Version,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Build { config, json } => {
            commands::build::handle(config.as_deref(), json).await?;
        }
        Commands::Validate { config, check_auth } => {
            commands::validate::handle(config.as_deref(), check_auth).await?;
        }
        Commands::Version => {
            println!("harvestflow {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
