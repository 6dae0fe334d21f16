use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod report;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "labelcheck")]
#[command(about = "Check a beverage label image against its expected label fields")]
#[command(version)]
struct Cli {
    /// Config file path (default: per-user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// OCR a label image and verify the expected fields against it
    Verify(commands::VerifyArgs),
    /// List recently logged verification runs
    Logs(commands::LogsArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Verify(args) => commands::verify(&config, args).await,
        Commands::Logs(args) => commands::logs(&config, args).await,
    }
}
