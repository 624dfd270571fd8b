//! Murmur CLI
//!
//! Replay recorded chat sessions through the client stores and inspect the
//! effective configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use murmur_core::AppStores;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod replay;

use config::MurmurConfig;

#[derive(Parser)]
#[command(name = "murmur")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Murmur chat client state tools", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./murmur.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded session event log through the stores
    Replay {
        /// JSON file holding an array of session events
        events: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = MurmurConfig::load(cli.config.as_deref())?;

    // Initialize logging
    let filter = log_filter(cli.verbose, config.logging.filter.as_deref())?;
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Replay { events } => cmd_replay(&events, config),
        Commands::Config => cmd_config(&config),
    }
}

/// `debug` with `--verbose`, else the configured directives, else `info`
fn log_filter(verbose: bool, configured: Option<&str>) -> Result<EnvFilter> {
    if verbose {
        return Ok(EnvFilter::new("debug"));
    }
    match configured {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("Invalid logging.filter '{directives}'")),
        None => Ok(EnvFilter::new("info")),
    }
}

fn cmd_replay(path: &Path, config: MurmurConfig) -> Result<()> {
    let events = replay::load_events(path)?;
    info!("Replaying {} events from {}", events.len(), path.display());

    let app = AppStores::with_config(config.stores);
    if let Some(limit) = app.config().history_limit {
        info!("Keeping at most {limit} messages");
    }
    let summary = replay::replay(&app, events);

    println!("{summary}");
    Ok(())
}

fn cmd_config(config: &MurmurConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
