//! draw-sync CLI
//!
//! Scrapes ATP and WTA draw pages and reconciles them into the backend.
//! Reports go to stdout, logs to stderr.

use anyhow::Result;
use clap::{Parser, Subcommand};
use draw_sync::scrape::{run_scrape, ScrapeArgs};
use draw_sync::sync::{run_sync, SyncArgs};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "draw-sync")]
#[command(version)]
#[command(about = "Sync tournament draws from the official draw pages")]
#[command(long_about = "Scrapes ATP and WTA draw pages through the egress proxy and reconciles them into the backend.\n\nCommands:\n  sync     Sync every active draw\n  scrape   Extract a single draw page")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every active draw and apply the differences
    Sync(SyncArgs),
    /// Extract one draw page and print slots and seeds
    Scrape(ScrapeArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Sync(args) => run_sync(args).await,
        Commands::Scrape(args) => run_scrape(args).await,
    }
}
