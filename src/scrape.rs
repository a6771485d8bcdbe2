//! scrape command: extract a single draw page and print what was found
//!
//! No backend access. Handy for checking an extractor against a live page or
//! a page saved by `sync --fetch-mode record`.

use crate::extract::{extract, Site};
use crate::fetch::{FetchConfig, Fetcher, ProxyFetcher};
use crate::model::expected_slot_count;
use crate::output::{render, OutputFormat};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

#[derive(Args)]
pub struct ScrapeArgs {
    /// Draw page URL; its host picks the extractor
    #[arg(value_name = "URL")]
    url: String,

    /// Number of round-1 slots in the draw
    #[arg(long)]
    size: u32,

    /// Read the page from a saved file instead of fetching it
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Egress proxy for the live fetch
    #[arg(long, env = "PROXY_URL")]
    proxy_url: Option<String>,

    /// Timeout per fetch attempt in seconds
    #[arg(long, default_value = "300")]
    timeout: u64,

    /// Fetch attempts
    #[arg(long, default_value = "5")]
    retries: u32,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Run the scrape command
pub async fn run_scrape(args: ScrapeArgs) -> Result<()> {
    let site = Site::from_url(&args.url)
        .with_context(|| format!("No extractor for {}", args.url))?;

    let html = match &args.file {
        Some(path) => fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let config = FetchConfig {
                proxy_url: args.proxy_url.clone(),
                timeout: Duration::from_secs(args.timeout),
                attempts: args.retries,
                ..FetchConfig::default()
            };
            ProxyFetcher::new(&config)?.fetch(&args.url).await
        }
    };

    let extraction = extract(site, &html, "");
    let report = extraction.report(site, expected_slot_count(args.size));

    if report.complete {
        info!(%site, slots = report.scraped, "draw complete");
    } else {
        warn!(
            %site,
            expected = report.expected,
            actual = report.scraped,
            "slot count mismatch"
        );
    }

    println!("{}", render(&report, args.format)?);

    Ok(())
}
