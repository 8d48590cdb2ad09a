//! # Card Scrape
//!
//! A configuration-driven scraper for product listing pages. A site config
//! names the CSS class of the repeating "card" container and, for every
//! output field, a path of tag/class steps from the container to the node
//! holding the value plus what to extract from it (text, `href`, `src` or any
//! attribute). Every page in a URL list is scraped with the same config and
//! all records land in one timestamped JSON file.
//!
//! ## Features
//!
//! - Declarative field paths (`find` / `find_all` steps) over parsed HTML
//! - Config validation and a one-page preview mode for writing new configs
//! - Retrying HTTP fetcher with exponential backoff and jitter
//! - Per-record source, time and config metadata
//! - Product classification and field completion statistics over output files
//!
//! ## Usage
//!
//! ```sh
//! card_scrape run --config configs/config_01.json --urls configs/urls.txt
//! card_scrape test --config configs/config_01.json --url https://shop.example/
//! ```
//!
//! ## Architecture
//!
//! 1. **Config**: Load and validate the site config (JSON or YAML)
//! 2. **URLs**: Read the URL list, optionally filtered by domain
//! 3. **Scraping**: Fetch each page in order and build one record per container
//! 4. **Output**: Write all records to a single JSON file

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod classify;
mod cli;
mod config;
mod engine;
mod error;
mod fetch;
mod models;
mod outputs;
mod runner;
mod stats;
mod urls;
mod utils;

use cli::{Cli, Command};
use fetch::default_fetcher;
use utils::{ensure_writable_dir, latest_json_file};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args.command, "Parsed CLI arguments");

    match args.command {
        Command::Run {
            config,
            urls,
            output_dir,
            domain,
        } => run(&config, &urls, &output_dir, domain.as_deref()).await,
        Command::Test {
            config,
            url,
            max_products,
        } => {
            let site = config::load_site_config(&config).await?;
            let fetcher = default_fetcher()?;
            let preview = runner::test_config_on_url(&fetcher, &site, &url, max_products).await;
            println!("{}", serde_json::to_string_pretty(&preview)?);
            Ok(())
        }
        Command::Validate { config } => {
            let (site, report) = config::load_unchecked(&config).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.has_errors() {
                return Err(format!("{} is not a valid config", config.display()).into());
            }
            config::check_export(&site.export)?;
            if report.is_valid() {
                info!("Config has no issues");
            } else {
                warn!(issues = report.issues.len(), "Config is usable with warnings");
            }
            Ok(())
        }
        Command::InitConfig { path } => {
            config::write_template(&path).await?;
            println!("Wrote config template to {}", path.display());
            Ok(())
        }
        Command::Classify {
            file,
            output_dir,
            names,
            field,
        } => {
            let file = match file {
                Some(file) => file,
                None => latest_json_file(&output_dir)
                    .await?
                    .ok_or_else(|| format!("no JSON output files in {}", output_dir.display()))?,
            };
            let stats = classify::classify_file(&file, &names, &field).await?;
            println!(
                "Classified {}: {} matched, {} unmatched",
                file.display(),
                stats.matched,
                stats.unmatched
            );
            Ok(())
        }
        Command::Stats {
            file,
            price_field,
            brand_field,
        } => {
            let stats = stats::stats_for_file(&file, &brand_field, price_field.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
    }
}

/// The batch run: config, URL list, scrape every page, write one file.
async fn run(
    config_path: &Path,
    urls_path: &Path,
    output_dir: &Path,
    domain: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();
    info!("card_scrape run starting up");

    let site = config::load_site_config(config_path).await?;

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(output_dir).await {
        error!(
            path = %output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let mut url_list = urls::load_url_list(urls_path).await?;
    if let Some(domain) = domain {
        url_list = urls::filter_by_domain(url_list, domain);
        info!(domain, remaining = url_list.len(), "Filtered URL list by domain");
    }
    for (host, count) in urls::domain_stats(&url_list) {
        info!(%host, count, "URLs per domain");
    }
    if url_list.is_empty() {
        warn!("URL list is empty; writing an empty output file");
    }

    let fetcher = default_fetcher()?;
    let summary = runner::run_batch(&fetcher, &site, &url_list, output_dir, &Local::now()).await?;

    for page in summary.pages.iter().filter(|page| !page.is_ok()) {
        warn!(url = %page.url, status = ?page.status, "Page failed");
    }

    let elapsed = start_time.elapsed();
    info!(
        elapsed_secs = elapsed.as_secs_f64(),
        records = summary.total_records(),
        path = %summary.output_path.display(),
        "card_scrape run complete"
    );
    Ok(())
}
