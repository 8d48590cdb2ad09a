//! Command-line interface definitions for Card Scrape.
//!
//! This module defines the subcommands and their options using the `clap`
//! crate. Output locations can also be provided via environment variables.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the Card Scrape application.
///
/// # Examples
///
/// ```sh
/// # Scrape every URL in the list with one site config
/// card_scrape run --config configs/config_01.json --urls configs/urls.txt
///
/// # Try a config against a single page before a full run
/// card_scrape test --config configs/config_01.json --url https://shop.example/shoes
///
/// # Tag the newest output file with product ids
/// card_scrape classify --names configs/alternative_names.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape every URL in the list and write one JSON output file
    Run {
        /// Site config file (JSON or YAML)
        #[arg(short, long, default_value = "configs/config_01.json")]
        config: PathBuf,

        /// URL list, one URL per line
        #[arg(short, long, default_value = "configs/urls.txt")]
        urls: PathBuf,

        /// Output directory for JSON files
        #[arg(short, long, env = "CARD_SCRAPE_OUTPUT_DIR", default_value = "output")]
        output_dir: PathBuf,

        /// Only scrape URLs whose host contains this string
        #[arg(short, long)]
        domain: Option<String>,
    },

    /// Try a config on one URL and print a preview of the records
    Test {
        /// Site config file (JSON or YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Page to scrape
        #[arg(long)]
        url: String,

        /// Number of sample records to print
        #[arg(short, long, default_value_t = 3)]
        max_products: usize,
    },

    /// Check a config file and print every problem found
    Validate {
        /// Site config file (JSON or YAML)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Write a starter config file
    InitConfig {
        /// Where to write the template
        path: PathBuf,
    },

    /// Tag records with the id of the known product they name
    Classify {
        /// Output file to classify (defaults to the newest file in the output directory)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Output directory searched when no file is given
        #[arg(short, long, env = "CARD_SCRAPE_OUTPUT_DIR", default_value = "output")]
        output_dir: PathBuf,

        /// Known products and their alternative names
        #[arg(short, long, default_value = "configs/alternative_names.json")]
        names: PathBuf,

        /// Record field holding the product name
        #[arg(long, default_value = "Name")]
        field: String,
    },

    /// Print field completion, brand and price statistics for an output file
    Stats {
        /// Output file to summarize
        file: PathBuf,

        /// Field holding the price, if any
        #[arg(long)]
        price_field: Option<String>,

        /// Field holding the brand name
        #[arg(long, default_value = "Marca")]
        brand_field: String,
    },
}
