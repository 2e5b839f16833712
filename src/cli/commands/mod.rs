//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod scrape;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{LoadOptions, Settings};
use crate::scrapers::ScrapeOptions;

#[derive(Parser)]
#[command(name = "wikiscrape")]
#[command(about = "Extract headings and paragraphs from Wikipedia articles")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind address: PORT, HOST or HOST:PORT (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Scrape a single article and print the result as JSON
    Scrape {
        /// Article URL
        url: String,
        /// Skip headings
        #[arg(long)]
        no_headings: bool,
        /// Skip paragraphs
        #[arg(long)]
        no_paragraphs: bool,
        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Show the effective configuration
    Config,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
    };
    let (settings, source) = Settings::load(&options)?;

    match cli.command {
        Commands::Serve { bind } => serve::cmd_serve(&settings, bind.as_deref()).await,
        Commands::Scrape {
            url,
            no_headings,
            no_paragraphs,
            pretty,
        } => {
            let options = ScrapeOptions {
                headings: !no_headings,
                paragraphs: !no_paragraphs,
            };
            scrape::cmd_scrape(&settings, &url, options, pretty).await
        }
        Commands::Config => config_cmd::cmd_config_show(&settings, source.as_deref()),
    }
}
