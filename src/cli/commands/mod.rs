//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod pipeline;
mod session;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use vidacquire::config::{load_settings, LoadOptions};
use vidacquire::storage::CollisionPolicy;

#[derive(Parser)]
#[command(name = "vida")]
#[command(about = "Crawl a listing site and download its media")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output directory (overrides OUTPUT_PATH and the config file)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

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
    /// Crawl the listing, log in if needed, then resolve and download every item
    Run {
        /// First listing page
        start_url: String,
        /// Limit number of pages to crawl (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        max_pages: usize,
        /// Number of concurrent downloads (default: from config, else 5)
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
        /// What to do when two records map to the same file (default: from config)
        #[arg(long, value_enum)]
        collision: Option<CollisionPolicy>,
    },

    /// Crawl the listing and write log.csv (does not download)
    Crawl {
        /// First listing page
        start_url: String,
        /// Limit number of pages to crawl (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        max_pages: usize,
    },

    /// Log in and persist the session (no-op if one is already saved)
    Login {
        /// Login page (default: login.url from the config)
        url: Option<String>,
    },

    /// Show the persisted session
    Session,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        output_path: cli.output,
    };
    let settings = load_settings(options).await?;
    tracing::debug!("Settings: {:?}", settings);

    match cli.command {
        Commands::Run {
            start_url,
            max_pages,
            concurrency,
            collision,
        } => pipeline::cmd_run(&settings, &start_url, max_pages, concurrency, collision).await,
        Commands::Crawl {
            start_url,
            max_pages,
        } => pipeline::cmd_crawl(&settings, &start_url, max_pages).await,
        Commands::Login { url } => session::cmd_login(&settings, url).await,
        Commands::Session => session::cmd_session(&settings).await,
    }
}
