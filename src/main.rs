mod commands;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gocal_core::GoCalConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gocal")]
#[command(about = "Generate Pokémon GO event calendars and their download site")]
struct Cli {
    /// Config file (defaults to ./gocal.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the event feed and write the .ics files and manifest
    Generate {
        /// Fetch the feed from this URL instead of the configured one
        #[arg(long, conflicts_with = "feed_file")]
        feed_url: Option<String>,

        /// Read the feed from a local JSON file
        #[arg(long)]
        feed_file: Option<PathBuf>,

        /// Write calendars here instead of the configured output directory
        #[arg(long)]
        dist_dir: Option<PathBuf>,

        /// Also build one set of calendars per timezone
        #[arg(long)]
        multi_timezone: bool,
    },
    /// Render the download site from the generated manifest
    Site {
        /// Write pages here instead of the configured site directory
        #[arg(long)]
        dist_dir: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = GoCalConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Commands::Generate {
            feed_url,
            feed_file,
            dist_dir,
            multi_timezone,
        } => {
            if let Some(url) = feed_url {
                config.feed.url = url;
            }
            if let Some(dir) = dist_dir {
                config.output.dist_dir = dir;
            }
            if multi_timezone {
                config.output.multi_timezone = true;
            }
            commands::generate::run(&config, feed_file).await
        }
        Commands::Site { dist_dir } => {
            if let Some(dir) = dist_dir {
                config.site.dist_dir = dir;
            }
            commands::site::run(&config)
        }
        Commands::Config => commands::config::run(&config, cli.config.as_deref()),
    }
}

/// `GOCAL_LOG` wins; otherwise warn, or debug with `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("GOCAL_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
