//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod helpers;
mod ingest;
mod init;
mod maintain;
mod proxy;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::ingest::IngestMode;

#[derive(Parser)]
#[command(name = "hoopsync")]
#[command(about = "NBA statistics ingestion with proxy rotation and rate limiting")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Route every request through the proxy pool (sets FORCE_PROXY)
    #[arg(long, global = true)]
    proxy: bool,

    /// Connect directly, never through a proxy (sets FORCE_LOCAL)
    #[arg(long, global = true)]
    local: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and its tables
    Init,

    /// Fetch stats from the API and store them
    Ingest {
        /// daily: current season and active players; full: history and every player
        #[arg(value_enum, default_value = "daily")]
        mode: IngestMode,
        /// Use an in-memory store and discard the results
        #[arg(long)]
        dry_run: bool,
        /// Run database maintenance after ingesting
        #[arg(long)]
        maintain: bool,
        /// Number of concurrent workers (default from config)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Limit number of players (0 = unlimited)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Deduplicate, prune old seasons, rebuild indexes
    Maintain {
        /// Seasons to keep, ending at the current one (default from config)
        #[arg(short, long)]
        keep_seasons: Option<usize>,
    },

    /// Inspect and test the proxy pool
    Proxy {
        #[command(subcommand)]
        command: ProxyCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ProxyCommands {
    /// List pool endpoints and the routing decision
    List,
    /// Send a test request through the resolved route
    Check {
        /// URL to request instead of the stats scoreboard
        #[arg(long)]
        url: Option<String>,
        /// Probe every endpoint in the pool, not just one
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration with secrets masked
    Show,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)
            .await
            .map_err(|e| anyhow::anyhow!(e))?
            .with_env_overrides(),
        None => Config::load().await,
    };
    config.proxy = config.proxy.with_cli_overrides(cli.proxy, cli.local);

    match cli.command {
        Commands::Init => init::cmd_init(&config).await,
        Commands::Ingest {
            mode,
            dry_run,
            maintain,
            workers,
            limit,
            json,
        } => {
            ingest::cmd_ingest(
                &config,
                mode,
                ingest::IngestArgs {
                    dry_run,
                    maintain,
                    workers,
                    limit,
                    json,
                },
            )
            .await
        }
        Commands::Maintain { keep_seasons } => maintain::cmd_maintain(&config, keep_seasons).await,
        Commands::Proxy { command } => match command {
            ProxyCommands::List => proxy::cmd_proxy_list(&config),
            ProxyCommands::Check { url, all } => {
                proxy::cmd_proxy_check(&config, url.as_deref(), all).await
            }
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => config_cmd::cmd_config_show(&config),
        },
    }
}
