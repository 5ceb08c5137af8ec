//! nocake - zero-downtime product index rebuilds
//!
//! Imports the affilinet product lists into a fresh search index and swaps
//! the public alias onto it once every list has been processed.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "nocake")]
#[command(about = "Imports product lists into the nocake search index")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./nocake.toml or ~/.config/nocake/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Connect timeout in seconds
    #[arg(long, global = true)]
    connect_timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the product index from all product lists
    Import(cmd::import::ImportArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(nocake_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, spinners show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    nocake_core::init_logging(quiet, cli.debug, multi);

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    // Apply HTTP settings (config file defaults, CLI overrides)
    nocake_core::set_http_config(nocake_core::HttpConfig {
        connect_timeout: std::time::Duration::from_secs(
            cli.connect_timeout.unwrap_or(config.http.connect_timeout),
        ),
    });

    match cli.command {
        Command::Import(args) => cmd::import::run(args, &config, &progress),
        Command::Config => cmd::config::run(&config),
    }
}
