//! MyCare CLI - Command-line interface for MyCare share links
//!
//! Provides commands for:
//! - Opening a share link (email → OTP → files) and downloading its files
//! - Inspecting a share link without verifying access
//! - Viewing and validating configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use mycare_core::config::Config;

mod commands;
mod output;

use commands::{completions::CompletionsCommand, config::ConfigCommand, share::ShareCommand};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "mycare", version, about = "Access exams shared through MyCare links")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the server base URL from the configuration
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open and inspect share links
    #[command(subcommand)]
    Share(ShareCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let loaded = Config::load_or_default(&config_path);
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }

    // Setup tracing
    let filter = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = &loaded {
        warn!(error = %format!("{e:#}"), "Ignoring configuration file, using defaults");
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Share(cmd) => cmd.execute(format, cli.quiet, &config).await,
        Commands::Config(cmd) => cmd.execute(format, &config_path).await,
        Commands::Completions(cmd) => cmd.execute(format).await,
    }
}
