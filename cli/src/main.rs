// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # HDFS Gateway CLI
//!
//! The `hdfsgw` binary manages gateway configuration and drives the session
//! adapter directly, acting as a given identity.
//!
//! ## Commands
//!
//! - `hdfsgw config show|validate|generate` - Configuration management
//! - `hdfsgw fs stat|ls|mkdir|rm|mv|get|put` - Filesystem operations
//! - `hdfsgw health` - Check the configured remote store answers
//!
//! Filesystem commands go through the same permission evaluation a
//! protocol session would, so they answer "what would this user see".

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use hdfs_gateway::commands::{self, ConfigCommand, FsCommand, IdentityArgs};

/// HDFS Gateway - session-scoped access to an HDFS namespace
#[derive(Parser)]
#[command(name = "hdfsgw")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "HDFSGW_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "HDFSGW_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Filesystem operations as a given identity
    #[command(name = "fs")]
    Fs {
        #[command(flatten)]
        identity: IdentityArgs,

        #[command(subcommand)]
        command: FsCommand,
    },

    /// Check the configured remote store answers
    #[command(name = "health")]
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Fs { identity, command }) => {
            commands::fs::handle_command(command, identity, cli.config).await
        }
        Some(Commands::Health) => commands::fs::health(cli.config).await,
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
