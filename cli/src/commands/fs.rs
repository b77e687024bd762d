// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Filesystem commands
//!
//! Commands: stat, ls, mkdir, rm, mv, get, put
//!
//! Every command opens a session for the identity given on the command
//! line and goes through its permission checks. `health` only needs the
//! store and runs without a session.

use anyhow::{bail, Context, Result};
use chrono::DateTime;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use hdfs_gateway_core::application::SessionFactory;
use hdfs_gateway_core::domain::gateway_config::GatewayConfigManifest;
use hdfs_gateway_core::domain::identity::Identity;
use hdfs_gateway_core::domain::path_entity::PathEntity;
use hdfs_gateway_core::domain::session_view::SessionView;

/// Identity the session acts as
#[derive(Args, Debug, Clone)]
pub struct IdentityArgs {
    /// User name
    #[arg(short, long, env = "HDFSGW_USER")]
    pub user: String,

    /// Group membership; the first one is the main group
    #[arg(short, long = "group", value_name = "GROUP")]
    pub groups: Vec<String>,

    /// Home directory of the identity
    #[arg(long, default_value = "/")]
    pub home: String,

    /// Working directory to change into before running the command
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<String>,
}

impl IdentityArgs {
    pub fn to_identity(&self) -> Identity {
        Identity::new(self.user.clone())
            .with_home_directory(self.home.clone())
            .with_groups(self.groups.iter().cloned())
    }
}

#[derive(Subcommand, Debug)]
pub enum FsCommand {
    /// Show metadata of a path
    Stat {
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// List a directory
    Ls {
        /// Directory (default: working directory)
        #[arg(value_name = "PATH")]
        path: Option<String>,

        /// Long listing format
        #[arg(short, long)]
        long: bool,
    },

    /// Create a directory and missing parents
    Mkdir {
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Delete a file or directory (recursively)
    Rm {
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Move/rename a path
    Mv {
        #[arg(value_name = "FROM")]
        from: String,

        #[arg(value_name = "TO")]
        to: String,
    },

    /// Download a file
    Get {
        #[arg(value_name = "REMOTE")]
        remote: String,

        /// Local destination (default: stdout)
        #[arg(value_name = "LOCAL")]
        local: Option<PathBuf>,

        /// Byte offset to start reading from
        #[arg(long, default_value = "0")]
        offset: u64,
    },

    /// Upload a file, replacing any existing content
    Put {
        #[arg(value_name = "LOCAL")]
        local: PathBuf,

        #[arg(value_name = "REMOTE")]
        remote: String,
    },
}

/// Load, validate and wire the configuration into a session factory
fn load_factory(config_override: Option<PathBuf>) -> Result<SessionFactory> {
    let config = GatewayConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    info!(
        gateway = %config.metadata.name,
        backend = ?config.spec.store.backend,
        uri = config.spec.store.uri.as_deref().unwrap_or("(none)"),
        "Configuration loaded"
    );
    Ok(SessionFactory::from_config(&config))
}

pub async fn handle_command(
    command: FsCommand,
    identity: IdentityArgs,
    config_override: Option<PathBuf>,
) -> Result<()> {
    let factory = load_factory(config_override)?;

    let mut session = factory
        .create_session(Some(Arc::new(identity.to_identity())))
        .context("Failed to open session")?;

    if let Some(dir) = &identity.cwd {
        if !session.change_working_directory(dir).await {
            bail!("Cannot change directory to {}", dir);
        }
    }

    info!(
        user = session.identity().name(),
        cwd = %session.working_directory().absolute_path(),
        "Session opened"
    );
    debug!("Running {:?}", command);
    let result = execute(command, &session).await;
    session.dispose();
    result
}

/// Connect to the configured remote store and check it answers
pub async fn health(config_override: Option<PathBuf>) -> Result<()> {
    let factory = load_factory(config_override)?;
    check_store(&factory).await
}

async fn check_store(factory: &SessionFactory) -> Result<()> {
    factory
        .check_store()
        .await
        .context("Remote store health check failed")?;
    println!("{}", "✓ Remote store is reachable".green());
    Ok(())
}

/// Run one filesystem command inside an open session
pub async fn execute(command: FsCommand, session: &SessionView) -> Result<()> {
    match command {
        FsCommand::Stat { path } => stat(session.resolve(&path)).await,
        FsCommand::Ls { path, long } => {
            let dir = match path {
                Some(p) => session.resolve(&p),
                None => session.working_directory(),
            };
            list(dir, long).await
        }
        FsCommand::Mkdir { path } => mkdir(session.resolve(&path)).await,
        FsCommand::Rm { path } => remove(session.resolve(&path)).await,
        FsCommand::Mv { from, to } => rename(session.resolve(&from), session.resolve(&to)).await,
        FsCommand::Get {
            remote,
            local,
            offset,
        } => download(session.resolve(&remote), local, offset).await,
        FsCommand::Put { local, remote } => upload(local, session.resolve(&remote)).await,
    }
}

async fn stat(entity: PathEntity) -> Result<()> {
    let status = entity
        .status()
        .await
        .with_context(|| format!("Cannot stat {}", entity.absolute_path()))?;

    println!("{}", entity.absolute_path().bold());
    println!(
        "  Type: {}",
        if status.is_directory() { "directory" } else { "file" }
    );
    println!("  Size: {}", status.length);
    println!("  Owner: {}", status.owner);
    println!("  Group: {}", status.group);
    println!("  Permission: {}", status.permission);
    println!("  Links: {}", entity.link_count().await);
    println!("  Modified: {}", format_time(status.modification_time));
    println!("  Readable: {}", format_flag(entity.is_readable().await));
    println!("  Writable: {}", format_flag(entity.is_writable().await));

    Ok(())
}

async fn list(dir: PathEntity, long: bool) -> Result<()> {
    let Some(children) = dir.list_children().await else {
        bail!("Cannot list {}", dir.absolute_path());
    };

    if children.is_empty() {
        println!("{}", "(empty)".dimmed());
        return Ok(());
    }

    for child in children {
        if long {
            println!("{}", long_listing_line(&child).await);
        } else {
            println!("{}", child.short_name());
        }
    }

    Ok(())
}

async fn long_listing_line(entity: &PathEntity) -> String {
    match entity.status().await {
        Ok(status) => {
            let kind = if status.is_directory() { 'd' } else { '-' };
            let name = if status.is_directory() {
                entity.short_name().blue().bold().to_string()
            } else {
                entity.short_name().to_string()
            };
            format!(
                "{}{} {:>3} {:<10} {:<10} {:>12} {} {}",
                kind,
                status.permission,
                entity.link_count().await,
                status.owner,
                status.group,
                status.length,
                format_time(status.modification_time),
                name
            )
        }
        Err(e) => format!("{} {}", entity.short_name(), format!("({e})").red()),
    }
}

async fn mkdir(entity: PathEntity) -> Result<()> {
    if !entity.make_directory().await {
        bail!("Cannot create directory {}", entity.absolute_path());
    }
    println!(
        "{}",
        format!("✓ Created {}", entity.absolute_path()).green()
    );
    Ok(())
}

async fn remove(entity: PathEntity) -> Result<()> {
    if !entity.exists().await {
        bail!("No such file or directory: {}", entity.absolute_path());
    }
    if !entity.is_removable().await {
        bail!("No write permission: {}", entity.absolute_path());
    }
    if !entity.delete().await {
        bail!("Cannot delete {}", entity.absolute_path());
    }
    println!(
        "{}",
        format!("✓ Deleted {}", entity.absolute_path()).green()
    );
    Ok(())
}

async fn rename(from: PathEntity, to: PathEntity) -> Result<()> {
    if !from.exists().await {
        bail!("No such file or directory: {}", from.absolute_path());
    }
    if !from.is_removable().await || !to.is_writable().await {
        bail!(
            "No write permission to move {} to {}",
            from.absolute_path(),
            to.absolute_path()
        );
    }
    if !from.move_to(&to).await {
        bail!(
            "Cannot move {} to {}",
            from.absolute_path(),
            to.absolute_path()
        );
    }
    println!(
        "{}",
        format!("✓ Moved {} → {}", from.absolute_path(), to.absolute_path()).green()
    );
    Ok(())
}

async fn download(entity: PathEntity, local: Option<PathBuf>, offset: u64) -> Result<()> {
    let mut reader = entity
        .open_for_read_at(offset)
        .await
        .with_context(|| format!("Cannot read {}", entity.absolute_path()))?;

    match local {
        Some(path) => {
            let mut file = tokio::fs::File::create(&path)
                .await
                .with_context(|| format!("Failed to create {:?}", path))?;
            let copied = tokio::io::copy(&mut reader, &mut file).await?;
            file.flush().await?;
            eprintln!(
                "{}",
                format!("✓ {} bytes written to {}", copied, path.display()).green()
            );
        }
        None => {
            let mut stdout = tokio::io::stdout();
            tokio::io::copy(&mut reader, &mut stdout).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}

async fn upload(local: PathBuf, entity: PathEntity) -> Result<()> {
    let mut file = tokio::fs::File::open(&local)
        .await
        .with_context(|| format!("Failed to open {:?}", local))?;

    let mut stream = entity
        .open_for_write()
        .await
        .with_context(|| format!("Cannot write {}", entity.absolute_path()))?;
    let copied = tokio::io::copy(&mut file, &mut stream).await?;
    stream
        .finish()
        .await
        .with_context(|| format!("Upload of {} failed", entity.absolute_path()))?;

    println!(
        "{}",
        format!("✓ {} bytes uploaded to {}", copied, entity.absolute_path()).green()
    );
    Ok(())
}

fn format_time(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn format_flag(value: bool) -> colored::ColoredString {
    if value {
        "yes".green()
    } else {
        "no".red()
    }
}
