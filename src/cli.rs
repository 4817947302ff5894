//! Command-line interface.
//!
//! `skiff get <remote> <dest>` and `skiff put <src> <remote>` against a
//! directory-backed remote drive.

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::engine::{BatchReport, SyncEngine, SyncOptions};
use crate::error::{Result, SyncError};
use crate::logging::init_logging;
use crate::remote::localfs::LocalFsDrive;
use crate::store::Persistence;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Skiff - content-addressed file sync against a remote drive
#[derive(Parser)]
#[command(name = "skiff")]
#[command(about = "Sync files between the local filesystem and a remote drive")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory backing the remote drive
    #[arg(long, global = true)]
    pub remote: Option<PathBuf>,

    /// Replace destinations whose content differs
    #[arg(long, global = true)]
    pub overwrite: bool,

    /// Recurse into folders
    #[arg(short, long, global = true)]
    pub recursive: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download a remote file or folder
    Get {
        /// Remote path, relative to the drive root
        src: String,
        /// Local destination path
        dest: PathBuf,
    },
    /// Upload a local file or directory
    Put {
        /// Local source path
        src: PathBuf,
        /// Remote path, relative to the drive root
        dest: String,
    },
}

pub async fn run(cli: Cli) -> Result<BatchReport> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    init_logging(&config.logging)?;

    let remote_root = cli
        .remote
        .or_else(|| config.remote_root.clone())
        .ok_or_else(|| {
            SyncError::Config("no remote drive configured (pass --remote or set remote_root)".to_string())
        })?;
    let remote = Arc::new(LocalFsDrive::new(remote_root)?);
    let persistence = Persistence::open(&config.database_path()?)?;
    let engine = SyncEngine::new(remote, &persistence)?;

    let cancel = CancelToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current chunk");
            signal_cancel.cancel();
        }
    });

    let options = SyncOptions {
        overwrite: cli.overwrite,
        recursive: cli.recursive,
    };
    let on_progress = &|transferred: u64, total: u64| {
        if total > 0 {
            eprint!("\r{:>3}%", transferred * 100 / total);
            if transferred >= total {
                eprintln!();
            }
        }
    };

    let report = match &cli.command {
        Commands::Get { src, dest } => {
            engine.get(src, dest, options, &cancel, on_progress).await?
        }
        Commands::Put { src, dest } => {
            engine.put(src, dest, options, &cancel, on_progress).await?
        }
    };

    println!(
        "{} completed, {} up to date, {} conflicts, {} failed",
        report.completed, report.up_to_date, report.conflicts, report.failed
    );
    Ok(report)
}
