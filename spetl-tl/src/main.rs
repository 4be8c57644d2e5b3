//! spetl-tl - Transform-load service
//!
//! Waits for raw playlist snapshots to land in `raw_data/to_processed`, turns
//! every pending snapshot into album, artist and song CSV files under
//! `transformed_data/`, and archives the raw input to `raw_data/processed`.
//!
//! `--once` performs a single run and exits non-zero if it fails.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use spetl_common::config::{load_toml_config, resolve_config_path, PipelineConfig};
use spetl_common::storage::Stores;
use spetl_tl::watcher;
use spetl_tl::{run_transformation, TransformContext};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Command-line arguments for spetl-tl
#[derive(Parser, Debug)]
#[command(name = "spetl-tl")]
#[command(about = "Transform-load service for staged Spotify playlist snapshots")]
#[command(version)]
struct Args {
    /// TOML bootstrap file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run one transformation and exit
    #[arg(long)]
    once: bool,

    /// Seconds between raw zone polls (overrides config)
    #[arg(long, env = "SPETL_POLL_INTERVAL")]
    poll_interval: Option<u64>,

    /// Use a local directory instead of the data lake
    #[arg(long, env = "SPETL_LOCAL_ROOT")]
    local_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let settings = load_toml_config(config_path.as_deref())?;
    spetl_common::logging::init(&settings.logging);

    info!(
        "Starting spetl-tl v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = PipelineConfig::from_env(settings).context("Failed to load configuration")?;
    let stores = Stores::open(&config.storage, args.local_root.as_deref())
        .context("Failed to open storage")?;
    match &args.local_root {
        Some(root) => info!("Storage: local directory {}", root.display()),
        None => info!(
            "Storage: account {} container {}",
            config.storage.account_name, config.storage.container
        ),
    }

    let ctx = TransformContext::new(stores);

    if args.once {
        let summary = run_transformation(&ctx, Utc::now())
            .await
            .context("Transformation failed")?;
        info!(
            "Processed {} snapshot(s): {} songs, {} albums, {} artists",
            summary.snapshots, summary.songs, summary.albums, summary.artists
        );
        return Ok(());
    }

    let interval = Duration::from_secs(
        args.poll_interval
            .unwrap_or(config.settings.poll_interval_secs)
            .max(1),
    );
    let stats = watcher::watch(&ctx, interval, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;

    info!(
        "Shut down after {} poll(s), {} run(s), {} failure(s)",
        stats.polls, stats.runs, stats.failures
    );
    Ok(())
}
