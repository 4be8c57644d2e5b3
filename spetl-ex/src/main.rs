//! spetl-ex - Extraction service
//!
//! Pulls the configured playlist from the Spotify Web API at the top of every
//! hour and stages the page as raw JSON under `raw_data/to_processed`.
//!
//! `--once` performs a single extraction and exits non-zero if it fails.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use spetl_common::config::{load_toml_config, resolve_config_path, PipelineConfig};
use spetl_common::storage::Stores;
use spetl_ex::scheduler;
use spetl_ex::{ExtractionContext, SpotifyClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line arguments for spetl-ex
#[derive(Parser, Debug)]
#[command(name = "spetl-ex")]
#[command(about = "Hourly Spotify playlist extraction into the raw zone")]
#[command(version)]
struct Args {
    /// TOML bootstrap file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run one extraction and exit
    #[arg(long)]
    once: bool,

    /// Playlist to extract (overrides config)
    #[arg(long, env = "SPETL_PLAYLIST_ID")]
    playlist_id: Option<String>,

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
        "Starting spetl-ex v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = PipelineConfig::from_env(settings).context("Failed to load configuration")?;
    let stores = Stores::open(&config.storage, args.local_root.as_deref())
        .context("Failed to open storage")?;
    let spotify =
        SpotifyClient::new(config.spotify.clone()).context("Failed to create Spotify client")?;

    let ctx = ExtractionContext {
        source: Arc::new(spotify),
        store: stores.lake,
        playlist_id: args
            .playlist_id
            .unwrap_or_else(|| config.settings.playlist_id.clone()),
        page_limit: config.settings.effective_page_limit(),
    };
    info!("Playlist: {} (page limit {})", ctx.playlist_id, ctx.page_limit);

    if args.once {
        let report = ctx.run(Utc::now()).await.context("Extraction failed")?;
        info!("Staged {} entries ({} bytes) at {}", report.items, report.bytes, report.path);
        return Ok(());
    }

    let stats = scheduler::run_hourly(&ctx, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;

    info!("Shut down after {} run(s), {} failure(s)", stats.runs, stats.failures);
    Ok(())
}
