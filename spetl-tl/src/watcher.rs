//! Raw zone arrival watcher
//!
//! Polls the pending directory and invokes a transformation run whenever a
//! raw `.json` object is present. The arriving object only wakes the watcher;
//! the run itself consumes everything pending. A failed run is logged as a
//! failed invocation and polling continues, so the same files are retried on
//! the next tick.

use crate::pipeline::{run_transformation, TransformContext};
use chrono::Utc;
use spetl_common::{paths, ObjectStore};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Counters kept across the lifetime of a watcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    pub polls: u64,
    pub runs: u64,
    pub failures: u64,
}

/// Whether a snapshot the scanner would pick up is waiting
///
/// Other files in the pending directory do not wake the watcher; they are
/// archived with the next real snapshot.
pub async fn has_pending(store: &dyn ObjectStore) -> spetl_common::Result<bool> {
    let prefix = paths::raw_file_prefix();
    Ok(store
        .list(paths::RAW_TO_PROCESS_DIR, true)
        .await?
        .iter()
        .any(|e| !e.is_directory && e.name.starts_with(&prefix) && paths::is_raw_file(&e.name)))
}

/// Poll until `shutdown` resolves
pub async fn watch<F>(ctx: &TransformContext, poll_interval: Duration, shutdown: F) -> WatchStats
where
    F: Future<Output = ()>,
{
    let mut stats = WatchStats::default();
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!(
        "Watching {} every {:?}",
        paths::RAW_TO_PROCESS_DIR,
        poll_interval
    );

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Watcher stopping");
                return stats;
            }
            _ = ticker.tick() => {}
        }

        stats.polls += 1;
        match has_pending(ctx.stores.raw.as_ref()).await {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                warn!("Raw zone poll failed: {}", e);
                continue;
            }
        }

        stats.runs += 1;
        match run_transformation(ctx, Utc::now()).await {
            Ok(summary) => info!(
                songs = summary.songs,
                archived = summary.archive.moved.len(),
                "Invocation succeeded"
            ),
            Err(e) => {
                stats.failures += 1;
                error!("Invocation failed: {}", e);
            }
        }
    }
}
