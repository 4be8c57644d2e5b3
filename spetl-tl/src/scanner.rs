//! Blob scanner
//!
//! Loads every pending raw snapshot, not just the one whose arrival woke the
//! service. Any unreadable or unparseable file aborts the scan.

use crate::error::TransformResult;
use crate::snapshot::PlaylistSnapshot;
use spetl_common::paths;
use spetl_common::ObjectStore;
use tracing::info;

/// Download and parse every `*.json` object under `directory` whose name
/// starts with `name_prefix`
pub async fn scan_pending(
    store: &dyn ObjectStore,
    directory: &str,
    name_prefix: &str,
) -> TransformResult<Vec<PlaylistSnapshot>> {
    let mut snapshots = Vec::new();

    for entry in store.list(directory, true).await? {
        if entry.is_directory
            || !entry.name.starts_with(name_prefix)
            || !paths::is_raw_file(&entry.name)
        {
            continue;
        }

        info!("Processing {}", entry.name);
        let content = store.read(&entry.name).await?;
        snapshots.push(PlaylistSnapshot::from_slice(&entry.name, &content)?);
    }

    Ok(snapshots)
}

/// Scan the raw zone with the standard layout
pub async fn scan_raw_zone(store: &dyn ObjectStore) -> TransformResult<Vec<PlaylistSnapshot>> {
    scan_pending(store, paths::RAW_TO_PROCESS_DIR, &paths::raw_file_prefix()).await
}
