//! Transformation run
//!
//! scan raw zone → extract + aggregate → write songs, albums, artists →
//! archive raw files. There is no top-level guard: any failure ends the run
//! and is returned to the caller.

use crate::archive::{self, ArchiveReport};
use crate::error::TransformResult;
use crate::{aggregate, scanner, writer};
use chrono::{DateTime, Utc};
use spetl_common::paths::{self, TransformedDataset};
use spetl_common::storage::Stores;
use tracing::{info, warn};

/// Everything a transformation run needs
#[derive(Clone)]
pub struct TransformContext {
    pub stores: Stores,
}

impl TransformContext {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }
}

/// What one run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformSummary {
    /// Raw snapshots consumed
    pub snapshots: usize,
    pub albums: usize,
    pub artists: usize,
    pub songs: usize,
    /// Written dataset paths (songs, albums, artists)
    pub outputs: Vec<String>,
    pub archive: ArchiveReport,
}

/// Run one transformation over all currently pending raw files
///
/// `now` stamps the output file names.
pub async fn run_transformation(
    ctx: &TransformContext,
    now: DateTime<Utc>,
) -> TransformResult<TransformSummary> {
    let snapshots = scanner::scan_raw_zone(ctx.stores.raw.as_ref()).await?;
    if snapshots.is_empty() {
        warn!("No pending raw snapshots under {}", paths::RAW_TO_PROCESS_DIR);
        return Ok(TransformSummary::default());
    }

    let datasets = aggregate::transform(&snapshots)?;
    let lake = ctx.stores.lake.as_ref();

    let songs_path = TransformedDataset::Songs.output_path(now);
    let albums_path = TransformedDataset::Albums.output_path(now);
    let artists_path = TransformedDataset::Artists.output_path(now);

    let songs = writer::write_dataset(lake, &songs_path, &datasets.songs).await?;
    let albums = writer::write_dataset(lake, &albums_path, &datasets.albums).await?;
    let artists = writer::write_dataset(lake, &artists_path, &datasets.artists).await?;

    let archive =
        archive::copy_files_and_cleanup(lake, paths::RAW_TO_PROCESS_DIR, paths::RAW_PROCESSED_DIR)
            .await?;

    info!(
        snapshots = snapshots.len(),
        songs,
        albums,
        artists,
        archived = archive.moved.len(),
        "Transformation complete"
    );

    Ok(TransformSummary {
        snapshots: snapshots.len(),
        albums,
        artists,
        songs,
        outputs: vec![songs_path, albums_path, artists_path],
        archive,
    })
}
