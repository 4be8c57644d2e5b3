//! Storage layout of the raw and transformed zones
//!
//! ```text
//! raw_data/to_processed/spotify_data_<YYYY-MM-DD_HH:MM:SS>.json   awaiting transformation
//! raw_data/processed/...                                          archived raw input
//! transformed_data/songs_data/song_transformed_<YYYY-MM-DD_HH-MM-SS>.csv
//! transformed_data/album_data/album_transformed_<...>.csv
//! transformed_data/artist_data/artist_transformed_<...>.csv
//! ```

use chrono::{DateTime, Utc};

/// Raw files waiting for the next transformation run
pub const RAW_TO_PROCESS_DIR: &str = "raw_data/to_processed";

/// Raw files already consumed by a transformation run
pub const RAW_PROCESSED_DIR: &str = "raw_data/processed";

/// File name stem of every extracted snapshot
pub const RAW_FILE_STEM: &str = "spotify_data";

/// Extension of raw snapshot files
pub const RAW_FILE_EXTENSION: &str = ".json";

const RAW_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";
const TRANSFORMED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Name prefix shared by all pending raw snapshots
pub fn raw_file_prefix() -> String {
    format!("{}/{}", RAW_TO_PROCESS_DIR, RAW_FILE_STEM)
}

/// Destination of the snapshot extracted at `now`
pub fn raw_snapshot_path(now: DateTime<Utc>) -> String {
    format!(
        "{}_{}{}",
        raw_file_prefix(),
        now.format(RAW_TIMESTAMP_FORMAT),
        RAW_FILE_EXTENSION
    )
}

/// Whether an object name looks like a raw snapshot
pub fn is_raw_file(name: &str) -> bool {
    name.ends_with(RAW_FILE_EXTENSION)
}

/// The three datasets written by a transformation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformedDataset {
    Songs,
    Albums,
    Artists,
}

impl TransformedDataset {
    /// Directory under `transformed_data/`
    pub fn directory(self) -> &'static str {
        match self {
            TransformedDataset::Songs => "songs_data",
            TransformedDataset::Albums => "album_data",
            TransformedDataset::Artists => "artist_data",
        }
    }

    /// Entity name used in the file name
    pub fn entity(self) -> &'static str {
        match self {
            TransformedDataset::Songs => "song",
            TransformedDataset::Albums => "album",
            TransformedDataset::Artists => "artist",
        }
    }

    /// Destination of this dataset for a run started at `now`
    pub fn output_path(self, now: DateTime<Utc>) -> String {
        format!(
            "transformed_data/{}/{}_transformed_{}.csv",
            self.directory(),
            self.entity(),
            now.format(TRANSFORMED_TIMESTAMP_FORMAT)
        )
    }
}
