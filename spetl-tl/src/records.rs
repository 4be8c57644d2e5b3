//! Flat records of the three transformed datasets
//!
//! Field order of each struct is the column order of its CSV file.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A record type that can be written as one row of a delimited file
pub trait Tabular: Serialize {
    /// Column names, in serialization order
    const HEADER: &'static [&'static str];
}

/// One album, unique by `album_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRecord {
    pub album_id: String,
    pub name: String,
    pub release_date: NaiveDate,
    pub total_tracks: i64,
    pub url: String,
}

impl Tabular for AlbumRecord {
    const HEADER: &'static [&'static str] =
        &["album_id", "name", "release_date", "total_tracks", "url"];
}

/// One artist, unique by `artist_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRecord {
    pub artist_id: String,
    pub artist_name: String,
    pub external_url: String,
}

impl Tabular for ArtistRecord {
    const HEADER: &'static [&'static str] = &["artist_id", "artist_name", "external_url"];
}

/// One playlist entry
///
/// `artist_id` is the first album-level artist of the track. Songs are not
/// deduplicated, so overlapping snapshots produce repeated rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecord {
    pub song_id: String,
    pub song_name: String,
    pub duration_ms: i64,
    pub url: String,
    pub popularity: i64,
    #[serde(with = "table_timestamp")]
    pub song_added: DateTime<Utc>,
    pub album_id: String,
    pub artist_id: String,
}

impl Tabular for SongRecord {
    const HEADER: &'static [&'static str] = &[
        "song_id",
        "song_name",
        "duration_ms",
        "url",
        "popularity",
        "song_added",
        "album_id",
        "artist_id",
    ];
}

/// The three datasets produced by one transformation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Datasets {
    pub albums: Vec<AlbumRecord>,
    pub artists: Vec<ArtistRecord>,
    pub songs: Vec<SongRecord>,
}

/// Timestamps in tables are written as `2023-06-01 00:00:00+00:00`
///
/// Sub-second precision is kept (`2023-06-01 00:00:00.250+00:00`). Reading
/// also accepts RFC 3339.
pub mod table_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_str(&raw, FORMAT)
            .or_else(|_| DateTime::parse_from_rfc3339(&raw))
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}
