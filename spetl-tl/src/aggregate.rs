//! Aggregation across snapshots
//!
//! Concatenates the rows of every snapshot in encounter order, keeps the
//! first album and artist seen for each id, then parses the date fields of
//! the surviving rows. Songs are kept as-is.

use crate::error::{TransformError, TransformResult};
use crate::extract::{self, AlbumRow, SongRow};
use crate::records::{AlbumRecord, ArtistRecord, Datasets, SongRecord};
use crate::snapshot::PlaylistSnapshot;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use tracing::debug;

/// Build the three datasets from all pending snapshots
pub fn transform(snapshots: &[PlaylistSnapshot]) -> TransformResult<Datasets> {
    let mut all_albums = Vec::new();
    let mut all_artists = Vec::new();
    let mut all_songs = Vec::new();

    for snapshot in snapshots {
        let albums = extract::albums(snapshot)?;
        let artists = extract::artists(snapshot)?;
        let songs = extract::songs(snapshot)?;

        debug!(
            source = %snapshot.source_path(),
            entries = songs.len(),
            artist_credits = artists.len(),
            "Extracted snapshot"
        );

        all_albums.extend(albums);
        all_artists.extend(artists);
        all_songs.extend(songs);
    }

    let albums = dedup_by_key(all_albums, |a| a.album_id.clone())
        .into_iter()
        .map(AlbumRecord::try_from)
        .collect::<TransformResult<Vec<_>>>()?;
    let artists = dedup_by_key(all_artists, |a| a.artist_id.clone());
    let songs = all_songs
        .into_iter()
        .map(SongRecord::try_from)
        .collect::<TransformResult<Vec<_>>>()?;

    Ok(Datasets {
        albums,
        artists,
        songs,
    })
}

/// Keep the first occurrence of every key, preserving order
fn dedup_by_key<T, F>(rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> String,
{
    let mut seen = HashSet::new();
    rows.into_iter().filter(|row| seen.insert(key(row))).collect()
}

/// Parse an album release date
///
/// Accepts the three precisions the API reports: `YYYY-MM-DD`, `YYYY-MM`
/// and `YYYY`. Missing month or day default to the first.
pub fn parse_release_date(value: &str) -> TransformResult<NaiveDate> {
    let invalid = || TransformError::InvalidDate {
        field: "release_date",
        value: value.to_string(),
    };

    let parts: Vec<&str> = value.trim().split('-').collect();
    if parts.is_empty()
        || parts.len() > 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(invalid());
    }

    let year: i32 = parts[0].parse().map_err(|_| invalid())?;
    let month: u32 = match parts.get(1) {
        Some(m) => m.parse().map_err(|_| invalid())?,
        None => 1,
    };
    let day: u32 = match parts.get(2) {
        Some(d) => d.parse().map_err(|_| invalid())?,
        None => 1,
    };

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Parse the time an entry was added to the playlist (RFC 3339)
pub fn parse_added_at(value: &str) -> TransformResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TransformError::InvalidDate {
            field: "song_added",
            value: value.to_string(),
        })
}

impl TryFrom<AlbumRow> for AlbumRecord {
    type Error = TransformError;

    fn try_from(row: AlbumRow) -> Result<Self, Self::Error> {
        Ok(Self {
            release_date: parse_release_date(&row.release_date)?,
            album_id: row.album_id,
            name: row.name,
            total_tracks: row.total_tracks,
            url: row.url,
        })
    }
}

impl TryFrom<SongRow> for SongRecord {
    type Error = TransformError;

    fn try_from(row: SongRow) -> Result<Self, Self::Error> {
        Ok(Self {
            song_added: parse_added_at(&row.song_added)?,
            song_id: row.song_id,
            song_name: row.song_name,
            duration_ms: row.duration_ms,
            url: row.url,
            popularity: row.popularity,
            album_id: row.album_id,
            artist_id: row.artist_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn entry(track_id: &str, album_id: &str, album_name: &str, artists: &[&str]) -> Value {
        let artists: Vec<Value> = artists
            .iter()
            .map(|id| {
                json!({
                    "id": id,
                    "name": id,
                    "href": format!("https://api.spotify.com/v1/artists/{id}")
                })
            })
            .collect();
        json!({
            "added_at": "2023-06-01T00:00:00Z",
            "track": {
                "id": track_id,
                "name": track_id,
                "duration_ms": 1000,
                "popularity": 1,
                "external_urls": {"spotify": "https://open.spotify.com/track"},
                "artists": artists.clone(),
                "album": {
                    "id": album_id,
                    "name": album_name,
                    "release_date": "2023-01-15",
                    "total_tracks": 3,
                    "external_urls": {"spotify": "https://open.spotify.com/album"},
                    "artists": artists,
                }
            }
        })
    }

    fn snapshot(name: &str, items: Vec<Value>) -> PlaylistSnapshot {
        PlaylistSnapshot::new(name, json!({ "items": items }))
    }

    #[test]
    fn test_album_shared_by_two_snapshots_appears_once() {
        let first = snapshot("one.json", vec![entry("S1", "A1", "First name", &["R1"])]);
        let second = snapshot("two.json", vec![entry("S2", "A1", "Second name", &["R1"])]);

        let datasets = transform(&[first, second]).unwrap();

        assert_eq!(datasets.albums.len(), 1);
        assert_eq!(datasets.albums[0].album_id, "A1");
        assert_eq!(datasets.albums[0].name, "First name");
        assert_eq!(datasets.artists.len(), 1);
        assert_eq!(datasets.songs.len(), 2);
    }

    #[test]
    fn test_songs_are_not_deduplicated() {
        let first = snapshot("one.json", vec![entry("S1", "A1", "A", &["R1"])]);
        let second = snapshot("two.json", vec![entry("S1", "A1", "A", &["R1"])]);

        let datasets = transform(&[first, second]).unwrap();
        assert_eq!(datasets.songs.len(), 2);
        assert_eq!(datasets.songs[0], datasets.songs[1]);
    }

    #[test]
    fn test_dedup_preserves_encounter_order() {
        let snap = snapshot(
            "one.json",
            vec![
                entry("S1", "A2", "A", &["R2", "R1"]),
                entry("S2", "A1", "A", &["R1", "R3"]),
                entry("S3", "A2", "A", &["R3"]),
            ],
        );

        let datasets = transform(&[snap]).unwrap();
        let albums: Vec<&str> = datasets.albums.iter().map(|a| a.album_id.as_str()).collect();
        let artists: Vec<&str> = datasets.artists.iter().map(|a| a.artist_id.as_str()).collect();
        assert_eq!(albums, vec!["A2", "A1"]);
        assert_eq!(artists, vec!["R2", "R1", "R3"]);
    }

    #[test]
    fn test_dates_are_parsed() {
        let snap = snapshot("one.json", vec![entry("S1", "A1", "A", &["R1"])]);
        let datasets = transform(&[snap]).unwrap();

        assert_eq!(
            datasets.albums[0].release_date,
            NaiveDate::from_ymd_opt(2023, 1, 15).unwrap()
        );
        assert_eq!(
            datasets.songs[0].song_added,
            Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_bad_song_date_fails_whole_run() {
        let mut bad = entry("S2", "A2", "A", &["R2"]);
        bad["added_at"] = json!("yesterday");
        let snap = snapshot("one.json", vec![entry("S1", "A1", "A", &["R1"]), bad]);

        match transform(&[snap]).unwrap_err() {
            TransformError::InvalidDate { field, value } => {
                assert_eq!(field, "song_added");
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bad_release_date_fails_whole_run() {
        let mut bad = entry("S1", "A1", "A", &["R1"]);
        bad["track"]["album"]["release_date"] = json!("2023-02-30");
        let snap = snapshot("one.json", vec![bad]);

        assert!(matches!(
            transform(&[snap]),
            Err(TransformError::InvalidDate { field: "release_date", .. })
        ));
    }

    #[test]
    fn test_no_snapshots_yields_empty_datasets() {
        assert_eq!(transform(&[]).unwrap(), Datasets::default());
    }

    #[test]
    fn test_release_date_precisions() {
        assert_eq!(
            parse_release_date("2023-01-15").unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 15).unwrap()
        );
        assert_eq!(
            parse_release_date("1998-07").unwrap(),
            NaiveDate::from_ymd_opt(1998, 7, 1).unwrap()
        );
        assert_eq!(
            parse_release_date("1975").unwrap(),
            NaiveDate::from_ymd_opt(1975, 1, 1).unwrap()
        );
        assert!(parse_release_date("").is_err());
        assert!(parse_release_date("2023-13-01").is_err());
        assert!(parse_release_date("2023-01-01-01").is_err());
        assert!(parse_release_date("Jan 2023").is_err());
    }

    #[test]
    fn test_added_at_normalizes_offset() {
        assert_eq!(
            parse_added_at("2023-06-01T02:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()
        );
        assert!(parse_added_at("2023-06-01").is_err());
    }
}
