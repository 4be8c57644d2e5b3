//! Record extractors
//!
//! Three independent mappings from one snapshot to flat rows. Each extractor
//! deserializes its own narrow view of a playlist entry, so a missing field
//! only fails the extractors that need it.
//!
//! Date fields stay as strings here; [`crate::aggregate`] parses them.

use crate::error::{TransformError, TransformResult};
use crate::records::ArtistRecord;
use crate::snapshot::PlaylistSnapshot;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Album fields of one entry, before date parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumRow {
    pub album_id: String,
    pub name: String,
    pub release_date: String,
    pub total_tracks: i64,
    pub url: String,
}

/// Song fields of one entry, before timestamp parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRow {
    pub song_id: String,
    pub song_name: String,
    pub duration_ms: i64,
    pub url: String,
    pub popularity: i64,
    pub song_added: String,
    pub album_id: String,
    pub artist_id: String,
}

#[derive(Deserialize)]
struct ExternalUrls {
    spotify: String,
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

// --- album view ---

#[derive(Deserialize)]
struct AlbumEntry {
    track: AlbumTrack,
}

#[derive(Deserialize)]
struct AlbumTrack {
    album: AlbumFields,
}

#[derive(Deserialize)]
struct AlbumFields {
    id: String,
    name: String,
    release_date: String,
    total_tracks: i64,
    external_urls: ExternalUrls,
}

// --- artist view ---

#[derive(Deserialize)]
struct ArtistEntry {
    #[serde(default)]
    track: Option<ArtistTrack>,
}

#[derive(Deserialize)]
struct ArtistTrack {
    #[serde(default)]
    artists: Vec<ArtistFields>,
}

#[derive(Deserialize)]
struct ArtistFields {
    id: String,
    name: String,
    href: String,
}

// --- song view ---

#[derive(Deserialize)]
struct SongEntry {
    added_at: String,
    track: SongTrack,
}

#[derive(Deserialize)]
struct SongTrack {
    id: String,
    name: String,
    duration_ms: i64,
    popularity: i64,
    external_urls: ExternalUrls,
    album: SongAlbum,
}

#[derive(Deserialize)]
struct SongAlbum {
    id: String,
    artists: Vec<IdOnly>,
}

/// Deserialize every entry of a snapshot into the view `T`
fn entries<T: DeserializeOwned>(snapshot: &PlaylistSnapshot) -> TransformResult<Vec<(usize, T)>> {
    snapshot
        .items()?
        .iter()
        .enumerate()
        .map(|(index, item)| {
            T::deserialize(item)
                .map(|view| (index, view))
                .map_err(|e| malformed(snapshot, index, e.to_string()))
        })
        .collect()
}

fn malformed(snapshot: &PlaylistSnapshot, index: usize, reason: String) -> TransformError {
    TransformError::MalformedPayload {
        source_path: snapshot.source_path().to_string(),
        index,
        reason,
    }
}

/// One album row per playlist entry
pub fn albums(snapshot: &PlaylistSnapshot) -> TransformResult<Vec<AlbumRow>> {
    Ok(entries::<AlbumEntry>(snapshot)?
        .into_iter()
        .map(|(_, entry)| {
            let album = entry.track.album;
            AlbumRow {
                album_id: album.id,
                name: album.name,
                release_date: album.release_date,
                total_tracks: album.total_tracks,
                url: album.external_urls.spotify,
            }
        })
        .collect())
}

/// One artist row per artist credited on each track
///
/// Entries without a track or without an `artists` array contribute nothing.
pub fn artists(snapshot: &PlaylistSnapshot) -> TransformResult<Vec<ArtistRecord>> {
    Ok(entries::<ArtistEntry>(snapshot)?
        .into_iter()
        .filter_map(|(_, entry)| entry.track)
        .flat_map(|track| track.artists)
        .map(|artist| ArtistRecord {
            artist_id: artist.id,
            artist_name: artist.name,
            external_url: artist.href,
        })
        .collect())
}

/// One song row per playlist entry
///
/// The song's artist is the first artist of the track's album, even when the
/// track itself credits several performers.
pub fn songs(snapshot: &PlaylistSnapshot) -> TransformResult<Vec<SongRow>> {
    entries::<SongEntry>(snapshot)?
        .into_iter()
        .map(|(index, entry)| -> TransformResult<SongRow> {
            let track = entry.track;
            let artist_id = track
                .album
                .artists
                .into_iter()
                .next()
                .map(|artist| artist.id)
                .ok_or_else(|| {
                    malformed(snapshot, index, "track.album.artists is empty".to_string())
                })?;

            Ok(SongRow {
                song_id: track.id,
                song_name: track.name,
                duration_ms: track.duration_ms,
                url: track.external_urls.spotify,
                popularity: track.popularity,
                song_added: entry.added_at,
                album_id: track.album.id,
                artist_id,
            })
        })
        .collect()
}
