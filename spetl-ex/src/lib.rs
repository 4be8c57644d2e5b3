//! spetl-ex library interface
//!
//! Fetches playlist pages from the Spotify Web API and stages them as raw
//! JSON in the data lake's `raw_data/to_processed` directory.

pub mod extraction;
pub mod scheduler;
pub mod spotify;

pub use crate::extraction::{extract_playlist, ExtractionContext, ExtractionError, ExtractionReport};
pub use crate::spotify::{PlaylistSource, SpotifyClient, SpotifyError};
