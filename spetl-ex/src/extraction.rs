//! Extraction run
//!
//! Fetch one playlist page and stage it in the raw zone. The run reports its
//! outcome as a `Result` so the caller decides whether a failure is logged
//! and skipped (the hourly scheduler) or fatal (`--once`).

use crate::spotify::{PlaylistSource, SpotifyError};
use chrono::{DateTime, Utc};
use serde_json::Value;
use spetl_common::{paths, ObjectStore};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Why an extraction run produced no raw file
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Playlist fetch failed: {0}")]
    Fetch(#[from] SpotifyError),

    #[error("Snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Upload of {path} failed: {source}")]
    Upload {
        path: String,
        #[source]
        source: spetl_common::Error,
    },
}

/// A staged snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Raw zone path written
    pub path: String,
    /// Playlist entries in the staged page
    pub items: usize,
    /// Size of the staged document
    pub bytes: usize,
}

/// Fetch one page of `playlist_id` and upload it to the raw zone
///
/// Nothing is uploaded when the fetch fails.
pub async fn extract_playlist(
    source: &dyn PlaylistSource,
    store: &dyn ObjectStore,
    playlist_id: &str,
    limit: u32,
    now: DateTime<Utc>,
) -> Result<ExtractionReport, ExtractionError> {
    let page = source.playlist_tracks(playlist_id, limit).await?;
    let body = serde_json::to_vec(&page)?;
    let path = paths::raw_snapshot_path(now);

    store
        .upload(&path, &body)
        .await
        .map_err(|source| ExtractionError::Upload {
            path: path.clone(),
            source,
        })?;

    let items = page
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);

    info!("Successfully uploaded data to {}", path);
    Ok(ExtractionReport {
        path,
        items,
        bytes: body.len(),
    })
}

/// Everything an extraction run needs
#[derive(Clone)]
pub struct ExtractionContext {
    pub source: Arc<dyn PlaylistSource>,
    pub store: Arc<dyn ObjectStore>,
    pub playlist_id: String,
    pub page_limit: u32,
}

impl ExtractionContext {
    /// Run one extraction stamped with `now`, logging a failure before
    /// returning it
    pub async fn run(&self, now: DateTime<Utc>) -> Result<ExtractionReport, ExtractionError> {
        let result = extract_playlist(
            self.source.as_ref(),
            self.store.as_ref(),
            &self.playlist_id,
            self.page_limit,
            now,
        )
        .await;

        if let Err(e) = &result {
            error!("An error occurred during data extraction: {}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;
    use spetl_common::storage::LocalStore;

    struct FixedPage(Value);

    #[async_trait]
    impl PlaylistSource for FixedPage {
        async fn playlist_tracks(
            &self,
            _playlist_id: &str,
            _limit: u32,
        ) -> Result<Value, SpotifyError> {
            Ok(self.0.clone())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl PlaylistSource for Unreachable {
        async fn playlist_tracks(
            &self,
            _playlist_id: &str,
            _limit: u32,
        ) -> Result<Value, SpotifyError> {
            Err(SpotifyError::NetworkError("connection refused".to_string()))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 1, 13, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_page_is_staged_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();
        let page = json!({
            "items": [{"added_at": "x"}, {"added_at": "y"}],
            "total": 2,
            "next": null
        });

        let report = extract_playlist(&FixedPage(page.clone()), &store, "pl", 100, now())
            .await
            .unwrap();

        assert_eq!(report.path, "raw_data/to_processed/spotify_data_2023-06-01_13:00:00.json");
        assert_eq!(report.items, 2);

        let staged: Value =
            serde_json::from_slice(&store.read(&report.path).await.unwrap()).unwrap();
        assert_eq!(staged, page);
        assert_eq!(report.bytes, serde_json::to_vec(&page).unwrap().len());
    }

    #[tokio::test]
    async fn test_fetch_failure_uploads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();

        let err = extract_playlist(&Unreachable, &store, "pl", 100, now())
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::Fetch(SpotifyError::NetworkError(_))));
        assert!(store.list(paths::RAW_TO_PROCESS_DIR, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_context_run_returns_failure_to_caller() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExtractionContext {
            source: Arc::new(Unreachable),
            store: Arc::new(LocalStore::new(dir.path()).unwrap()),
            playlist_id: "pl".to_string(),
            page_limit: 100,
        };

        assert!(ctx.run(now()).await.is_err());
    }
}
