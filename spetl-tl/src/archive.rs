//! Archival mover
//!
//! Relocates consumed raw files from the pending directory to the processed
//! directory. Per file the sequence is create → copy → delete source, with no
//! rollback: an interruption between copy and delete leaves the file in both
//! places and a later run will not reconcile it.

use crate::error::TransformResult;
use spetl_common::ObjectStore;
use tracing::{debug, info};

/// Outcome of one archival pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    /// `(source, destination)` of every moved file, in listing order
    pub moved: Vec<(String, String)>,
    /// Whether the emptied source directory was removed
    pub source_removed: bool,
}

/// Destination name of `name`: first occurrence of `source` replaced
pub fn destination_path(name: &str, source: &str, destination: &str) -> String {
    name.replacen(source, destination, 1)
}

/// Move every file under `source` to the same relative place under
/// `destination`, then remove `source`
///
/// Failure to remove the source directory is logged and does not fail the
/// move. An empty or missing `source` is a no-op.
pub async fn copy_files_and_cleanup(
    store: &dyn ObjectStore,
    source: &str,
    destination: &str,
) -> TransformResult<ArchiveReport> {
    let mut report = ArchiveReport::default();

    for entry in store.list(source, true).await? {
        if entry.is_directory {
            continue;
        }

        let new_path = destination_path(&entry.name, source, destination);

        store.create(&new_path).await?;
        let content = store.read(&entry.name).await?;
        if !content.is_empty() {
            store.append(&new_path, 0, &content).await?;
        }
        store.flush(&new_path, content.len() as u64).await?;
        debug!(from = %entry.name, to = %new_path, bytes = content.len(), "Copied raw file");

        store.delete_file(&entry.name).await?;
        debug!(path = %entry.name, "Deleted archived source");

        report.moved.push((entry.name, new_path));
    }

    match store.delete_directory(source, true).await {
        Ok(()) => report.source_removed = true,
        Err(e) => info!("Could not delete directory {}: {}", source, e),
    }

    info!(
        moved = report.moved.len(),
        from = %source,
        to = %destination,
        "Archived raw files"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use spetl_common::storage::LocalStore;
    use spetl_common::{Error, ObjectEntry, Result};

    const SOURCE: &str = "raw_data/to_processed";
    const DESTINATION: &str = "raw_data/processed";

    fn store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_destination_replaces_first_occurrence_only() {
        assert_eq!(
            destination_path("a/src/b/src/c.json", "src", "dst"),
            "a/dst/b/src/c.json"
        );
        assert_eq!(
            destination_path("raw_data/to_processed/x.json", SOURCE, DESTINATION),
            "raw_data/processed/x.json"
        );
    }

    #[tokio::test]
    async fn test_moves_single_file() {
        let (_dir, store) = store();
        store.upload("raw_data/to_processed/x.json", b"{\"items\":[]}").await.unwrap();

        let report = copy_files_and_cleanup(&store, SOURCE, DESTINATION).await.unwrap();

        assert_eq!(
            report.moved,
            vec![(
                "raw_data/to_processed/x.json".to_string(),
                "raw_data/processed/x.json".to_string()
            )]
        );
        assert!(report.source_removed);
        assert_eq!(
            store.read("raw_data/processed/x.json").await.unwrap(),
            b"{\"items\":[]}"
        );
        assert!(matches!(
            store.read("raw_data/to_processed/x.json").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_moves_nested_files_with_identical_bytes() {
        let (_dir, store) = store();
        let files: Vec<(&str, Vec<u8>)> = vec![
            ("raw_data/to_processed/a.json", b"alpha".to_vec()),
            ("raw_data/to_processed/sub/b.json", (0u8..=255).collect()),
            ("raw_data/to_processed/empty.json", Vec::new()),
        ];
        for (path, data) in &files {
            store.upload(path, data).await.unwrap();
        }

        let report = copy_files_and_cleanup(&store, SOURCE, DESTINATION).await.unwrap();
        assert_eq!(report.moved.len(), 3);

        for (path, data) in &files {
            let moved = path.replacen(SOURCE, DESTINATION, 1);
            assert_eq!(&store.read(&moved).await.unwrap(), data);
        }
        let remaining: Vec<ObjectEntry> = store
            .list(SOURCE, true)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| !e.is_directory)
            .collect();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_empty_source_is_noop() {
        let (_dir, store) = store();

        let report = copy_files_and_cleanup(&store, SOURCE, DESTINATION).await.unwrap();
        assert!(report.moved.is_empty());
        assert!(!report.source_removed);

        // A second pass after a successful one is also harmless
        store.upload("raw_data/to_processed/x.json", b"1").await.unwrap();
        copy_files_and_cleanup(&store, SOURCE, DESTINATION).await.unwrap();
        let again = copy_files_and_cleanup(&store, SOURCE, DESTINATION).await.unwrap();
        assert!(again.moved.is_empty());
    }

    /// Store whose directory deletion always fails
    struct StickyDirectories(LocalStore);

    #[async_trait]
    impl ObjectStore for StickyDirectories {
        async fn list(&self, directory: &str, recursive: bool) -> Result<Vec<ObjectEntry>> {
            self.0.list(directory, recursive).await
        }
        async fn read(&self, path: &str) -> Result<Vec<u8>> {
            self.0.read(path).await
        }
        async fn create(&self, path: &str) -> Result<()> {
            self.0.create(path).await
        }
        async fn append(&self, path: &str, position: u64, data: &[u8]) -> Result<()> {
            self.0.append(path, position, data).await
        }
        async fn flush(&self, path: &str, length: u64) -> Result<()> {
            self.0.flush(path, length).await
        }
        async fn delete_file(&self, path: &str) -> Result<()> {
            self.0.delete_file(path).await
        }
        async fn delete_directory(&self, path: &str, _recursive: bool) -> Result<()> {
            Err(Error::Storage {
                status: 409,
                path: path.to_string(),
                message: "DirectoryNotEmpty".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_directory_cleanup_failure_is_not_fatal() {
        let (_dir, local) = store();
        local.upload("raw_data/to_processed/x.json", b"1").await.unwrap();
        let store = StickyDirectories(local);

        let report = copy_files_and_cleanup(&store, SOURCE, DESTINATION).await.unwrap();

        assert_eq!(report.moved.len(), 1);
        assert!(!report.source_removed);
        assert_eq!(store.read("raw_data/processed/x.json").await.unwrap(), b"1");
    }
}
