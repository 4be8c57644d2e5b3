//! Object storage abstraction
//!
//! The primitives mirror a hierarchical data lake (create / append / flush
//! for writes, real directories for listing and deletion) so that the
//! archival move can be expressed the same way against every backend.
//!
//! Object names are `/`-separated paths relative to the container root,
//! without a leading slash.

mod adls;
mod local;
pub mod shared_key;

pub use adls::AdlsStore;
pub use local::LocalStore;

use crate::config::StorageConfig;
use crate::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// One entry returned by [`ObjectStore::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Full object name relative to the container root
    pub name: String,
    /// Directory placeholder rather than a file
    pub is_directory: bool,
    /// Size in bytes (0 for directories)
    pub content_length: u64,
}

/// Storage operations used by the extraction and transform-load services
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List entries under `directory`
    ///
    /// A directory that does not exist lists as empty. Entries are returned
    /// in lexicographic name order.
    async fn list(&self, directory: &str, recursive: bool) -> Result<Vec<ObjectEntry>>;

    /// Download the full content of a file
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Create (or truncate) an empty file, creating parent directories
    async fn create(&self, path: &str) -> Result<()>;

    /// Stage `data` at byte offset `position` of an existing file
    async fn append(&self, path: &str, position: u64, data: &[u8]) -> Result<()>;

    /// Commit staged data; `length` is the final file size
    async fn flush(&self, path: &str, length: u64) -> Result<()>;

    /// Delete one file
    async fn delete_file(&self, path: &str) -> Result<()>;

    /// Delete a directory; non-recursive deletion fails if it is not empty
    async fn delete_directory(&self, path: &str, recursive: bool) -> Result<()>;

    /// Write `data` to `path`, replacing any existing object
    async fn upload(&self, path: &str, data: &[u8]) -> Result<()> {
        self.create(path).await?;
        if !data.is_empty() {
            self.append(path, 0, data).await?;
        }
        self.flush(path, data.len() as u64).await
    }
}

/// Stores used by one process
///
/// `raw` lists and downloads pending snapshots (connection-string auth);
/// `lake` receives uploads, transformed datasets and archive moves
/// (account-key auth). Both point at the same container.
#[derive(Clone)]
pub struct Stores {
    pub raw: Arc<dyn ObjectStore>,
    pub lake: Arc<dyn ObjectStore>,
}

impl Stores {
    /// Open the Azure Data Lake stores, or a single local directory when
    /// `local_root` is given
    pub fn open(config: &StorageConfig, local_root: Option<&Path>) -> Result<Self> {
        if let Some(root) = local_root {
            let store: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(root)?);
            return Ok(Self {
                raw: store.clone(),
                lake: store,
            });
        }

        let raw = AdlsStore::from_connection_string(&config.connection_string, &config.container)?;
        let lake = AdlsStore::new(&config.account_name, &config.account_key, &config.container)?;

        Ok(Self {
            raw: Arc::new(raw),
            lake: Arc::new(lake),
        })
    }
}
