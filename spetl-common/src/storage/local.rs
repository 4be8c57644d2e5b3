//! Filesystem-backed object store
//!
//! Maps object names onto a directory tree. Used for local development runs
//! (`--local-root`) and by the test suites.

use super::{ObjectEntry, ObjectStore};
use crate::{Error, Result};
use async_trait::async_trait;
use std::io::{self, SeekFrom};
use std::path::{Component, Path, PathBuf};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use walkdir::WalkDir;

/// Object store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Map an object name to a path below the root
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name.trim_start_matches('/'));
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "object name escapes store root: {}",
                        name
                    )))
                }
            }
        }
        Ok(self.root.join(relative))
    }

    /// Object name of a path found below the root
    fn object_name(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

fn not_found_or(err: io::Error, name: &str) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::NotFound(name.to_string())
    } else {
        Error::Io(err)
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn list(&self, directory: &str, recursive: bool) -> Result<Vec<ObjectEntry>> {
        let base = self.resolve(directory)?;
        if !base.exists() {
            return Ok(Vec::new());
        }
        if !base.is_dir() {
            return Err(Error::InvalidInput(format!("not a directory: {}", directory)));
        }

        let store = self.clone();
        let mut entries = tokio::task::spawn_blocking(move || -> Result<Vec<ObjectEntry>> {
            let walker = WalkDir::new(&base)
                .min_depth(1)
                .max_depth(if recursive { usize::MAX } else { 1 })
                .follow_links(false);

            let mut entries = Vec::new();
            for entry in walker {
                let entry = entry.map_err(|e| Error::Io(io::Error::other(e.to_string())))?;
                let Some(name) = store.object_name(entry.path()) else {
                    continue;
                };
                let is_directory = entry.file_type().is_dir();
                let content_length = if is_directory {
                    0
                } else {
                    entry
                        .metadata()
                        .map_err(|e| Error::Io(io::Error::other(e.to_string())))?
                        .len()
                };
                entries.push(ObjectEntry {
                    name,
                    is_directory,
                    content_length,
                });
            }
            Ok(entries)
        })
        .await
        .map_err(|e| Error::Io(io::Error::other(e.to_string())))??;

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let file = self.resolve(path)?;
        tokio::fs::read(&file).await.map_err(|e| not_found_or(e, path))
    }

    async fn create(&self, path: &str) -> Result<()> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::File::create(&file).await?;
        Ok(())
    }

    async fn append(&self, path: &str, position: u64, data: &[u8]) -> Result<()> {
        let file = self.resolve(path)?;
        let mut handle = tokio::fs::OpenOptions::new()
            .write(true)
            .open(&file)
            .await
            .map_err(|e| not_found_or(e, path))?;
        handle.seek(SeekFrom::Start(position)).await?;
        handle.write_all(data).await?;
        handle.flush().await?;
        Ok(())
    }

    async fn flush(&self, path: &str, length: u64) -> Result<()> {
        let file = self.resolve(path)?;
        let handle = tokio::fs::OpenOptions::new()
            .write(true)
            .open(&file)
            .await
            .map_err(|e| not_found_or(e, path))?;
        handle.set_len(length).await?;
        handle.sync_all().await?;
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        let file = self.resolve(path)?;
        tokio::fs::remove_file(&file)
            .await
            .map_err(|e| not_found_or(e, path))
    }

    async fn delete_directory(&self, path: &str, recursive: bool) -> Result<()> {
        let dir = self.resolve(path)?;
        if dir == self.root {
            return Err(Error::InvalidInput("refusing to delete store root".to_string()));
        }
        let result = if recursive {
            tokio::fs::remove_dir_all(&dir).await
        } else {
            tokio::fs::remove_dir(&dir).await
        };
        result.map_err(|e| not_found_or(e, path))
    }
}
