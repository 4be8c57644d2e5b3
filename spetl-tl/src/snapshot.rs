//! Raw playlist snapshot
//!
//! One page of the playlist tracks endpoint exactly as it was staged in the
//! raw zone. The document is kept untyped; each extractor deserializes only
//! the fields it needs.

use crate::error::{TransformError, TransformResult};
use serde_json::Value;

/// A raw snapshot and the object it was read from
#[derive(Debug, Clone)]
pub struct PlaylistSnapshot {
    source_path: String,
    document: Value,
}

impl PlaylistSnapshot {
    /// Wrap an already-parsed document
    pub fn new(source_path: impl Into<String>, document: Value) -> Self {
        Self {
            source_path: source_path.into(),
            document,
        }
    }

    /// Parse raw file content
    pub fn from_slice(source_path: &str, bytes: &[u8]) -> TransformResult<Self> {
        let document =
            serde_json::from_slice(bytes).map_err(|e| TransformError::UnparseableSnapshot {
                source_path: source_path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::new(source_path, document))
    }

    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    /// The playlist entries of this page
    pub fn items(&self) -> TransformResult<&[Value]> {
        self.document
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| TransformError::MalformedPayload {
                source_path: self.source_path.clone(),
                index: 0,
                reason: "missing `items` array".to_string(),
            })
    }
}
