//! Error types for spetl-tl

use thiserror::Error;

/// Failures of a transformation run
///
/// Every variant aborts the run; there is no per-record recovery.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A snapshot lacks a field the extractors rely on
    #[error("Malformed payload in {source_path} (item {index}): {reason}")]
    MalformedPayload {
        source_path: String,
        index: usize,
        reason: String,
    },

    /// A raw file is not valid JSON
    #[error("Unparseable snapshot {source_path}: {reason}")]
    UnparseableSnapshot { source_path: String, reason: String },

    /// A date or timestamp field does not parse
    #[error("Invalid {field} value {value:?}")]
    InvalidDate { field: &'static str, value: String },

    /// Delimited-text encoding or decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Object storage failure (list, download, upload, move)
    #[error("Storage error: {0}")]
    Storage(#[from] spetl_common::Error),
}

/// Result type for transformation operations
pub type TransformResult<T> = Result<T, TransformError>;
