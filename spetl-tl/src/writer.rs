//! Storage writer
//!
//! Serializes a dataset as comma-separated text (header row, then one row per
//! record in declared column order) and uploads it, replacing whatever was at
//! the destination. The upload is not atomic.

use crate::error::TransformResult;
use crate::records::Tabular;
use serde::de::DeserializeOwned;
use spetl_common::ObjectStore;
use tracing::info;

/// Encode records as CSV text
pub fn encode<T: Tabular>(records: &[T]) -> TransformResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    // Header is written explicitly so empty datasets still carry it
    writer.write_record(T::HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()).into())
}

/// Decode CSV text produced by [`encode`]
pub fn read_dataset<T: DeserializeOwned>(bytes: &[u8]) -> TransformResult<Vec<T>> {
    let mut reader = csv::Reader::from_reader(bytes);
    let records = reader
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()?;
    Ok(records)
}

/// Encode and upload a dataset; returns the number of rows written
pub async fn write_dataset<T: Tabular>(
    store: &dyn ObjectStore,
    path: &str,
    records: &[T],
) -> TransformResult<usize> {
    let body = encode(records)?;
    store.upload(path, &body).await?;

    info!(path = %path, rows = records.len(), bytes = body.len(), "Wrote dataset");
    Ok(records.len())
}
