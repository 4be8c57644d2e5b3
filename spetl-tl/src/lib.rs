//! spetl-tl library interface
//!
//! Turns pending raw playlist snapshots into album, artist and song datasets,
//! writes them to the transformed zone and archives the consumed raw files.

pub mod aggregate;
pub mod archive;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod records;
pub mod scanner;
pub mod snapshot;
pub mod watcher;
pub mod writer;

pub use crate::error::{TransformError, TransformResult};
pub use crate::pipeline::{run_transformation, TransformContext, TransformSummary};
