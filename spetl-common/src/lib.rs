//! # spetl Common Library
//!
//! Shared code for both spetl services:
//! - Configuration loading (environment + TOML bootstrap)
//! - Error types
//! - Logging initialization
//! - Raw and transformed zone path layout
//! - Object storage abstraction with Azure Data Lake and local backends

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;
pub mod storage;

pub use error::{Error, Result};
pub use storage::{ObjectEntry, ObjectStore};
