//! Error types for the record store

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing the store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure on one of the backing files
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A backing file could not be parsed or serialized
    #[error("Malformed store data: {0}")]
    Json(#[from] serde_json::Error),

    /// The highest stored id leaves no room for another entry
    #[error("No entry id left after {0}")]
    IdsExhausted(u64),

    /// The store task is no longer running
    #[error("Record store is closed")]
    Closed,
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
