//! Error types for loading replay documents.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for document loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Failures while reading a replay export from disk or a string.
///
/// Reconstruction itself never fails; only getting the bytes and parsing
/// them as JSON can.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read replay {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid JSON.
    #[error("replay is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
