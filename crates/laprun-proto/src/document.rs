//! Loading raw replay exports.

use std::path::Path;

use serde_json::Value;

use crate::error::{LoadError, LoadResult};

/// Parses an export from a string.
pub fn parse_document(content: &str) -> LoadResult<Value> {
    Ok(serde_json::from_str(content)?)
}

/// Reads and parses an export file.
pub fn load_document(path: &Path) -> LoadResult<Value> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&content)
}
