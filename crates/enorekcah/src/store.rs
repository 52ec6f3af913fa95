use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A collection that cannot be read or parsed is a structural failure:
/// unlike per-item crawl errors there is no meaningful partial result,
/// so these propagate to the caller.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("failed to serialize records for {path}: {source}")]
    Serialize {
        path: String,
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Load a JSON array collection written by a previous run.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let text = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| StoreError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Write a record collection as a pretty-printed JSON array,
/// overwriting any previous output so each run is idempotent.
pub fn save_records<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(records).map_err(|source| StoreError::Serialize {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, json).map_err(|source| StoreError::Write {
        path: path.display().to_string(),
        source,
    })
}
