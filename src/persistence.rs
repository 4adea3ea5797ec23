//! Snapshot Persistence
//!
//! Reads and writes the JSON snapshot of live entries. Writes go to a uniquely
//! named temporary file in the target's directory that is renamed over the target,
//! so readers never observe a partially written snapshot and an interrupted save
//! leaves the previous one intact.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::PersistenceError;

// == Snapshot Record ==
/// One persisted entry. `expire_at` is Unix seconds, or `null` for no expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord<K> {
    pub key: K,
    pub value: Value,
    pub expire_at: Option<f64>,
}

/// Directory that holds the temporary file, so the final rename never crosses filesystems.
fn temp_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

// == Write ==
/// Atomically replaces `path` with the given records.
pub fn write_snapshot<K: Serialize>(
    path: &Path,
    records: &[SnapshotRecord<K>],
) -> Result<(), PersistenceError> {
    let tmp = write_temp(path, records)?;
    commit(tmp, path)
}

/// First half of a save: encodes the records into a fresh temporary file next to
/// `path` and syncs it. Dropping the returned handle without committing removes it.
pub(crate) fn write_temp<K: Serialize>(
    path: &Path,
    records: &[SnapshotRecord<K>],
) -> Result<NamedTempFile, PersistenceError> {
    let json = serde_json::to_string_pretty(records).map_err(|source| {
        PersistenceError::Format {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let dir = temp_dir(path);
    let io_err = |source: std::io::Error| PersistenceError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let prefix = format!(
        ".{}.",
        path.file_name().unwrap_or_default().to_string_lossy()
    );
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_err)?;
    tmp.write_all(json.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;

    Ok(tmp)
}

/// Second half of a save: moves the temporary file into place.
pub(crate) fn commit(tmp: NamedTempFile, path: &Path) -> Result<(), PersistenceError> {
    tmp.persist(path)
        .map(|_| ())
        .map_err(|err| PersistenceError::Io {
            path: path.to_path_buf(),
            source: err.error,
        })
}

// == Read ==
/// Reads a snapshot. Returns `Ok(None)` when the file does not exist; empty content
/// is an empty snapshot rather than an error.
pub fn read_snapshot<K: DeserializeOwned>(
    path: &Path,
) -> Result<Option<Vec<SnapshotRecord<K>>>, PersistenceError> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if raw.trim().is_empty() {
        return Ok(Some(Vec::new()));
    }

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| PersistenceError::Format {
            path: path.to_path_buf(),
            source,
        })
}
