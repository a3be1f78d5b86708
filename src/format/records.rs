//! JSON persistence for record collections.
//!
//! A detection file is a JSON array of [`Record`] objects. Reading is
//! tolerant (aliases, numeric bibs, legacy brand fields, unknown fields kept);
//! writing is canonical and pretty-printed with two-space indentation.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::format::error::FormatError;
use crate::model::Record;

/// Suffix appended to a file name to form its backup path.
pub const BACKUP_SUFFIX: &str = ".bak";

/// Sibling backup path for a record file (`races.json` -> `races.json.bak`).
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Parse a record collection from JSON text.
pub fn parse_records(json: &str) -> Result<Vec<Record>, FormatError> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        return Err(FormatError::invalid_format(
            "expected a JSON array of records at the top level",
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item)
                .map_err(|e| FormatError::invalid_format(format!("record {}: {}", i, e)))
        })
        .collect()
}

/// Read a record collection from disk.
pub fn read_records(path: &Path) -> Result<Vec<Record>, FormatError> {
    let json = fs::read_to_string(path)?;
    let records = parse_records(&json)?;
    log::info!("Read {} records from {:?}", records.len(), path);
    Ok(records)
}

/// Serialize a record collection to pretty JSON.
pub fn records_to_json(records: &[Record]) -> Result<String, FormatError> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Write a record collection to disk.
///
/// With `make_backup`, an existing file at `path` is first copied to
/// [`backup_path`]. A missing file simply has nothing to back up. The backup
/// failing aborts the write so the caller can decide what to do.
pub fn write_records(path: &Path, records: &[Record], make_backup: bool) -> Result<(), FormatError> {
    let json = records_to_json(records)?;

    if make_backup && path.exists() {
        let backup = backup_path(path);
        fs::copy(path, &backup).map_err(|source| FormatError::Backup {
            path: backup.clone(),
            source,
        })?;
        log::debug!("Backed up {:?} to {:?}", path, backup);
    }

    fs::write(path, json)?;
    log::info!("Wrote {} records to {:?}", records.len(), path);
    Ok(())
}
