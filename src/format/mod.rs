//! Record file persistence.
//!
//! Detection files are JSON arrays of records. This module reads them
//! tolerantly, writes them canonically (with an optional `.bak` copy of the
//! previous content) and tracks unsaved changes for the open file.

mod auto_save;
mod error;
mod records;

pub use auto_save::SaveTracker;
pub use error::FormatError;
pub use records::{
    BACKUP_SUFFIX, backup_path, parse_records, read_records, records_to_json, write_records,
};
