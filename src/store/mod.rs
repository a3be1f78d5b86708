//! Record collection ownership, editing and undo.

mod record_store;
mod stats;
mod undo;

pub use record_store::{LoadSummary, RecordStore, UndoOutcome};
pub use stats::{DatasetStats, Progress};
pub use undo::{Snapshot, UndoConfig, UndoStack};
