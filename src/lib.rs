//! runview - race photo review core
//!
//! Data and caching layer for reviewing race-photo detection results: a
//! reviewer pages through records (runner box, bib detection, shoe
//! detections with brand labels), fixes bib numbers and brands and marks
//! records as checked.
//!
//! - [`store::RecordStore`] owns the records, applies edits and keeps a
//!   bounded snapshot undo history.
//! - [`index::RecordIndex`] is the derived best-photo-per-bib view, rebuilt
//!   after every edit.
//! - [`cache::AsyncImageCache`] decodes photos on a background worker with
//!   request de-duplication and LRU eviction.
//! - [`display::DisplayOrchestrator`] combines the cache with annotation and
//!   cropping to produce what the review panels show.

pub mod cache;
pub mod config;
pub mod constants;
pub mod display;
pub mod format;
pub mod index;
pub mod model;
pub mod store;

pub use cache::AsyncImageCache;
pub use config::AppConfig;
pub use display::DisplayOrchestrator;
pub use index::RecordIndex;
pub use model::Record;
pub use store::RecordStore;
