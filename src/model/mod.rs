//! Data models for race photo detection records.

mod brand;
mod record;

pub use brand::BrandField;
pub use record::{
    BibDetection, ConfidenceThresholds, Rect, Record, ShoeDetection, display_category,
};
