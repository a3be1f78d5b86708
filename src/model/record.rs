//! Detection record data model.
//!
//! A [`Record`] is one detection result for one race photo: the runner's
//! bounding box, the bib (chest plate) detection and any number of shoe
//! detections with their brand labels. Records are stored on disk as a JSON
//! array; fields this model does not know about are carried through
//! unchanged in [`Record::extra`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::constants::{
    DEFAULT_BIB_THRESHOLD, DEFAULT_SHOE_THRESHOLD, NOT_IDENTIFIABLE, UNKNOWN_CATEGORY,
};

/// Axis-aligned box in image pixel coordinates, stored as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    /// Create a box from its corners.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box width (zero for inverted boxes).
    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).max(0.0)
    }

    /// Box height (zero for inverted boxes).
    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).max(0.0)
    }

    /// Clamp the box to an image of the given size and return it as
    /// `(x, y, width, height)` in whole pixels.
    ///
    /// Returns `None` if nothing of the box lies inside the image.
    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> Option<(u32, u32, u32, u32)> {
        let max_x = f64::from(image_width);
        let max_y = f64::from(image_height);
        let x1 = self.x1.clamp(0.0, max_x).floor();
        let y1 = self.y1.clamp(0.0, max_y).floor();
        let x2 = self.x2.clamp(0.0, max_x).ceil();
        let y2 = self.y2.clamp(0.0, max_y).ceil();

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some((x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32))
    }
}

impl From<[f64; 4]> for Rect {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<Rect> for [f64; 4] {
    fn from(rect: Rect) -> Self {
        [rect.x1, rect.y1, rect.x2, rect.y2]
    }
}

/// Bib (chest plate) detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BibDetection {
    pub bbox: Rect,
    /// Detector confidence; files without one are treated as certain.
    #[serde(default = "full_confidence")]
    pub confidence: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn full_confidence() -> f64 {
    1.0
}

impl BibDetection {
    pub fn new(bbox: Rect, confidence: f64) -> Self {
        Self {
            bbox,
            confidence,
            extra: Map::new(),
        }
    }
}

/// A single shoe detection.
///
/// The brand label has historically been written to three different fields.
/// Never read or write them directly; use [`ShoeDetection::read_brand`] and
/// [`ShoeDetection::write_brand`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoeDetection {
    pub bbox: Rect,

    /// Detection confidence. Missing values pass the import filter but add
    /// nothing to a record's total confidence.
    #[serde(
        rename = "confidence",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub detection_confidence: Option<f64>,

    /// Classifier output (authoritative when non-empty)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_label: Option<String>,

    /// Reviewer-assigned label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_label: Option<String>,

    /// Legacy detector label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Classifier confidence for the brand label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_confidence: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ShoeDetection {
    /// Create an unlabelled shoe detection.
    pub fn new(bbox: Rect, confidence: f64) -> Self {
        Self {
            bbox,
            detection_confidence: Some(confidence),
            classification_label: None,
            new_label: None,
            label: None,
            classification_confidence: None,
            extra: Map::new(),
        }
    }

    /// Set the brand (builder style).
    pub fn with_brand(mut self, brand: &str) -> Self {
        self.write_brand(brand);
        self
    }

    /// Confidence contribution to the record total.
    pub fn confidence_or_zero(&self) -> f64 {
        self.detection_confidence.unwrap_or(0.0)
    }
}

/// Minimum detector confidences applied when a collection is imported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    /// Bib detections below this are dropped.
    pub bib: f64,
    /// Shoe detections below this are dropped.
    pub shoes: f64,
}

impl ConfidenceThresholds {
    pub fn new(bib: f64, shoes: f64) -> Self {
        Self { bib, shoes }
    }

    /// Thresholds that keep every detection.
    pub fn accept_all() -> Self {
        Self {
            bib: f64::NEG_INFINITY,
            shoes: f64::NEG_INFINITY,
        }
    }
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            bib: DEFAULT_BIB_THRESHOLD,
            shoes: DEFAULT_SHOE_THRESHOLD,
        }
    }
}

/// One detection record for one photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRecord")]
pub struct Record {
    pub bib_number: String,

    #[serde(rename = "run_category")]
    pub category: String,

    pub gender: String,

    pub image_path: String,

    #[serde(rename = "bbox", skip_serializing_if = "Option::is_none")]
    pub person_bbox: Option<Rect>,

    #[serde(rename = "bib", skip_serializing_if = "Option::is_none")]
    pub bib_detection: Option<BibDetection>,

    pub shoes: Vec<ShoeDetection>,

    pub checked: bool,

    /// Fields not modelled here, preserved on save
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Record as found on disk. Older files name some fields differently and
/// some carry both spellings, so every alternative is read separately and
/// resolved in [`From<RawRecord>`].
#[derive(Deserialize)]
struct RawRecord {
    #[serde(default, deserialize_with = "bib_from_string_or_number")]
    bib_number: String,
    #[serde(default)]
    run_category: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    image_path: Option<String>,
    #[serde(default)]
    bbox: Option<Rect>,
    #[serde(default)]
    person_bbox: Option<Rect>,
    #[serde(default)]
    bib: Option<BibDetection>,
    #[serde(default)]
    shoes: Vec<ShoeDetection>,
    #[serde(default)]
    checked: bool,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// First non-empty string of a preferred and a fallback key.
fn first_non_empty(preferred: Option<String>, fallback: Option<String>) -> String {
    preferred
        .filter(|value| !value.is_empty())
        .or(fallback)
        .unwrap_or_default()
}

impl From<RawRecord> for Record {
    fn from(raw: RawRecord) -> Self {
        Self {
            bib_number: raw.bib_number,
            category: first_non_empty(raw.run_category, raw.category),
            gender: raw.gender.unwrap_or_default(),
            image_path: first_non_empty(raw.filename, raw.image_path),
            person_bbox: raw.bbox.or(raw.person_bbox),
            bib_detection: raw.bib,
            shoes: raw.shoes,
            checked: raw.checked,
            extra: raw.extra,
        }
    }
}

impl Record {
    /// Create an empty record for an image.
    pub fn new(image_path: impl Into<String>) -> Self {
        Self {
            bib_number: String::new(),
            category: String::new(),
            gender: String::new(),
            image_path: image_path.into(),
            person_bbox: None,
            bib_detection: None,
            shoes: Vec::new(),
            checked: false,
            extra: Map::new(),
        }
    }

    /// Set the bib number.
    pub fn with_bib(mut self, bib_number: &str) -> Self {
        self.bib_number = bib_number.to_string();
        self
    }

    /// Set the run category.
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    /// Set the gender.
    pub fn with_gender(mut self, gender: &str) -> Self {
        self.gender = gender.to_string();
        self
    }

    /// Set the runner bounding box.
    pub fn with_person_bbox(mut self, bbox: Rect) -> Self {
        self.person_bbox = Some(bbox);
        self
    }

    /// Set the bib detection.
    pub fn with_bib_detection(mut self, detection: BibDetection) -> Self {
        self.bib_detection = Some(detection);
        self
    }

    /// Append a shoe detection.
    pub fn with_shoe(mut self, shoe: ShoeDetection) -> Self {
        self.shoes.push(shoe);
        self
    }

    /// Set the checked flag.
    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    /// Sum of the shoe detection confidences; ranks photos of the same runner.
    pub fn total_confidence(&self) -> f64 {
        self.shoes.iter().map(ShoeDetection::confidence_or_zero).sum()
    }

    /// Category as shown to the reviewer ("Not Identifiable" becomes "?").
    pub fn display_category(&self) -> &str {
        display_category(&self.category)
    }

    /// Resolved, non-empty shoe brands in shoe order.
    pub fn brands(&self) -> Vec<&str> {
        self.shoes
            .iter()
            .map(ShoeDetection::read_brand)
            .filter(|brand| !brand.is_empty())
            .collect()
    }

    /// Apply the import confidence filter.
    ///
    /// Drops shoes and the bib detection below their thresholds (both bounds
    /// inclusive). Returns `None` when nothing is left worth reviewing.
    pub fn filtered(mut self, thresholds: &ConfidenceThresholds) -> Option<Self> {
        self.shoes.retain(|shoe| {
            shoe.detection_confidence
                .is_none_or(|confidence| confidence >= thresholds.shoes)
        });

        if self
            .bib_detection
            .as_ref()
            .is_some_and(|bib| bib.confidence < thresholds.bib)
        {
            self.bib_detection = None;
        }

        if self.shoes.is_empty() && self.bib_detection.is_none() {
            None
        } else {
            Some(self)
        }
    }
}

/// Map a stored category to its display form.
pub fn display_category(category: &str) -> &str {
    if category == NOT_IDENTIFIABLE {
        UNKNOWN_CATEGORY
    } else {
        category
    }
}

/// Bib numbers are written as strings, but older detector runs emitted plain
/// numbers.
fn bib_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => return Err(serde::de::Error::custom(format!("invalid bib_number: {other}"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shoe(confidence: f64) -> ShoeDetection {
        ShoeDetection::new(Rect::new(0.0, 0.0, 10.0, 10.0), confidence)
    }

    #[test]
    fn test_rect_roundtrips_as_array() {
        let rect = Rect::new(1.5, 2.0, 30.0, 40.25);
        let json = serde_json::to_string(&rect).unwrap();
        assert_eq!(json, "[1.5,2.0,30.0,40.25]");

        let loaded: Rect = serde_json::from_str("[1, 2, 30, 40]").unwrap();
        assert_eq!(loaded, Rect::new(1.0, 2.0, 30.0, 40.0));
    }

    #[test]
    fn test_rect_to_pixels_clamps() {
        let rect = Rect::new(-10.0, 5.0, 50.0, 500.0);
        assert_eq!(rect.to_pixels(40, 100), Some((0, 5, 40, 95)));

        let outside = Rect::new(200.0, 200.0, 300.0, 300.0);
        assert_eq!(outside.to_pixels(100, 100), None);

        let inverted = Rect::new(20.0, 20.0, 10.0, 10.0);
        assert_eq!(inverted.to_pixels(100, 100), None);
        assert_eq!(inverted.width(), 0.0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let thresholds = ConfidenceThresholds::new(0.5, 0.5);
        let record = Record::new("a.jpg")
            .with_shoe(shoe(0.5))
            .with_shoe(shoe(0.49))
            .with_shoe(shoe(0.9));

        let filtered = record.filtered(&thresholds).unwrap();
        assert_eq!(filtered.shoes.len(), 2);
        assert_eq!(filtered.shoes[0].detection_confidence, Some(0.5));
        assert_eq!(filtered.shoes[1].detection_confidence, Some(0.9));
    }

    #[test]
    fn test_low_bib_detection_is_dropped() {
        let thresholds = ConfidenceThresholds::new(0.6, 0.5);
        let record = Record::new("a.jpg")
            .with_bib_detection(BibDetection::new(Rect::new(0.0, 0.0, 5.0, 5.0), 0.59))
            .with_shoe(shoe(0.8));

        let filtered = record.filtered(&thresholds).unwrap();
        assert!(filtered.bib_detection.is_none());
        assert_eq!(filtered.shoes.len(), 1);
    }

    #[test]
    fn test_record_without_detections_is_discarded() {
        let thresholds = ConfidenceThresholds::new(0.5, 0.5);
        let record = Record::new("a.jpg")
            .with_bib_detection(BibDetection::new(Rect::new(0.0, 0.0, 5.0, 5.0), 0.1))
            .with_shoe(shoe(0.2));
        assert!(record.filtered(&thresholds).is_none());

        let bib_only = Record::new("b.jpg")
            .with_bib_detection(BibDetection::new(Rect::new(0.0, 0.0, 5.0, 5.0), 0.5));
        assert!(bib_only.filtered(&thresholds).is_some());
    }

    #[test]
    fn test_shoe_without_confidence_passes_filter() {
        let mut unscored = shoe(0.0);
        unscored.detection_confidence = None;
        let record = Record::new("a.jpg").with_shoe(unscored);

        let filtered = record.filtered(&ConfidenceThresholds::default()).unwrap();
        assert_eq!(filtered.shoes.len(), 1);
        assert_eq!(filtered.total_confidence(), 0.0);
    }

    #[test]
    fn test_total_confidence() {
        let record = Record::new("a.jpg").with_shoe(shoe(0.25)).with_shoe(shoe(0.5));
        assert!((record.total_confidence() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_deserialize_aliases_and_extras() {
        let json = r#"{
            "bib_number": 123,
            "category": "10K",
            "gender": "F",
            "filename": "img/001.jpg",
            "person_bbox": [0, 0, 100, 200],
            "shoes": [{"bbox": [1, 2, 3, 4], "confidence": 0.9, "label": "Nike"}],
            "position": 7
        }"#;

        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.bib_number, "123");
        assert_eq!(record.category, "10K");
        assert_eq!(record.image_path, "img/001.jpg");
        assert_eq!(record.person_bbox, Some(Rect::new(0.0, 0.0, 100.0, 200.0)));
        assert_eq!(record.shoes[0].read_brand(), "Nike");
        assert!(!record.checked);
        assert_eq!(record.extra.get("position"), Some(&Value::from(7)));
    }

    #[test]
    fn test_both_spellings_of_a_field() {
        let json = r#"{
            "bib_number": "1",
            "run_category": "",
            "category": "5K",
            "filename": "a.jpg",
            "image_path": "b.jpg",
            "bbox": [0, 0, 10, 10],
            "person_bbox": [5, 5, 20, 20],
            "shoes": [{"bbox": [1, 2, 3, 4], "confidence": 0.9}]
        }"#;

        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.category, "5K");
        assert_eq!(record.image_path, "a.jpg");
        assert_eq!(record.person_bbox, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_empty_preferred_spelling_falls_back() {
        let json = r#"{"filename": "", "image_path": "b.jpg", "person_bbox": [1, 1, 2, 2]}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.image_path, "b.jpg");
        assert_eq!(record.person_bbox, Some(Rect::new(1.0, 1.0, 2.0, 2.0)));
        assert_eq!(record.gender, "");
    }

    #[test]
    fn test_serialize_uses_canonical_names() {
        let record = Record::new("a.jpg")
            .with_bib("42")
            .with_category("5K")
            .with_person_bbox(Rect::new(0.0, 0.0, 1.0, 1.0));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["run_category"], "5K");
        assert_eq!(value["image_path"], "a.jpg");
        assert!(value.get("bbox").is_some());
        assert!(value.get("bib").is_none());
    }

    #[test]
    fn test_display_category() {
        let record = Record::new("a.jpg").with_category(NOT_IDENTIFIABLE);
        assert_eq!(record.display_category(), "?");
        assert_eq!(display_category("21K"), "21K");
    }
}
