//! Best-image-per-bib index.
//!
//! The index is a derived view over the record collection: for every
//! (bib number, category, gender) combination it remembers the record with
//! the greatest total shoe-detection confidence. It holds positions into the
//! collection, never the records themselves, and is rebuilt from scratch
//! after every store mutation.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::constants::{UNKNOWN_BIB_POSITION, UNKNOWN_GENDER};
use crate::model::{Record, display_category};

/// Best record for one (bib, category, gender) combination.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Position of the record in the store
    pub position: usize,
    /// Sum of the record's shoe detection confidences
    pub total_confidence: f64,
    pub bib_number: String,
    /// Display category ("Not Identifiable" is stored as "?")
    pub category: String,
    /// Gender, or [`UNKNOWN_GENDER`] when the record has none
    pub gender: String,
    /// Whether the record names an image file
    pub has_image: bool,
}

/// Index key: bib, category and gender joined with `|`.
fn index_key(bib_number: &str, category: &str, gender: &str) -> String {
    format!("{}|{}|{}", bib_number, category, gender)
}

fn index_gender(gender: &str) -> &str {
    if gender.is_empty() {
        UNKNOWN_GENDER
    } else {
        gender
    }
}

/// Sort position of a bib number.
///
/// Integer bibs sort by value. Empty, `"?"` and non-numeric bibs share the
/// sentinel [`UNKNOWN_BIB_POSITION`] and end up last.
pub fn bib_position(bib_number: &str) -> i64 {
    let trimmed = bib_number.trim();
    if trimmed.is_empty() || trimmed == "?" {
        return UNKNOWN_BIB_POSITION;
    }
    trimmed.parse().unwrap_or(UNKNOWN_BIB_POSITION)
}

/// Canonical ordering for bib listings: by [`bib_position`], then by string.
pub fn compare_bibs(a: &str, b: &str) -> Ordering {
    bib_position(a)
        .cmp(&bib_position(b))
        .then_with(|| a.cmp(b))
}

/// Sort bib numbers in place using [`compare_bibs`].
pub fn sort_bibs(bibs: &mut [String]) {
    bibs.sort_by(|a, b| compare_bibs(a, b));
}

/// Derived map from (bib, category, gender) to the best record.
#[derive(Debug, Clone, Default)]
pub struct RecordIndex {
    entries: HashMap<String, IndexEntry>,
}

impl RecordIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index over a record collection.
    pub fn build(records: &[Record]) -> Self {
        let mut index = Self::new();
        index.rebuild(records);
        index
    }

    /// Recompute every entry from the records.
    ///
    /// Records without a bib number are skipped. Within a key only a strictly
    /// greater total confidence replaces the current entry, so the earliest
    /// record wins ties.
    pub fn rebuild(&mut self, records: &[Record]) {
        self.entries.clear();

        for (position, record) in records.iter().enumerate() {
            if record.bib_number.is_empty() {
                continue;
            }

            let category = display_category(&record.category);
            let gender = index_gender(&record.gender);
            let key = index_key(&record.bib_number, category, gender);
            let total_confidence = record.total_confidence();

            let replace = self
                .entries
                .get(&key)
                .is_none_or(|existing| total_confidence > existing.total_confidence);

            if replace {
                self.entries.insert(
                    key,
                    IndexEntry {
                        position,
                        total_confidence,
                        bib_number: record.bib_number.clone(),
                        category: category.to_string(),
                        gender: gender.to_string(),
                        has_image: !record.image_path.is_empty(),
                    },
                );
            }
        }

        log::trace!(
            "Rebuilt record index: {} entries over {} records",
            self.entries.len(),
            records.len()
        );
    }

    /// Exact lookup by bib, category and gender. An empty gender finds the
    /// records that have none.
    pub fn get(&self, bib_number: &str, category: &str, gender: &str) -> Option<&IndexEntry> {
        self.entries.get(&index_key(
            bib_number,
            display_category(category),
            index_gender(gender),
        ))
    }

    /// Best entry for a bib within a category, across genders.
    ///
    /// Highest total confidence wins; equal confidences go to the earlier
    /// position.
    pub fn best_for(&self, bib_number: &str, category: &str) -> Option<&IndexEntry> {
        let category = display_category(category);
        self.best_where(|entry| entry.bib_number == bib_number && entry.category == category)
    }

    /// Best entry for a bib across every category and gender.
    pub fn best_overall(&self, bib_number: &str) -> Option<&IndexEntry> {
        self.best_where(|entry| entry.bib_number == bib_number)
    }

    fn best_where(&self, filter: impl Fn(&IndexEntry) -> bool) -> Option<&IndexEntry> {
        self.entries
            .values()
            .filter(|entry| filter(*entry))
            .min_by(|a, b| {
                b.total_confidence
                    .total_cmp(&a.total_confidence)
                    .then(a.position.cmp(&b.position))
            })
    }

    /// Distinct bib numbers, optionally restricted to one category, in
    /// canonical bib order. An empty category does not filter.
    pub fn all_bibs(&self, category_filter: Option<&str>) -> Vec<String> {
        let category_filter = category_filter
            .filter(|c| !c.is_empty())
            .map(display_category);
        let distinct: BTreeSet<&str> = self
            .entries
            .values()
            .filter(|entry| category_filter.is_none_or(|c| entry.category == c))
            .map(|entry| entry.bib_number.as_str())
            .collect();

        let mut bibs: Vec<String> = distinct.into_iter().map(str::to_string).collect();
        sort_bibs(&mut bibs);
        bibs
    }

    /// Iterate over all entries (unordered).
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Whether any entry points at the given position.
    pub fn contains_position(&self, position: usize) -> bool {
        self.entries.values().any(|entry| entry.position == position)
    }

    /// Number of (bib, category, gender) combinations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rect, ShoeDetection};

    fn record(bib: &str, category: &str, gender: &str, confidences: &[f64]) -> Record {
        confidences.iter().fold(
            Record::new(format!("{}.jpg", bib))
                .with_bib(bib)
                .with_category(category)
                .with_gender(gender),
            |record, confidence| {
                record.with_shoe(ShoeDetection::new(Rect::new(0.0, 0.0, 1.0, 1.0), *confidence))
            },
        )
    }

    #[test]
    fn test_bib_position() {
        assert_eq!(bib_position("42"), 42);
        assert_eq!(bib_position(" 7 "), 7);
        assert_eq!(bib_position("?"), UNKNOWN_BIB_POSITION);
        assert_eq!(bib_position(""), UNKNOWN_BIB_POSITION);
        assert_eq!(bib_position("A12"), UNKNOWN_BIB_POSITION);
    }

    #[test]
    fn test_bib_ordering() {
        let mut bibs: Vec<String> = ["10", "2", "?", "", "7"].iter().map(|s| s.to_string()).collect();
        sort_bibs(&mut bibs);
        assert_eq!(&bibs[..3], ["2", "7", "10"]);
        assert!(bibs[3..].contains(&"?".to_string()));
        assert!(bibs[3..].contains(&String::new()));
    }

    #[test]
    fn test_non_numeric_bibs_keep_string_order() {
        let mut bibs: Vec<String> = ["ZZ", "5", "AB", "?"].iter().map(|s| s.to_string()).collect();
        sort_bibs(&mut bibs);
        assert_eq!(bibs, ["5", "?", "AB", "ZZ"]);
    }

    #[test]
    fn test_best_record_per_key() {
        let records = vec![
            record("100", "10K", "M", &[0.5]),
            record("100", "10K", "M", &[0.5, 0.4]),
            record("100", "10K", "F", &[0.3]),
        ];
        let index = RecordIndex::build(&records);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("100", "10K", "M").unwrap().position, 1);
        assert_eq!(index.get("100", "10K", "F").unwrap().position, 2);
        assert_eq!(index.best_for("100", "10K").unwrap().position, 1);
        assert!(index.best_for("100", "5K").is_none());
        assert_eq!(index.best_overall("100").unwrap().position, 1);
    }

    #[test]
    fn test_first_seen_wins_ties() {
        let records = vec![
            record("5", "5K", "M", &[0.6]),
            record("5", "5K", "M", &[0.6]),
        ];
        let index = RecordIndex::build(&records);
        assert_eq!(index.get("5", "5K", "M").unwrap().position, 0);
    }

    #[test]
    fn test_empty_bibs_are_skipped() {
        let records = vec![record("", "5K", "M", &[0.9])];
        let index = RecordIndex::build(&records);
        assert!(index.is_empty());
    }

    #[test]
    fn test_not_identifiable_category_maps_to_question_mark() {
        let records = vec![record("8", "Not Identifiable", "F", &[0.9])];
        let index = RecordIndex::build(&records);

        let entry = index.get("8", "?", "F").unwrap();
        assert_eq!(entry.category, "?");
        assert!(index.get("8", "Not Identifiable", "F").is_some());
        assert_eq!(index.all_bibs(Some("?")), ["8"]);
    }

    #[test]
    fn test_all_bibs_with_category_filter() {
        let records = vec![
            record("30", "10K", "M", &[0.9]),
            record("4", "5K", "M", &[0.9]),
            record("12", "10K", "F", &[0.9]),
            record("12", "10K", "M", &[0.9]),
        ];
        let index = RecordIndex::build(&records);

        assert_eq!(index.all_bibs(None), ["4", "12", "30"]);
        assert_eq!(index.all_bibs(Some("10K")), ["12", "30"]);
        assert!(index.all_bibs(Some("21K")).is_empty());
    }

    #[test]
    fn test_empty_category_filter_lists_everything() {
        let records = vec![record("3", "10K", "M", &[0.9]), record("1", "5K", "F", &[0.9])];
        let index = RecordIndex::build(&records);
        assert_eq!(index.all_bibs(Some("")), ["1", "3"]);
    }

    #[test]
    fn test_missing_gender_is_indexed_as_unknown() {
        let records = vec![record("6", "5K", "", &[0.4]), record("6", "5K", "F", &[0.9])];
        let index = RecordIndex::build(&records);

        let entry = index.get("6", "5K", "").unwrap();
        assert_eq!(entry.position, 0);
        assert_eq!(entry.gender, UNKNOWN_GENDER);
        assert_eq!(index.get("6", "5K", UNKNOWN_GENDER), Some(entry));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_rebuild_replaces_entries() {
        let mut index = RecordIndex::build(&[record("1", "5K", "M", &[0.9])]);
        index.rebuild(&[record("2", "5K", "M", &[0.9])]);
        assert!(index.get("1", "5K", "M").is_none());
        assert!(index.contains_position(0));
        assert_eq!(index.all_bibs(None), ["2"]);
    }
}
