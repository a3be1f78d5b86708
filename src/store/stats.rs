//! Review progress and dataset statistics.

use std::collections::BTreeSet;

use crate::constants::NOT_IDENTIFIABLE;
use crate::model::Record;

/// How many records have been confirmed by a reviewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub total: usize,
    pub checked: usize,
    /// `checked / total * 100`, or 0 for an empty collection
    pub percentage: f64,
}

impl Progress {
    /// Compute progress over a record collection.
    pub fn of(records: &[Record]) -> Self {
        let total = records.len();
        let checked = records.iter().filter(|r| r.checked).count();
        let percentage = if total > 0 {
            checked as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total,
            checked,
            percentage,
        }
    }
}

/// Distinct values offered as choices in the review form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetStats {
    /// Configured brand labels plus every brand found on a shoe
    pub brands: Vec<String>,
    /// Run categories, without "Not Identifiable"
    pub categories: Vec<String>,
    pub genders: Vec<String>,
}

impl DatasetStats {
    /// Collect sorted distinct brands, categories and genders.
    pub fn collect<S: AsRef<str>>(records: &[Record], configured_brands: &[S]) -> Self {
        let mut brands: BTreeSet<String> = configured_brands
            .iter()
            .map(|b| b.as_ref().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        let mut categories = BTreeSet::new();
        let mut genders = BTreeSet::new();

        for record in records {
            if !record.category.is_empty() && record.category != NOT_IDENTIFIABLE {
                categories.insert(record.category.clone());
            }
            if !record.gender.is_empty() {
                genders.insert(record.gender.clone());
            }
            brands.extend(record.brands().into_iter().map(str::to_string));
        }

        Self {
            brands: brands.into_iter().collect(),
            categories: categories.into_iter().collect(),
            genders: genders.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rect, ShoeDetection};

    #[test]
    fn test_progress_empty() {
        let progress = Progress::of(&[]);
        assert_eq!(progress.total, 0);
        assert_eq!(progress.percentage, 0.0);
    }

    #[test]
    fn test_progress_percentage() {
        let records = vec![
            Record::new("a.jpg").with_checked(true),
            Record::new("b.jpg"),
            Record::new("c.jpg"),
            Record::new("d.jpg").with_checked(true),
        ];
        let progress = Progress::of(&records);
        assert_eq!(progress.checked, 2);
        assert_eq!(progress.percentage, 50.0);
    }

    #[test]
    fn test_collect_stats() {
        let shoe = ShoeDetection::new(Rect::new(0.0, 0.0, 1.0, 1.0), 0.9);
        let records = vec![
            Record::new("a.jpg")
                .with_category("10K")
                .with_gender("M")
                .with_shoe(shoe.clone().with_brand("Nike")),
            Record::new("b.jpg")
                .with_category(NOT_IDENTIFIABLE)
                .with_gender("F")
                .with_shoe(shoe.clone()),
            Record::new("c.jpg").with_category("5K").with_shoe(shoe.with_brand("Adidas")),
        ];

        let stats = DatasetStats::collect(&records, &["Olympikus", "Nike"]);
        assert_eq!(stats.brands, ["Adidas", "Nike", "Olympikus"]);
        assert_eq!(stats.categories, ["10K", "5K"]);
        assert_eq!(stats.genders, ["F", "M"]);
    }
}
