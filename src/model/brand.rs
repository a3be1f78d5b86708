//! Shoe brand field resolution.
//!
//! Detection files have carried the brand under three names over time. The
//! precedence lives here and nowhere else: the store, the index, the display
//! layer and exporters all go through [`ShoeDetection::read_brand`] and
//! [`ShoeDetection::write_brand`].

use super::record::ShoeDetection;

/// The alternative fields a brand label can live in, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrandField {
    /// `classification_label`
    Classification,
    /// `new_label`
    New,
    /// `label`
    Legacy,
}

impl BrandField {
    /// All fields from highest to lowest precedence.
    pub fn all() -> &'static [BrandField] {
        &[BrandField::Classification, BrandField::New, BrandField::Legacy]
    }

    /// JSON field name.
    pub fn key(&self) -> &'static str {
        match self {
            BrandField::Classification => "classification_label",
            BrandField::New => "new_label",
            BrandField::Legacy => "label",
        }
    }
}

impl ShoeDetection {
    fn brand_slot(&self, field: BrandField) -> &Option<String> {
        match field {
            BrandField::Classification => &self.classification_label,
            BrandField::New => &self.new_label,
            BrandField::Legacy => &self.label,
        }
    }

    fn brand_slot_mut(&mut self, field: BrandField) -> &mut Option<String> {
        match field {
            BrandField::Classification => &mut self.classification_label,
            BrandField::New => &mut self.new_label,
            BrandField::Legacy => &mut self.label,
        }
    }

    /// The field that currently holds the brand, and where writes land.
    ///
    /// First non-empty field wins. With no brand set, an existing
    /// `classification_label` or `new_label` key is reused; otherwise the
    /// brand goes to `new_label`.
    pub fn authoritative_field(&self) -> BrandField {
        if let Some(field) = BrandField::all()
            .iter()
            .copied()
            .find(|field| self.brand_slot(*field).as_deref().is_some_and(|s| !s.is_empty()))
        {
            return field;
        }

        if self.classification_label.is_some() {
            BrandField::Classification
        } else {
            BrandField::New
        }
    }

    /// Resolved brand label, or `""` when the shoe is unlabelled.
    pub fn read_brand(&self) -> &str {
        self.brand_slot(self.authoritative_field())
            .as_deref()
            .unwrap_or("")
    }

    /// Write the brand to the authoritative field.
    pub fn write_brand(&mut self, brand: &str) {
        let field = self.authoritative_field();
        self.write_brand_to(field, brand);
    }

    /// Write the brand to a specific field.
    pub fn write_brand_to(&mut self, field: BrandField, brand: &str) {
        *self.brand_slot_mut(field) = Some(brand.to_string());
    }

    /// Set every brand field present on the shoe to `""`.
    pub fn clear_brands(&mut self) {
        for field in BrandField::all() {
            if let Some(value) = self.brand_slot_mut(*field) {
                value.clear();
            }
        }
    }
}
