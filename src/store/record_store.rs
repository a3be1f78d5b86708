//! The mutable record collection and its editing operations.

use std::path::Path;

use crate::format::{self, FormatError, SaveTracker};
use crate::index::RecordIndex;
use crate::model::{ConfidenceThresholds, Record};

use super::stats::{DatasetStats, Progress};
use super::undo::{Snapshot, UndoStack};

/// Outcome of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Records that passed the confidence filter
    pub kept: usize,
    /// Records with nothing left after filtering
    pub discarded: usize,
}

/// Outcome of a successful undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoOutcome {
    /// Selection restored from the snapshot
    pub selected: Option<usize>,
}

/// Owns the record collection, the derived [`RecordIndex`] and the undo
/// history.
///
/// Positions are plain indices into the collection and shift when records
/// are removed. Operations given a position that is out of range do nothing;
/// stale selections are normal in interactive use. Every operation that
/// changes records pushes an undo snapshot first and rebuilds the index
/// before returning.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    index: RecordIndex,
    undo: UndoStack,
    selected: Option<usize>,
    save_tracker: SaveTracker,
}

impl RecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Loading and saving
    // ------------------------------------------------------------------

    /// Replace the whole collection with `raw_records`, applying the
    /// confidence filter. Clears undo history and selects the first record.
    pub fn load(&mut self, raw_records: Vec<Record>, thresholds: ConfidenceThresholds) -> LoadSummary {
        let total = raw_records.len();
        self.records = raw_records
            .into_iter()
            .filter_map(|record| record.filtered(&thresholds))
            .collect();

        let summary = LoadSummary {
            kept: self.records.len(),
            discarded: total - self.records.len(),
        };

        self.undo.clear();
        self.selected = if self.records.is_empty() { None } else { Some(0) };
        self.save_tracker.reset();
        self.rebuild_index();

        log::info!(
            "Loaded {} records ({} discarded by thresholds bib={} shoes={})",
            summary.kept,
            summary.discarded,
            thresholds.bib,
            thresholds.shoes
        );
        summary
    }

    /// Read a detection file and [`load`](Self::load) it.
    ///
    /// A file that cannot be read or parsed leaves the store untouched.
    pub fn load_file(
        &mut self,
        path: &Path,
        thresholds: ConfidenceThresholds,
    ) -> Result<LoadSummary, FormatError> {
        let raw = format::read_records(path)?;
        Ok(self.load(raw, thresholds))
    }

    /// Write the collection to `destination`, optionally copying the previous
    /// file to its `.bak` sibling first. In-memory state is unaffected by a
    /// failure.
    pub fn save(&mut self, destination: &Path, make_backup: bool) -> Result<(), FormatError> {
        // No previous file means no backup was written yet.
        let backed_up = make_backup && destination.exists();
        match format::write_records(destination, &self.records, make_backup) {
            Ok(()) => {
                self.save_tracker.mark_saved(backed_up);
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to save {:?}: {}", destination, e);
                self.save_tracker.mark_save_failed();
                Err(e)
            }
        }
    }

    /// Save to the file being reviewed, backing it up on the first save of
    /// the session only.
    pub fn save_in_place(&mut self, path: &Path) -> Result<(), FormatError> {
        let backup = self.save_tracker.needs_backup();
        self.save(path, backup)
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// All records in order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Record at a position.
    pub fn get(&self, position: usize) -> Option<&Record> {
        self.records.get(position)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The derived best-image index.
    pub fn index(&self) -> &RecordIndex {
        &self.index
    }

    /// Unsaved-change state.
    pub fn save_tracker(&self) -> &SaveTracker {
        &self.save_tracker
    }

    /// Mutable unsaved-change state (auto-save settings).
    pub fn save_tracker_mut(&mut self) -> &mut SaveTracker {
        &mut self.save_tracker
    }

    /// Currently selected position.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Select a position. Out-of-range positions are ignored.
    pub fn select(&mut self, position: usize) {
        if position < self.records.len() {
            self.selected = Some(position);
        }
    }

    /// Whether the record at `position` is checked.
    pub fn is_checked(&self, position: usize) -> bool {
        self.records.get(position).is_some_and(|r| r.checked)
    }

    /// Whether any record with this bib number is checked.
    pub fn bib_has_checked(&self, bib_number: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.bib_number == bib_number && r.checked)
    }

    /// Review progress.
    pub fn progress(&self) -> Progress {
        Progress::of(&self.records)
    }

    /// Distinct brands, categories and genders in the collection.
    pub fn collect_stats<S: AsRef<str>>(&self, configured_brands: &[S]) -> DatasetStats {
        DatasetStats::collect(&self.records, configured_brands)
    }

    /// Positions within `radius` of `position`, excluding it; the read-ahead
    /// window for image preloading.
    pub fn nearby_positions(&self, position: usize, radius: usize) -> Vec<usize> {
        let start = position.saturating_sub(radius);
        let end = self.records.len().min(position.saturating_add(radius).saturating_add(1));
        (start..end).filter(|&p| p != position).collect()
    }

    // ------------------------------------------------------------------
    // Undo
    // ------------------------------------------------------------------

    /// Push a snapshot of the current records with the given selection.
    pub fn save_state(&mut self, position: Option<usize>) {
        self.push_snapshot(position, "Save state");
    }

    /// Restore the most recent snapshot. Returns `None` when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> Option<UndoOutcome> {
        let snapshot = self.undo.pop()?;
        self.records = snapshot.records;
        self.selected = snapshot.selected;
        self.rebuild_index();
        self.save_tracker.mark_dirty();
        Some(UndoOutcome {
            selected: self.selected,
        })
    }

    /// Number of snapshots available.
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Description of the change the next undo would revert.
    pub fn undo_description(&self) -> Option<&str> {
        self.undo.undo_description()
    }

    // ------------------------------------------------------------------
    // Field edits
    // ------------------------------------------------------------------

    /// Set bib number, category (when non-empty) and shoe brands.
    ///
    /// One brand labels every shoe; several are assigned round-robin by shoe
    /// index; none clears every brand.
    pub fn update_fields<S: AsRef<str>>(
        &mut self,
        position: usize,
        bib_number: &str,
        category: &str,
        brands: &[S],
    ) {
        if !self.begin_edit(position, "Edit record") {
            return;
        }

        let record = &mut self.records[position];
        record.bib_number = bib_number.to_string();
        if !category.is_empty() {
            record.category = category.to_string();
        }

        for (i, shoe) in record.shoes.iter_mut().enumerate() {
            let field = shoe.authoritative_field();
            shoe.clear_brands();
            if !brands.is_empty() {
                shoe.write_brand_to(field, brands[i % brands.len()].as_ref());
            }
        }

        self.finish_edit();
    }

    /// Set only the bib number.
    pub fn set_bib_number(&mut self, position: usize, bib_number: &str) {
        if !self.begin_edit(position, "Change bib number") {
            return;
        }
        self.records[position].bib_number = bib_number.to_string();
        self.finish_edit();
    }

    /// Set only the category. An empty category is ignored.
    pub fn set_category(&mut self, position: usize, category: &str) {
        if category.is_empty() || !self.begin_edit(position, "Change category") {
            return;
        }
        self.records[position].category = category.to_string();
        self.finish_edit();
    }

    /// Remove one shoe detection from a record.
    pub fn remove_shoe(&mut self, position: usize, shoe_index: usize) {
        let valid = self
            .records
            .get(position)
            .is_some_and(|r| shoe_index < r.shoes.len());
        if !valid || !self.begin_edit(position, "Remove shoe") {
            return;
        }
        self.records[position].shoes.remove(shoe_index);
        self.finish_edit();
    }

    /// Flip the checked flag and return the new state (`false` for an
    /// invalid position).
    pub fn toggle_checked(&mut self, position: usize) -> bool {
        if !self.begin_edit(position, "Toggle checked") {
            return false;
        }
        let record = &mut self.records[position];
        record.checked = !record.checked;
        let checked = record.checked;
        self.finish_edit();
        checked
    }

    /// Make the record at `position` the reference for its bib number.
    ///
    /// The record becomes checked. Every other record with the same bib is
    /// unchecked and takes over its category and shoe brands (index-aligned,
    /// round-robin when the shoe counts differ, cleared when the reference
    /// has no brands). Records without a bib number are left alone.
    pub fn propagate_to_same_bib(&mut self, position: usize) {
        let Some(source) = self.records.get(position) else {
            return;
        };
        if source.bib_number.is_empty() {
            return;
        }

        let bib_number = source.bib_number.clone();
        let category = source.category.clone();
        let brands: Vec<String> = source.brands().into_iter().map(str::to_string).collect();

        if !self.begin_edit(position, "Propagate to same bib") {
            return;
        }

        self.records[position].checked = true;

        for (i, record) in self.records.iter_mut().enumerate() {
            if i == position || record.bib_number != bib_number {
                continue;
            }
            record.checked = false;
            record.category = category.clone();
            for (shoe_index, shoe) in record.shoes.iter_mut().enumerate() {
                if brands.is_empty() {
                    shoe.clear_brands();
                } else {
                    shoe.write_brand(&brands[shoe_index % brands.len()]);
                }
            }
        }

        self.finish_edit();
    }

    // ------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------

    /// Delete one record and return the new selection: the previous record,
    /// else the first remaining one, else nothing. An invalid position leaves
    /// everything as is and returns the current selection.
    pub fn remove(&mut self, position: usize) -> Option<usize> {
        if !self.begin_edit(position, "Remove record") {
            return self.selected;
        }

        self.records.remove(position);
        self.selected = if position > 0 {
            Some(position - 1)
        } else if !self.records.is_empty() {
            Some(0)
        } else {
            None
        };

        self.finish_edit();
        self.selected
    }

    /// Delete every record with this bib number and return the new
    /// selection. Without matches nothing changes and `None` is returned.
    pub fn remove_all_with_bib(&mut self, bib_number: &str) -> Option<usize> {
        let matches: Vec<usize> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.bib_number == bib_number)
            .map(|(i, _)| i)
            .collect();

        let Some(&first) = matches.first() else {
            return None;
        };

        self.push_snapshot(self.selected, "Remove bib");

        let mut new_position = first.saturating_sub(1);
        for &i in matches.iter().rev() {
            self.records.remove(i);
            if i <= new_position {
                new_position = new_position.saturating_sub(1);
            }
        }

        self.selected = if self.records.is_empty() {
            None
        } else {
            Some(new_position.min(self.records.len() - 1))
        };

        log::debug!("Removed {} records with bib {:?}", matches.len(), bib_number);
        self.finish_edit();
        self.selected
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Validate `position`, select it and snapshot the store. Returns
    /// `false` (and does nothing) for an out-of-range position.
    fn begin_edit(&mut self, position: usize, description: &str) -> bool {
        if position >= self.records.len() {
            log::trace!("{}: position {} out of range, ignored", description, position);
            return false;
        }
        self.selected = Some(position);
        self.push_snapshot(Some(position), description);
        true
    }

    fn finish_edit(&mut self) {
        self.rebuild_index();
        self.save_tracker.mark_dirty();
    }

    fn push_snapshot(&mut self, selected: Option<usize>, description: &str) {
        self.undo.push(Snapshot {
            records: self.records.clone(),
            selected,
            description: description.to_string(),
        });
    }

    fn rebuild_index(&mut self) {
        self.index.rebuild(&self.records);
    }
}
