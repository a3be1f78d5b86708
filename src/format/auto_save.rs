//! Unsaved-change tracking for the open record file.
//!
//! Tracks whether the in-memory collection differs from disk, whether the
//! once-per-session backup has been taken, and when an automatic save is
//! due (debounced after the last change, rate-limited between saves).

use std::time::Duration;
use web_time::Instant;

/// Tracks save state for the record file being reviewed.
#[derive(Debug)]
pub struct SaveTracker {
    /// Minimum interval between automatic saves.
    save_interval: Duration,

    /// Quiet period after the last change before an automatic save.
    debounce_delay: Duration,

    last_save: Option<Instant>,
    last_change: Option<Instant>,

    /// Whether automatic saving is enabled.
    auto_save: bool,

    /// In-memory records differ from the file.
    dirty: bool,

    /// The `.bak` copy has been taken for the current file.
    backup_done: bool,
}

impl SaveTracker {
    /// Default minimum interval between automatic saves (60 seconds).
    pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(60);

    /// Default debounce delay (5 seconds).
    pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_secs(5);

    /// Create a tracker with automatic saving disabled.
    pub fn new() -> Self {
        Self {
            save_interval: Self::DEFAULT_SAVE_INTERVAL,
            debounce_delay: Self::DEFAULT_DEBOUNCE_DELAY,
            last_save: None,
            last_change: None,
            auto_save: false,
            dirty: false,
            backup_done: false,
        }
    }

    /// Enable automatic saving.
    pub fn with_auto_save(mut self, enabled: bool) -> Self {
        self.auto_save = enabled;
        self
    }

    /// Set the minimum interval between automatic saves.
    pub fn with_save_interval(mut self, interval: Duration) -> Self {
        self.save_interval = interval;
        self
    }

    /// Set the debounce delay.
    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    /// Record an in-memory change.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.last_change = Some(Instant::now());
        log::trace!("Save tracker: marked dirty");
    }

    /// Whether there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the next save should copy the previous file to `.bak` first.
    pub fn needs_backup(&self) -> bool {
        !self.backup_done
    }

    /// Whether an automatic save is due now.
    pub fn should_auto_save(&self) -> bool {
        if !self.auto_save || !self.dirty {
            return false;
        }

        let Some(last_change) = self.last_change else {
            return false;
        };

        if last_change.elapsed() < self.debounce_delay {
            return false;
        }

        if let Some(last_save) = self.last_save {
            if last_save.elapsed() < self.save_interval {
                return false;
            }
        }

        true
    }

    /// Record a successful save.
    pub fn mark_saved(&mut self, backed_up: bool) {
        self.last_save = Some(Instant::now());
        self.dirty = false;
        self.last_change = None;
        self.backup_done |= backed_up;
        log::trace!("Save tracker: marked saved");
    }

    /// Record a failed save; changes stay pending and the next automatic
    /// attempt waits a full interval.
    pub fn mark_save_failed(&mut self) {
        self.last_save = Some(Instant::now());
        log::trace!("Save tracker: save failed");
    }

    /// Enable or disable automatic saving.
    pub fn set_auto_save(&mut self, enabled: bool) {
        self.auto_save = enabled;
        log::debug!("Auto-save: enabled = {}", enabled);
    }

    /// Start tracking a freshly loaded or newly targeted file.
    pub fn reset(&mut self) {
        self.last_save = None;
        self.last_change = None;
        self.dirty = false;
        self.backup_done = false;
    }
}

impl Default for SaveTracker {
    fn default() -> Self {
        Self::new()
    }
}
