//! Snapshot-based undo for the record store.
//!
//! Every mutating store operation first pushes a full deep copy of the
//! record collection together with the selection at that moment. Undo pops
//! the most recent snapshot and puts it back. The history is bounded; the
//! oldest snapshots are dropped silently.

use std::collections::VecDeque;

use crate::constants::MAX_UNDO_SNAPSHOTS;
use crate::model::Record;

/// Full copy of the store taken before a mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Every record as it was before the mutation
    pub records: Vec<Record>,
    /// Selected position before the mutation
    pub selected: Option<usize>,
    /// What the mutation was, for status display
    pub description: String,
}

/// Configuration for the undo stack
#[derive(Debug, Clone)]
pub struct UndoConfig {
    /// Maximum number of snapshots to keep
    pub max_history: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            max_history: MAX_UNDO_SNAPSHOTS,
        }
    }
}

/// Bounded stack of snapshots, most recent at the back.
#[derive(Debug, Clone, Default)]
pub struct UndoStack {
    snapshots: VecDeque<Snapshot>,
    config: UndoConfig,
}

impl UndoStack {
    /// Create an empty stack with the default depth.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: UndoConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Push a snapshot, dropping the oldest ones beyond the configured depth.
    pub fn push(&mut self, snapshot: Snapshot) {
        log::debug!(
            "Undo: pushed '{}' ({} records)",
            snapshot.description,
            snapshot.records.len()
        );
        self.snapshots.push_back(snapshot);

        while self.snapshots.len() > self.config.max_history {
            self.snapshots.pop_front();
        }
    }

    /// Pop the most recent snapshot.
    pub fn pop(&mut self) -> Option<Snapshot> {
        let snapshot = self.snapshots.pop_back()?;
        log::debug!("Undo: '{}'", snapshot.description);
        Some(snapshot)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.snapshots.is_empty()
    }

    /// Description of the change the next undo would revert
    pub fn undo_description(&self) -> Option<&str> {
        self.snapshots.back().map(|s| s.description.as_str())
    }

    /// Number of snapshots held
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the stack is empty
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.snapshots.clear();
        log::debug!("Undo history cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(tag: &str) -> Snapshot {
        Snapshot {
            records: vec![Record::new(format!("{}.jpg", tag))],
            selected: Some(0),
            description: tag.to_string(),
        }
    }

    #[test]
    fn test_undo_stack_basic() {
        let mut stack = UndoStack::new();
        assert!(!stack.can_undo());
        assert!(stack.pop().is_none());

        stack.push(snapshot("first"));
        stack.push(snapshot("second"));
        assert_eq!(stack.undo_description(), Some("second"));

        assert_eq!(stack.pop().unwrap().description, "second");
        assert_eq!(stack.pop().unwrap().description, "first");
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_max_history_drops_oldest() {
        let mut stack = UndoStack::with_config(UndoConfig { max_history: 3 });

        for i in 0..5 {
            stack.push(snapshot(&i.to_string()));
        }

        assert_eq!(stack.len(), 3);
        assert_eq!(stack.pop().unwrap().description, "4");
        assert_eq!(stack.pop().unwrap().description, "3");
        assert_eq!(stack.pop().unwrap().description, "2");
        assert!(stack.is_empty());
    }

    #[test]
    fn test_default_depth() {
        let mut stack = UndoStack::new();
        for i in 0..(MAX_UNDO_SNAPSHOTS + 7) {
            stack.push(snapshot(&i.to_string()));
        }
        assert_eq!(stack.len(), MAX_UNDO_SNAPSHOTS);
    }

    #[test]
    fn test_clear() {
        let mut stack = UndoStack::new();
        stack.push(snapshot("a"));
        stack.clear();
        assert!(!stack.can_undo());
        assert_eq!(stack.undo_description(), None);
    }
}
