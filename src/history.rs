//! Snapshot-based undo log over the annotation store.
//!
//! ```text
//! commit x3          [s0, s1, s2, s3]  index 3
//! undo x2            [s0, s1, s2, s3]  index 1   store = s1
//! commit             [s0, s1, s4]      index 2   (s2, s3 discarded)
//! ```
//!
//! Entry 0 is always the empty initial state. There is no redo: a commit
//! made behind the end of the log drops every later entry.

use crate::annotation::AnnotationSet;
use crate::store::AnnotationStore;
use log::debug;
use std::sync::Arc;

#[derive(Debug)]
pub struct HistoryLog {
    entries: Vec<Arc<AnnotationSet>>,
    index: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryLog {
    pub fn new() -> Self {
        Self {
            entries: vec![Arc::new(AnnotationSet::default())],
            index: 0,
        }
    }

    /// Snapshot the store after a finished user action.
    pub fn commit(&mut self, store: &AnnotationStore) {
        self.entries.truncate(self.index + 1);
        self.entries.push(Arc::new(store.snapshot()));
        self.index = self.entries.len() - 1;
        debug!("history commit -> entry {}", self.index);
    }

    /// Step back one entry and restore it into the store.
    ///
    /// Returns false (and leaves the store alone) at the initial entry.
    pub fn undo(&mut self, store: &mut AnnotationStore) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        store.restore(self.entries[self.index].as_ref().clone());
        debug!("history undo -> entry {}", self.index);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &AnnotationSet {
        &self.entries[self.index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Only the initial empty entry is left.
    pub fn is_initial(&self) -> bool {
        self.entries.len() == 1
    }

    /// Back to the single empty entry, used when the document is removed.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::TextStyle;
    use crate::geometry::Point;

    fn add(store: &mut AnnotationStore, history: &mut HistoryLog, text: &str) {
        store.add_text(text, Point::default(), 1, TextStyle::default());
        history.commit(store);
    }

    #[test]
    fn starts_with_empty_entry() {
        let history = HistoryLog::new();
        assert_eq!(history.len(), 1);
        assert_eq!(history.current_index(), 0);
        assert!(history.current().is_empty());
        assert!(!history.can_undo());
    }

    #[test]
    fn undo_walks_back_to_empty() {
        let mut store = AnnotationStore::default();
        let mut history = HistoryLog::new();
        add(&mut store, &mut history, "a");
        add(&mut store, &mut history, "b");

        assert!(history.undo(&mut store));
        assert_eq!(store.len(), 1);
        assert!(history.undo(&mut store));
        assert!(store.is_empty());
        assert!(!history.undo(&mut store));
        assert!(store.is_empty());
    }

    #[test]
    fn commit_after_undo_discards_future() {
        let mut store = AnnotationStore::default();
        let mut history = HistoryLog::new();
        add(&mut store, &mut history, "a");
        add(&mut store, &mut history, "b");
        add(&mut store, &mut history, "c");

        history.undo(&mut store);
        history.undo(&mut store);
        add(&mut store, &mut history, "d");

        assert_eq!(history.len(), 3);
        assert_eq!(history.current_index(), 2);
        let contents: Vec<_> = store.texts().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["a", "d"]);
    }

    #[test]
    fn entries_are_isolated_from_later_edits() {
        let mut store = AnnotationStore::default();
        let mut history = HistoryLog::new();
        add(&mut store, &mut history, "a");
        let id = store.texts()[0].id;
        store
            .update_position(
                id,
                Point::new(40.0, 40.0),
                crate::geometry::Size::new(600.0, 800.0),
            )
            .unwrap();
        assert_eq!(history.current().texts[0].position, Point::default());
    }

    #[test]
    fn reset_forgets_everything() {
        let mut store = AnnotationStore::default();
        let mut history = HistoryLog::new();
        add(&mut store, &mut history, "a");
        history.reset();
        assert!(history.is_initial());
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
    }
}
