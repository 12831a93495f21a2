//! Selection model.
//!
//! The selection is an (anchor, active) pair of character offsets kept
//! outside the buffer. Direction matters: `start` is the anchor the gesture
//! began at and `end` is the actively moving edge, and `start > end` is a
//! legal state while dragging backwards. A collapsed pair (`start == end`)
//! is the plain caret.
//!
//! Writes clamp both offsets into `[0, len]` and yield exactly one
//! [`SelectionChange`] per logical update even though two offsets move.

use crate::buffer::TextEdit;

/// Notification payload for one logical selection update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChange {
    /// Anchor offset before the update.
    pub old_start: usize,
    /// Active offset before the update.
    pub old_end: usize,
    /// Anchor offset after the update.
    pub new_start: usize,
    /// Active offset after the update.
    pub new_end: usize,
}

impl SelectionChange {
    /// Whether the active edge moved. The cached caret-highlight region is
    /// only valid while the active edge stays put.
    pub fn end_moved(&self) -> bool {
        self.old_end != self.new_end
    }
}

/// Anchor/active selection offsets, clamped to the buffer on every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    anchor: usize,
    active: usize,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            anchor: 0,
            active: 0,
        }
    }
}

impl Selection {
    /// Creates a collapsed selection at offset 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The anchor offset (where the selection gesture began).
    pub fn start(&self) -> usize {
        self.anchor
    }

    /// The active offset (the moving edge; the caret when collapsed).
    pub fn end(&self) -> usize {
        self.active
    }

    /// The smaller of the two offsets.
    pub fn min(&self) -> usize {
        self.anchor.min(self.active)
    }

    /// The larger of the two offsets.
    pub fn max(&self) -> usize {
        self.anchor.max(self.active)
    }

    /// Whether the selection is a plain caret.
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.active
    }

    /// Sets the selection, clamping both offsets into `[0, len]`.
    ///
    /// Returns `None` when the clamped pair equals the current one, so a
    /// redundant write never produces a notification.
    pub fn set(&mut self, start: usize, end: usize, len: usize) -> Option<SelectionChange> {
        let new_start = start.min(len);
        let new_end = end.min(len);
        if new_start == self.anchor && new_end == self.active {
            return None;
        }
        let change = SelectionChange {
            old_start: self.anchor,
            old_end: self.active,
            new_start,
            new_end,
        };
        self.anchor = new_start;
        self.active = new_end;
        Some(change)
    }

    /// Collapses the selection to a caret at `offset`.
    pub fn collapse(&mut self, offset: usize, len: usize) -> Option<SelectionChange> {
        self.set(offset, offset, len)
    }

    /// Re-clamps both offsets after the buffer shrank underneath them.
    pub fn reclamp(&mut self, len: usize) -> Option<SelectionChange> {
        self.set(self.anchor, self.active, len)
    }

    /// Moves both offsets across a buffer mutation.
    ///
    /// Offsets past the edited range shift with it; offsets inside the
    /// removed range land at the end of the inserted text. This keeps the
    /// caret where a user expects it after an IME replaces nearby text.
    pub fn adjust_for_edit(&mut self, edit: &TextEdit, len: usize) -> Option<SelectionChange> {
        self.set(edit.map_offset(self.anchor), edit.map_offset(self.active), len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_clamps_into_bounds() {
        let mut selection = Selection::new();
        let change = selection.set(3, 99, 10).unwrap();
        assert_eq!((change.new_start, change.new_end), (3, 10));
        assert_eq!((selection.start(), selection.end()), (3, 10));
    }

    #[test]
    fn test_round_trip_after_clamp() {
        let mut selection = Selection::new();
        selection.set(2, 7, 20);
        assert_eq!((selection.start(), selection.end()), (2, 7));
        // Redundant write is silent.
        assert!(selection.set(2, 7, 20).is_none());
    }

    #[test]
    fn test_direction_is_preserved() {
        let mut selection = Selection::new();
        selection.set(8, 3, 10);
        assert_eq!(selection.start(), 8);
        assert_eq!(selection.end(), 3);
        assert_eq!(selection.min(), 3);
        assert_eq!(selection.max(), 8);
        assert!(!selection.is_collapsed());
    }

    #[test]
    fn test_change_carries_old_and_new() {
        let mut selection = Selection::new();
        selection.set(1, 4, 10);
        let change = selection.set(2, 2, 10).unwrap();
        assert_eq!(
            change,
            SelectionChange {
                old_start: 1,
                old_end: 4,
                new_start: 2,
                new_end: 2
            }
        );
        assert!(change.end_moved());
    }

    #[test]
    fn test_reclamp_after_shrink() {
        let mut selection = Selection::new();
        selection.set(5, 9, 10);
        let change = selection.reclamp(6).unwrap();
        assert_eq!((change.new_start, change.new_end), (5, 6));
        assert!(selection.reclamp(6).is_none());
    }

    #[test]
    fn test_adjust_for_edit_shifts_caret() {
        let mut selection = Selection::new();
        selection.collapse(8, 10);
        // Two characters inserted at offset 2.
        let edit = TextEdit {
            start: 2,
            removed: 0,
            inserted: 2,
        };
        selection.adjust_for_edit(&edit, 12);
        assert_eq!((selection.start(), selection.end()), (10, 10));
    }

    #[test]
    fn test_adjust_for_edit_inside_removed_range() {
        let mut selection = Selection::new();
        selection.collapse(5, 10);
        // Characters 3..8 replaced by one character.
        let edit = TextEdit {
            start: 3,
            removed: 5,
            inserted: 1,
        };
        selection.adjust_for_edit(&edit, 6);
        assert_eq!((selection.start(), selection.end()), (4, 4));
    }
}
