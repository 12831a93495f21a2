//! Mutable text buffer with an explicit composition annotation.
//!
//! All offsets are character offsets in `[0, len]`. Out-of-range or reversed
//! ranges are clamped and normalized rather than rejected, because raw
//! gesture coordinates and racing IME calls routinely produce them.
//!
//! The selection deliberately does *not* live in the buffer: every mutation
//! returns a [`TextEdit`] report and the widget re-clamps its selection from
//! that, so there is no hidden observable-span machinery. The IME composition
//! range stays here because `remove_composing_spans` is part of the
//! buffer-facing IME contract.

use unicode_segmentation::UnicodeSegmentation;

/// Report of one buffer mutation: `removed` characters starting at `start`
/// were replaced by `inserted` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    /// Character offset the mutation starts at.
    pub start: usize,
    /// Number of characters removed.
    pub removed: usize,
    /// Number of characters inserted.
    pub inserted: usize,
}

impl TextEdit {
    /// Net change in buffer length.
    pub fn delta(&self) -> isize {
        self.inserted as isize - self.removed as isize
    }

    /// Maps a point offset across this edit.
    ///
    /// Offsets past the removed range shift by the edit delta; offsets inside
    /// it move to the end of the inserted text. This is the single rule every
    /// annotation in the widget uses, so nothing can end up dangling.
    pub fn map_offset(&self, offset: usize) -> usize {
        if offset <= self.start {
            offset
        } else if offset >= self.start + self.removed {
            (offset as isize + self.delta()) as usize
        } else {
            self.start + self.inserted
        }
    }
}

/// Mutable character sequence plus the IME composition annotation.
#[derive(Debug, Default, Clone)]
pub struct TextBuffer {
    text: String,
    char_len: usize,
    composing: Option<(usize, usize)>,
}

impl TextBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer holding `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            char_len: text.chars().count(),
            composing: None,
        }
    }

    /// Buffer length in characters.
    pub fn len(&self) -> usize {
        self.char_len
    }

    /// Returns `true` when the buffer holds no text.
    pub fn is_empty(&self) -> bool {
        self.char_len == 0
    }

    /// The full text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Clamps a character offset into `[0, len]`.
    pub fn clamp_offset(&self, offset: usize) -> usize {
        offset.min(self.char_len)
    }

    /// Snaps `offset` to the nearest grapheme-cluster boundary at or before
    /// it, so a caret produced by coordinate hit-testing can never land
    /// inside a combining sequence.
    pub fn snap_to_grapheme(&self, offset: usize) -> usize {
        let offset = self.clamp_offset(offset);
        let byte = self.byte_of(offset);
        let mut snapped = 0;
        for (start, grapheme) in self.text.grapheme_indices(true) {
            if start > byte {
                break;
            }
            if start + grapheme.len() <= byte {
                snapped += grapheme.chars().count();
            } else {
                // Offset falls inside this cluster; keep its start.
                break;
            }
        }
        snapped
    }

    /// Replaces the characters in `[start, end)` with `text` and reports the
    /// mutation. Offsets are clamped and a reversed range is normalized.
    pub fn replace(&mut self, start: usize, end: usize, text: &str) -> TextEdit {
        let a = self.clamp_offset(start);
        let b = self.clamp_offset(end);
        let (start, end) = if a <= b { (a, b) } else { (b, a) };

        let byte_start = self.byte_of(start);
        let byte_end = self.byte_of(end);
        self.text.replace_range(byte_start..byte_end, text);

        let edit = TextEdit {
            start,
            removed: end - start,
            inserted: text.chars().count(),
        };
        self.char_len = (self.char_len as isize + edit.delta()) as usize;
        self.clamp_composing(&edit);
        edit
    }

    /// Inserts `text` at `offset`.
    pub fn insert(&mut self, offset: usize, text: &str) -> TextEdit {
        self.replace(offset, offset, text)
    }

    /// Deletes the characters in `[start, end)`.
    pub fn delete(&mut self, start: usize, end: usize) -> TextEdit {
        self.replace(start, end, "")
    }

    /// Marks `[start, end)` as the pending IME composition. A collapsed or
    /// fully clamped-away range clears the annotation instead.
    pub fn set_composing_span(&mut self, start: usize, end: usize) {
        let a = self.clamp_offset(start);
        let b = self.clamp_offset(end);
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        self.composing = (start < end).then_some((start, end));
    }

    /// Removes any pending IME composition annotation.
    pub fn remove_composing_spans(&mut self) {
        self.composing = None;
    }

    /// The pending IME composition range, if any.
    pub fn composing_span(&self) -> Option<(usize, usize)> {
        self.composing
    }

    /// Extracts the text in `[start, end)` (clamped, normalized).
    pub fn slice(&self, start: usize, end: usize) -> &str {
        let a = self.clamp_offset(start);
        let b = self.clamp_offset(end);
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        &self.text[self.byte_of(start)..self.byte_of(end)]
    }

    // Re-clamps the composition annotation after a mutation. Both endpoints
    // map through the edit; a span that collapses is dropped.
    fn clamp_composing(&mut self, edit: &TextEdit) {
        if let Some((start, end)) = self.composing {
            let start = edit.map_offset(start).min(self.char_len);
            let end = edit.map_offset(end).min(self.char_len);
            self.composing = (start < end).then_some((start, end));
        }
    }

    fn byte_of(&self, char_offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_offset)
            .map(|(byte, _)| byte)
            .unwrap_or(self.text.len())
    }
}
