//! Layout oracle contract.
//!
//! The widget core never shapes or measures text itself. A [`TextLayout`]
//! implementation is produced by the host's text pipeline for the current
//! buffer contents and wrap width, and the core only asks it line/offset/
//! coordinate questions. All offsets are character offsets into the buffer;
//! all coordinates are content-relative physical pixels (scrolling is applied
//! by the widget, not by the layout).

use smallvec::SmallVec;
use textarea_foundation::{Px, PxRect};

/// Highlight geometry for a caret or selection, one rectangle per line.
pub type RegionRects = SmallVec<[PxRect; 4]>;

/// Line/offset/coordinate queries answered by the host's text layout.
///
/// Implementations must answer for every offset in `[0, buffer.len()]` and
/// every line in `[0, line_count())`; the widget clamps its inputs before
/// asking. Queries are pure functions of (buffer contents, wrap width).
pub trait TextLayout {
    /// Number of visual lines. At least 1, even for an empty buffer.
    fn line_count(&self) -> usize;

    /// Visual line containing the character at `offset`.
    fn line_for_offset(&self, offset: usize) -> usize;

    /// Visual line at the vertical coordinate `y`.
    fn line_for_vertical(&self, y: Px) -> usize;

    /// Top edge of `line`.
    fn line_top(&self, line: usize) -> Px;

    /// Bottom edge of `line`.
    fn line_bottom(&self, line: usize) -> Px;

    /// Left edge of the text on `line`.
    fn line_left(&self, line: usize) -> Px;

    /// Right edge of the text on `line`.
    fn line_right(&self, line: usize) -> Px;

    /// Horizontal caret position for the character at `offset`.
    fn primary_horizontal(&self, offset: usize) -> Px;

    /// Character offset closest to `x` on `line`.
    fn offset_for_horizontal(&self, line: usize, x: Px) -> usize;

    /// Whether the character run at `offset` is right-to-left.
    fn is_rtl_at(&self, offset: usize) -> bool;

    /// Total height of the laid-out text.
    fn height(&self) -> Px;

    /// Caret rectangle for a collapsed selection at `offset`.
    fn cursor_region(&self, offset: usize, caret_width: Px) -> PxRect {
        let line = self.line_for_offset(offset);
        let x = self.primary_horizontal(offset);
        let top = self.line_top(line);
        PxRect::new(x, top, caret_width, self.line_bottom(line) - top)
    }

    /// Highlight rectangles for the selection `[start, end)`.
    ///
    /// Offsets may arrive in either order. A collapsed range yields no
    /// rectangles. Spanning multiple lines produces one full recomputation
    /// of the per-line rects rather than a single bounding rectangle.
    fn selection_region(&self, start: usize, end: usize) -> RegionRects {
        let mut rects = RegionRects::new();
        if start == end {
            return rects;
        }
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };

        let first_line = self.line_for_offset(lo);
        let last_line = self.line_for_offset(hi);
        for line in first_line..=last_line {
            let left = if line == first_line {
                self.primary_horizontal(lo)
            } else {
                self.line_left(line)
            };
            let right = if line == last_line {
                self.primary_horizontal(hi)
            } else {
                self.line_right(line)
            };
            let top = self.line_top(line);
            let rect = PxRect::from_edges(left.min(right), top, left.max(right), self.line_bottom(line));
            if !rect.is_empty() {
                rects.push(rect);
            }
        }
        rects
    }
}

/// Fixed-pitch layout fixture: `cols` characters per line, every glyph cell
/// is `cell_width` x `cell_height`. Stands in for the host's layout in tests.
#[cfg(test)]
pub(crate) struct GridLayout {
    pub len: usize,
    pub cols: usize,
    pub cell_width: Px,
    pub cell_height: Px,
}

#[cfg(test)]
impl GridLayout {
    pub fn new(len: usize, cols: usize) -> Self {
        Self {
            len,
            cols,
            cell_width: Px(10),
            cell_height: Px(20),
        }
    }

    fn chars_on(&self, line: usize) -> usize {
        let start = line * self.cols;
        self.len.saturating_sub(start).min(self.cols)
    }
}

#[cfg(test)]
impl TextLayout for GridLayout {
    fn line_count(&self) -> usize {
        self.len / self.cols + 1
    }

    fn line_for_offset(&self, offset: usize) -> usize {
        (offset.min(self.len) / self.cols).min(self.line_count() - 1)
    }

    fn line_for_vertical(&self, y: Px) -> usize {
        let line = (y.raw().max(0) / self.cell_height.raw()) as usize;
        line.min(self.line_count() - 1)
    }

    fn line_top(&self, line: usize) -> Px {
        self.cell_height * line as i32
    }

    fn line_bottom(&self, line: usize) -> Px {
        self.cell_height * (line as i32 + 1)
    }

    fn line_left(&self, _line: usize) -> Px {
        Px::ZERO
    }

    fn line_right(&self, line: usize) -> Px {
        self.cell_width * self.chars_on(line) as i32
    }

    fn primary_horizontal(&self, offset: usize) -> Px {
        let offset = offset.min(self.len);
        self.cell_width * (offset - self.line_for_offset(offset) * self.cols) as i32
    }

    fn offset_for_horizontal(&self, line: usize, x: Px) -> usize {
        let line = line.min(self.line_count() - 1);
        let col = ((x.raw().max(0) + self.cell_width.raw() / 2) / self.cell_width.raw()) as usize;
        (line * self.cols + col.min(self.chars_on(line))).min(self.len)
    }

    fn is_rtl_at(&self, _offset: usize) -> bool {
        false
    }

    fn height(&self) -> Px {
        self.cell_height * self.line_count() as i32
    }
}
