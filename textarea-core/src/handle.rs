//! Draggable caret and selection handles.
//!
//! A handle is a floating affordance anchored below a buffer offset. The
//! three kinds form a closed set: the insertion handle under a collapsed
//! caret, and a start/end pair bracketing a selection. They differ only in
//! which selection edge they control and where their hotspot sits on the
//! artwork, so the kind is a plain enum dispatched by match.
//!
//! Dragging does not track the pointer 1:1 vertically. The finger covers the
//! caret it is placing, so the drag aims for an ideal vertical offset below
//! the touch point and approaches it monotonically: each move clamps the new
//! vertical offset between the previous one and the ideal. The pointer never
//! overshoots past where it already was, which keeps the handle steady under
//! a wobbling finger.

use std::time::Duration;

use textarea_foundation::{Px, PxPosition};

use crate::touch_filter::TouchUpFilter;

/// Fraction of the handle height the touch point sits above the anchor.
const TOUCH_OFFSET_RATIO: f32 = -0.3;

/// Fraction of the handle height the drag aims to keep between finger and
/// caret line.
const IDEAL_OFFSET_RATIO: f32 = 0.7;

/// Which selection edge a handle controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// Single handle under a collapsed caret.
    Insertion,
    /// Handle at the selection start edge.
    SelectionStart,
    /// Handle at the selection end edge.
    SelectionEnd,
}

impl HandleKind {
    /// Horizontal hotspot of the handle artwork, measured from its left
    /// edge. Selection handles lean toward the selected text, so the pair
    /// mirrors when the run at the edge is right-to-left.
    pub fn hotspot_x(&self, width: Px, is_rtl_run: bool) -> Px {
        let w = width.raw();
        let x = match self {
            HandleKind::Insertion => w / 2,
            HandleKind::SelectionStart => {
                if is_rtl_run {
                    w / 4
                } else {
                    w * 3 / 4
                }
            }
            HandleKind::SelectionEnd => {
                if is_rtl_run {
                    w * 3 / 4
                } else {
                    w / 4
                }
            }
        };
        Px(x)
    }
}

/// Dimensions of the handle artwork the host will draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleMetrics {
    /// Artwork width.
    pub width: Px,
    /// Artwork height.
    pub height: Px,
}

impl HandleMetrics {
    /// Vertical distance from the touch point to the anchored line bottom.
    pub fn touch_offset_y(&self) -> f32 {
        TOUCH_OFFSET_RATIO * self.height.to_f32()
    }

    /// Vertical offset the hysteresis converges toward.
    pub fn ideal_vertical_offset(&self) -> f32 {
        IDEAL_OFFSET_RATIO * self.height.to_f32()
    }
}

/// One on-screen handle: drag state, anchored position, and the jitter
/// filter fed while dragging.
#[derive(Debug)]
pub struct Handle {
    kind: HandleKind,
    metrics: HandleMetrics,
    hotspot_x: Px,
    dragging: bool,
    showing: bool,
    position: PxPosition,
    position_changed: bool,
    previous_offset: Option<usize>,
    last_parent: PxPosition,
    touch_to_window: (f32, f32),
    filter: TouchUpFilter,
}

impl Handle {
    /// Creates a hidden, idle handle.
    pub fn new(kind: HandleKind, metrics: HandleMetrics, is_rtl_run: bool) -> Self {
        Self {
            kind,
            metrics,
            hotspot_x: kind.hotspot_x(metrics.width, is_rtl_run),
            dragging: false,
            showing: false,
            position: PxPosition::ZERO,
            position_changed: false,
            previous_offset: None,
            last_parent: PxPosition::ZERO,
            touch_to_window: (0.0, 0.0),
            filter: TouchUpFilter::new(),
        }
    }

    /// The selection edge this handle controls.
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Rebinds the handle to a different selection edge. Used when a drag
    /// crosses its peer and the pair swaps edges mid-gesture.
    pub fn retarget(&mut self, kind: HandleKind, is_rtl_run: bool) {
        if self.kind != kind {
            self.kind = kind;
            self.hotspot_x = kind.hotspot_x(self.metrics.width, is_rtl_run);
            self.position_changed = true;
        }
    }

    /// Horizontal hotspot for the current text direction.
    pub fn hotspot_x(&self) -> Px {
        self.hotspot_x
    }

    /// Whether a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Whether the host is currently showing this handle.
    pub fn is_showing(&self) -> bool {
        self.showing
    }

    /// Records that the host showed or dismissed the handle.
    pub fn set_showing(&mut self, showing: bool) {
        self.showing = showing;
    }

    /// Content-relative anchor position last computed for this handle.
    pub fn position(&self) -> PxPosition {
        self.position
    }

    /// Moves the anchor and marks the position dirty when it changed.
    pub fn set_position(&mut self, position: PxPosition) {
        if position != self.position {
            self.position = position;
            self.position_changed = true;
        }
    }

    /// Consumes the position-dirty flag.
    pub fn take_position_changed(&mut self) -> bool {
        std::mem::take(&mut self.position_changed)
    }

    /// Buffer offset the handle was last anchored at.
    pub fn previous_offset(&self) -> Option<usize> {
        self.previous_offset
    }

    /// Records the offset the handle is now anchored at.
    pub fn set_previous_offset(&mut self, offset: usize) {
        self.previous_offset = Some(offset);
    }

    /// Begins a drag at the raw pointer position `(raw_x, raw_y)` in window
    /// coordinates, with the widget currently at `parent` in the window.
    pub fn press(
        &mut self,
        raw_x: f32,
        raw_y: f32,
        current_offset: usize,
        parent: PxPosition,
        now: Duration,
    ) {
        self.filter.start(current_offset, now);
        self.touch_to_window = (
            raw_x - self.position.x.to_f32(),
            raw_y - self.position.y.to_f32(),
        );
        self.last_parent = parent;
        self.dragging = true;
    }

    /// Converts a raw pointer move into the content position to hit-test,
    /// applying vertical hysteresis.
    pub fn drag_target(&mut self, raw_x: f32, raw_y: f32) -> PxPosition {
        let ideal = self.metrics.ideal_vertical_offset();
        let previous = self.touch_to_window.1 - self.last_parent.y.to_f32();
        let current = raw_y - self.position.y.to_f32() - self.last_parent.y.to_f32();
        let adjusted = if previous < ideal {
            current.min(ideal).max(previous)
        } else {
            current.max(ideal).min(previous)
        };
        self.touch_to_window.1 = adjusted + self.last_parent.y.to_f32();

        PxPosition::new(
            Px::from_f32(raw_x - self.touch_to_window.0) + self.hotspot_x,
            Px::from_f32(raw_y - self.touch_to_window.1 + self.metrics.touch_offset_y()),
        )
    }

    /// Appends a drag sample for release-time jitter filtering.
    pub fn record_sample(&mut self, offset: usize, now: Duration) {
        self.filter.push(offset, now);
    }

    /// Ends the drag. Returns the corrected offset when the sample history
    /// shows the release movement was jitter.
    pub fn release(&mut self, now: Duration) -> Option<usize> {
        self.dragging = false;
        self.filter.resolve(now)
    }

    /// Aborts the drag without jitter resolution.
    pub fn cancel(&mut self) {
        self.dragging = false;
    }

    /// Keeps an in-progress drag anchored when the widget itself moved in
    /// the window (the containing scroll view scrolled under the finger).
    pub fn parent_moved(&mut self, parent: PxPosition) {
        if self.dragging && parent != self.last_parent {
            let delta = parent - self.last_parent;
            self.touch_to_window.0 += delta.x.to_f32();
            self.touch_to_window.1 += delta.y.to_f32();
            self.last_parent = parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> HandleMetrics {
        HandleMetrics {
            width: Px(40),
            height: Px(40),
        }
    }

    #[test]
    fn test_hotspots_mirror_for_rtl() {
        let width = Px(40);
        assert_eq!(HandleKind::Insertion.hotspot_x(width, false), Px(20));
        assert_eq!(HandleKind::SelectionStart.hotspot_x(width, false), Px(30));
        assert_eq!(HandleKind::SelectionEnd.hotspot_x(width, false), Px(10));
        assert_eq!(HandleKind::SelectionStart.hotspot_x(width, true), Px(10));
        assert_eq!(HandleKind::SelectionEnd.hotspot_x(width, true), Px(30));
    }

    #[test]
    fn test_press_release_round_trip() {
        let mut handle = Handle::new(HandleKind::Insertion, metrics(), false);
        handle.press(100.0, 100.0, 5, PxPosition::ZERO, Duration::from_millis(0));
        assert!(handle.is_dragging());
        handle.record_sample(9, Duration::from_millis(400));
        // Same vector as the filter test: the lift-off movement is jitter.
        assert_eq!(handle.release(Duration::from_millis(420)), Some(5));
        assert!(!handle.is_dragging());
    }

    #[test]
    fn test_cancel_skips_resolution() {
        let mut handle = Handle::new(HandleKind::SelectionEnd, metrics(), false);
        handle.press(0.0, 0.0, 2, PxPosition::ZERO, Duration::from_millis(0));
        handle.cancel();
        assert!(!handle.is_dragging());
    }

    #[test]
    fn test_hysteresis_bounded_overshoot() {
        let mut handle = Handle::new(HandleKind::Insertion, metrics(), false);
        handle.set_position(PxPosition::new(Px(0), Px(100)));
        handle.press(0.0, 110.0, 0, PxPosition::ZERO, Duration::ZERO);
        let ideal = metrics().ideal_vertical_offset();

        // Wobble the pointer across the ideal boundary. The effective
        // vertical offset must stay within [min(prev, current), max(prev,
        // current)] at every step.
        let mut previous = handle.touch_to_window.1;
        for raw_y in [150.0, 105.0, 140.0, 128.0, 135.0, 120.0] {
            handle.drag_target(0.0, raw_y);
            let current = raw_y - handle.position.y.to_f32();
            let adjusted = handle.touch_to_window.1;
            assert!(adjusted >= previous.min(current) - 1e-3);
            assert!(adjusted <= previous.max(current) + 1e-3);
            previous = adjusted;
        }
        // The offset converges toward, and never past, the ideal value.
        assert!((handle.touch_to_window.1 - ideal).abs() <= ideal);
    }

    #[test]
    fn test_drag_target_applies_hotspot_and_touch_offset() {
        let mut handle = Handle::new(HandleKind::Insertion, metrics(), false);
        handle.set_position(PxPosition::new(Px(50), Px(100)));
        handle.press(70.0, 112.0, 0, PxPosition::ZERO, Duration::ZERO);
        // Pointer has not moved: x maps back to the hotspot over the anchor.
        let target = handle.drag_target(70.0, 112.0);
        assert_eq!(target.x, Px(50) + handle.hotspot_x());
    }

    #[test]
    fn test_parent_moved_keeps_drag_anchored() {
        let mut handle = Handle::new(HandleKind::SelectionStart, metrics(), false);
        handle.set_position(PxPosition::new(Px(50), Px(100)));
        handle.press(70.0, 112.0, 0, PxPosition::ZERO, Duration::ZERO);
        let before = handle.drag_target(70.0, 112.0);

        // The widget moved 10px up in the window. The touch-to-window
        // offsets absorb the shift, so an unmoved finger keeps hitting the
        // same content point instead of jumping with the widget.
        handle.parent_moved(PxPosition::new(Px(0), Px(-10)));
        let after = handle.drag_target(70.0, 112.0);
        assert_eq!(after, before);
    }

    #[test]
    fn test_position_dirty_flag() {
        let mut handle = Handle::new(HandleKind::Insertion, metrics(), false);
        handle.set_position(PxPosition::new(Px(5), Px(5)));
        assert!(handle.take_position_changed());
        assert!(!handle.take_position_changed());
        handle.set_position(PxPosition::new(Px(5), Px(5)));
        assert!(!handle.take_position_changed());
    }
}
