//! The editable text-area widget core.
//!
//! [`TextArea`] owns the buffer, selection, batch-edit coordination, blink
//! state, handles and position fan-out, and wires them together per event.
//! It draws nothing and owns no timers: the host calls in with pointer
//! events, IME calls, focus/screen transitions, the per-frame predraw and
//! due blink deadlines, and the widget answers by mutating its state and
//! issuing [`HostSurface`] requests (invalidate, scroll, handle layers).
//!
//! Nothing here is fatal. Out-of-range offsets clamp, protocol misuse is
//! absorbed, and a missing layout defers the affected operation to the next
//! frame, so the widget stays interactive through transient layout and IME
//! races.

use std::sync::Arc;
use std::time::Duration;

use smallvec::smallvec;
use textarea_foundation::{Px, PxPosition, PxRect, PxSize};
use tracing::{debug, trace, warn};

use crate::batch_edit::{BatchEditState, FinishOutcome, ImeSession};
use crate::blink::{caret_visible, Blink, Clock, BLINK_INTERVAL};
use crate::buffer::{TextBuffer, TextEdit};
use crate::handle::{Handle, HandleKind, HandleMetrics};
use crate::host::HostSurface;
use crate::layout::{RegionRects, TextLayout};
use crate::position::{PositionBroadcaster, PositionUpdate};
use crate::selection::{Selection, SelectionChange};

/// One pointer event delivered to a handle's floating layer.
///
/// `raw_x`/`raw_y` are window coordinates straight from the pointer stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchAction {
    /// Pointer went down on the handle.
    Down {
        /// Pointer x in window coordinates.
        raw_x: f32,
        /// Pointer y in window coordinates.
        raw_y: f32,
    },
    /// Pointer moved while down.
    Move {
        /// Pointer x in window coordinates.
        raw_x: f32,
        /// Pointer y in window coordinates.
        raw_y: f32,
    },
    /// Pointer lifted.
    Up,
    /// Gesture aborted by the platform.
    Cancel,
}

/// Editable text-area widget state machine.
pub struct TextArea {
    buffer: TextBuffer,
    selection: Selection,
    batch: BatchEditState,
    ime_session: ImeSession,
    blink: Blink,
    clock: Arc<dyn Clock>,
    show_cursor_since: Duration,
    cursor_visible: bool,
    focused: bool,
    layout: Option<Arc<dyn TextLayout>>,
    viewport: PxSize,
    scroll: PxPosition,
    caret_width: Px,
    highlight_region: RegionRects,
    highlight_region_bogus: bool,
    broadcaster: PositionBroadcaster,
    insertion_handle: Option<Handle>,
    start_handle: Option<Handle>,
    end_handle: Option<Handle>,
    handle_metrics: HandleMetrics,
    defer_scroll: Option<usize>,
}

impl TextArea {
    /// Creates an empty, unfocused widget.
    pub fn new(clock: Arc<dyn Clock>, handle_metrics: HandleMetrics) -> Self {
        Self {
            buffer: TextBuffer::new(),
            selection: Selection::new(),
            batch: BatchEditState::new(),
            ime_session: ImeSession::new(),
            blink: Blink::new(),
            clock,
            show_cursor_since: Duration::ZERO,
            cursor_visible: true,
            focused: false,
            layout: None,
            viewport: PxSize::ZERO,
            scroll: PxPosition::ZERO,
            caret_width: Px(2),
            highlight_region: RegionRects::new(),
            highlight_region_bogus: true,
            broadcaster: PositionBroadcaster::new(),
            insertion_handle: None,
            start_handle: None,
            end_handle: None,
            handle_metrics,
            defer_scroll: None,
        }
    }

    // --- read accessors ---------------------------------------------------

    /// The buffer contents.
    pub fn text(&self) -> &str {
        self.buffer.as_str()
    }

    /// Buffer length in characters.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` when the buffer holds no text.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The current `(start, end)` selection offsets.
    pub fn selection(&self) -> (usize, usize) {
        (self.selection.start(), self.selection.end())
    }

    /// The current content scroll position.
    pub fn scroll(&self) -> PxPosition {
        self.scroll
    }

    /// Whether an IME batch-edit transaction is open.
    pub fn is_in_batch_edit(&self) -> bool {
        self.batch.is_in_batch()
    }

    /// The pending IME composition range, if any.
    pub fn composing_span(&self) -> Option<(usize, usize)> {
        self.buffer.composing_span()
    }

    // --- text mutation ----------------------------------------------------

    /// Replaces the whole buffer, keeping a clamped cursor.
    pub fn set_text(&mut self, host: &mut dyn HostSurface, text: &str) {
        let len = self.buffer.len();
        let edit = self.buffer.replace(0, len, text);
        self.apply_edit(host, edit);
    }

    /// Replaces the characters in `[start, end)` with `text`.
    pub fn replace(&mut self, host: &mut dyn HostSurface, start: usize, end: usize, text: &str) {
        let edit = self.buffer.replace(start, end, text);
        self.apply_edit(host, edit);
    }

    /// Inserts `text` at `offset`.
    pub fn insert(&mut self, host: &mut dyn HostSurface, offset: usize, text: &str) {
        let edit = self.buffer.insert(offset, text);
        self.apply_edit(host, edit);
    }

    /// Deletes the characters in `[start, end)`.
    pub fn delete(&mut self, host: &mut dyn HostSurface, start: usize, end: usize) {
        let edit = self.buffer.delete(start, end);
        self.apply_edit(host, edit);
    }

    fn apply_edit(&mut self, host: &mut dyn HostSurface, edit: TextEdit) {
        let len = self.buffer.len();
        self.selection.adjust_for_edit(&edit, len);
        self.batch.record_edit(edit.start, edit.removed, edit.inserted);
        self.highlight_region_bogus = true;
        if !self.batch.is_in_batch() {
            self.update_after_edit(host);
        }
    }

    // One visible update per logical content change: invalidate, reset the
    // blink phase, retire stale selection handles, scroll the caret back in.
    fn update_after_edit(&mut self, host: &mut dyn HostSurface) {
        self.batch.take_content_changed();
        host.invalidate_all();
        self.make_blink();
        if self.selection.is_collapsed() {
            self.hide_handle(host, HandleKind::SelectionStart);
            self.hide_handle(host, HandleKind::SelectionEnd);
        }
        let caret = self.selection.end();
        self.bring_offset_into_view(host, caret);
    }

    // --- selection --------------------------------------------------------

    /// Sets the selection, clamping both offsets.
    pub fn set_selection(&mut self, host: &mut dyn HostSurface, start: usize, end: usize) {
        self.commit_selection(host, start, end);
    }

    /// Collapses the selection to a caret at `offset`.
    pub fn collapse_selection(&mut self, host: &mut dyn HostSurface, offset: usize) {
        self.commit_selection(host, offset, offset);
    }

    /// Selects the whole buffer.
    pub fn select_all(&mut self, host: &mut dyn HostSurface) {
        let len = self.buffer.len();
        self.commit_selection(host, 0, len);
    }

    fn commit_selection(&mut self, host: &mut dyn HostSurface, start: usize, end: usize) {
        let len = self.buffer.len();
        if let Some(change) = self.selection.set(start, end, len) {
            self.after_selection_change(host, change);
        }
    }

    fn after_selection_change(&mut self, host: &mut dyn HostSurface, change: SelectionChange) {
        if change.end_moved() || !self.selection.is_collapsed() {
            self.highlight_region_bogus = true;
        }
        if self.batch.is_in_batch() {
            self.batch.record_cursor_change();
        } else {
            let lo = change.old_start.min(change.new_start).min(change.old_end.min(change.new_end));
            let hi = change.old_start.max(change.new_start).max(change.old_end.max(change.new_end));
            self.invalidate_offset_range(host, lo, hi);
            self.make_blink();
        }
    }

    // --- IME bridge -------------------------------------------------------

    /// IME entry into a batch edit. Returns `false` once the connection was
    /// revoked, in which case nothing changes.
    pub fn ime_begin_batch_edit(&mut self) -> bool {
        if self.ime_session.begin() {
            self.batch.begin(self.buffer.len());
            true
        } else {
            false
        }
    }

    /// IME exit from a batch edit. Returns `false` when there is no open
    /// transaction from this connection; never drives nesting negative.
    pub fn ime_end_batch_edit(&mut self, host: &mut dyn HostSurface) -> bool {
        if !self.ime_session.end() {
            return false;
        }
        if let Some(outcome) = self.batch.end() {
            self.finish_batch_edit(host, outcome);
        }
        true
    }

    /// Forced batch reset for focus loss or widget teardown. Idempotent.
    pub fn ensure_ended_batch_edit(&mut self, host: &mut dyn HostSurface) {
        if let Some(outcome) = self.batch.ensure_ended() {
            self.finish_batch_edit(host, outcome);
        }
    }

    /// The platform tore down the IME connection: absorb its late calls.
    pub fn on_ime_connection_closed(&mut self, host: &mut dyn HostSurface) {
        self.ime_session.revoke();
        self.ensure_ended_batch_edit(host);
    }

    /// A fresh IME connection was established.
    pub fn on_ime_connection_opened(&mut self) {
        self.ime_session.rearm();
    }

    fn finish_batch_edit(&mut self, host: &mut dyn HostSurface, outcome: FinishOutcome) {
        match outcome {
            FinishOutcome::Content { changed, delta } => {
                trace!(?changed, delta, "batch edit content update");
                self.update_after_edit(host);
            }
            FinishOutcome::Cursor => {
                self.invalidate_cursor(host);
                self.make_blink();
            }
            FinishOutcome::Quiet => {}
        }
    }

    /// Marks `[start, end)` as the pending IME composition.
    pub fn set_composing_span(&mut self, host: &mut dyn HostSurface, start: usize, end: usize) {
        self.buffer.set_composing_span(start, end);
        self.composition_appearance_changed(host);
    }

    /// Drops the pending IME composition annotation.
    pub fn clear_composing_text(&mut self, host: &mut dyn HostSurface) {
        self.buffer.remove_composing_spans();
        self.composition_appearance_changed(host);
    }

    fn composition_appearance_changed(&mut self, host: &mut dyn HostSurface) {
        if self.batch.is_in_batch() {
            self.batch.record_appearance_change();
        } else {
            host.invalidate_all();
        }
    }

    // --- blink ------------------------------------------------------------

    /// Whether the caret should be blinking at all.
    pub fn should_blink(&self) -> bool {
        self.cursor_visible && self.focused && self.selection.is_collapsed()
    }

    /// Whether the caret is in a visible blink phase right now.
    pub fn is_caret_shown(&self) -> bool {
        self.should_blink() && caret_visible(self.show_cursor_since, self.clock.uptime())
    }

    /// The deadline the host should call [`blink_tick`](Self::blink_tick)
    /// at, if any.
    pub fn next_blink_deadline(&self) -> Option<Duration> {
        self.blink.deadline()
    }

    /// Drives one blink period: repaints the caret and re-arms while
    /// blinking should continue.
    pub fn blink_tick(&mut self, host: &mut dyn HostSurface) {
        let now = self.clock.uptime();
        if !self.blink.take_due(now) {
            return;
        }
        if self.should_blink() {
            self.invalidate_cursor(host);
            self.blink.arm(now + BLINK_INTERVAL);
        }
    }

    /// Screen turned on or off: suspend or resume blinking without losing
    /// the scheduled state.
    pub fn on_screen_state_changed(&mut self, on: bool) {
        if on {
            self.blink.uncancel();
            self.make_blink();
        } else {
            self.blink.cancel();
        }
    }

    /// Shows or hides the caret entirely.
    pub fn set_cursor_visible(&mut self, host: &mut dyn HostSurface, visible: bool) {
        if self.cursor_visible == visible {
            return;
        }
        self.cursor_visible = visible;
        self.make_blink();
        if !visible {
            self.hide_handles(host);
        }
        self.invalidate_cursor(host);
    }

    // Forces the caret visible and re-arms or disarms the tick.
    fn make_blink(&mut self) {
        let now = self.clock.uptime();
        if self.should_blink() {
            self.show_cursor_since = now;
            self.blink.arm(now + BLINK_INTERVAL);
        } else {
            self.blink.disarm();
        }
    }

    // --- focus ------------------------------------------------------------

    /// Whether the widget has input focus.
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Focus transition: resets the blink phase on gain, force-finishes any
    /// open batch and retires the handles on loss.
    pub fn on_focus_changed(&mut self, host: &mut dyn HostSurface, focused: bool) {
        if self.focused == focused {
            return;
        }
        self.focused = focused;
        debug!(focused, "focus changed");
        if focused {
            self.make_blink();
        } else {
            self.ensure_ended_batch_edit(host);
            self.hide_handles(host);
            self.make_blink();
        }
        self.invalidate_cursor(host);
    }

    // --- layout and geometry ----------------------------------------------

    /// Installs (or clears) the layout produced by the host's text pipeline.
    /// A deferred scroll-into-view from a layoutless frame runs now.
    pub fn set_layout(&mut self, host: &mut dyn HostSurface, layout: Option<Arc<dyn TextLayout>>) {
        self.layout = layout;
        self.highlight_region_bogus = true;
        if self.layout.is_some() {
            if let Some(offset) = self.defer_scroll.take() {
                self.bring_offset_into_view(host, offset);
            }
        }
    }

    /// Sets the visible viewport extent.
    pub fn set_viewport(&mut self, viewport: PxSize) {
        self.viewport = viewport;
    }

    /// Hit-tests a viewport-relative position to a grapheme-snapped buffer
    /// offset. `None` while no layout exists.
    pub fn offset_for_position(&self, position: PxPosition) -> Option<usize> {
        let layout = self.layout.as_ref()?;
        let x = position.x.clamp(Px::ZERO, self.viewport.width) + self.scroll.x;
        let y = position.y.clamp(Px::ZERO, self.viewport.height) + self.scroll.y;
        let line = layout.line_for_vertical(y);
        let offset = layout.offset_for_horizontal(line, x);
        Some(self.buffer.snap_to_grapheme(offset))
    }

    /// Scrolls so the character at `offset` is visible, with horizontal
    /// slack so the caret does not hug the viewport edge. Returns whether
    /// the scroll position changed; without a layout the request is deferred
    /// to the next [`set_layout`](Self::set_layout).
    pub fn bring_offset_into_view(&mut self, host: &mut dyn HostSurface, offset: usize) -> bool {
        let Some(layout) = self.layout.clone() else {
            self.defer_scroll = Some(offset);
            return false;
        };
        if self.viewport.width <= Px::ZERO || self.viewport.height <= Px::ZERO {
            self.defer_scroll = Some(offset);
            return false;
        }
        let offset = self.buffer.clamp_offset(offset);
        let line = layout.line_for_offset(offset);
        let top = layout.line_top(line);
        let bottom = layout.line_bottom(line);
        let x = layout
            .primary_horizontal(offset)
            .clamp(layout.line_left(line), layout.line_right(line));

        let hspace = self.viewport.width;
        let vspace = self.viewport.height;
        let hslack = ((bottom - top) / 2).min(hspace / 4);
        let mut scroll = self.scroll;

        let hleft = scroll.x + hslack;
        let hright = scroll.x + hspace - hslack;
        if x < hleft {
            scroll.x = x - hslack;
        } else if x > hright {
            scroll.x = x - (hspace - hslack);
        }
        scroll.x = scroll.x.max(Px::ZERO);

        if bottom - top > vspace {
            scroll.y = top;
        } else if top < scroll.y {
            scroll.y = top;
        } else if bottom > scroll.y + vspace {
            scroll.y = bottom - vspace;
        }
        scroll.y = scroll.y.clamp(Px::ZERO, (layout.height() - vspace).max(Px::ZERO));

        if scroll == self.scroll {
            return false;
        }
        self.scroll = scroll;
        host.scroll_to(scroll);
        self.broadcaster.on_scroll_changed();
        true
    }

    /// Moves the caret to the nearest offset currently inside the viewport.
    /// Returns whether the caret moved; a no-op without a layout.
    pub fn move_cursor_to_visible_offset(&mut self, host: &mut dyn HostSurface) -> bool {
        let Some(layout) = self.layout.clone() else {
            return false;
        };
        let start = self.selection.end();
        let mut line = layout.line_for_offset(self.buffer.clamp_offset(start));
        let top = layout.line_top(line);
        let bottom = layout.line_bottom(line);
        let vspace = self.viewport.height;
        let vslack = ((bottom - top) / 2).min(vspace / 4);

        if top < self.scroll.y + vslack {
            line = layout.line_for_vertical(self.scroll.y + vslack + (bottom - top));
        } else if bottom > self.scroll.y + vspace - vslack {
            line = layout.line_for_vertical(self.scroll.y + vspace - vslack - (bottom - top));
        }

        let left_char = layout.offset_for_horizontal(line, self.scroll.x);
        let right_char = layout.offset_for_horizontal(line, self.scroll.x + self.viewport.width);
        let (low, high) = if left_char <= right_char {
            (left_char, right_char)
        } else {
            (right_char, left_char)
        };
        let target = start.clamp(low, high);
        if target == start {
            return false;
        }
        self.collapse_selection(host, target);
        true
    }

    /// The cached caret/selection highlight geometry, recomputed lazily
    /// after any change that invalidated it.
    pub fn highlight_region(&mut self) -> &RegionRects {
        if self.highlight_region_bogus {
            self.highlight_region = match &self.layout {
                Some(layout) if !self.selection.is_collapsed() => {
                    layout.selection_region(self.selection.min(), self.selection.max())
                }
                Some(layout) => {
                    let offset = self.buffer.clamp_offset(self.selection.end());
                    smallvec![layout.cursor_region(offset, self.caret_width)]
                }
                None => RegionRects::new(),
            };
            self.highlight_region_bogus = false;
        }
        &self.highlight_region
    }

    fn invalidate_cursor(&mut self, host: &mut dyn HostSurface) {
        match &self.layout {
            Some(layout) => {
                let offset = self.buffer.clamp_offset(self.selection.end());
                let mut region = layout.cursor_region(offset, self.caret_width);
                region.x -= self.scroll.x;
                region.y -= self.scroll.y;
                host.invalidate(region);
            }
            None => host.invalidate_all(),
        }
    }

    // Damage for an offset range spans the full viewport width across the
    // covered lines; per-character tight rects are only worth it for the
    // collapsed caret.
    fn invalidate_offset_range(&mut self, host: &mut dyn HostSurface, lo: usize, hi: usize) {
        let Some(layout) = &self.layout else {
            host.invalidate_all();
            return;
        };
        let lo = self.buffer.clamp_offset(lo);
        let hi = self.buffer.clamp_offset(hi);
        let top = layout.line_top(layout.line_for_offset(lo.min(hi)));
        let bottom = layout.line_bottom(layout.line_for_offset(lo.max(hi)));
        host.invalidate(PxRect::from_edges(
            Px::ZERO,
            top - self.scroll.y,
            self.viewport.width,
            bottom - self.scroll.y,
        ));
    }

    // --- gestures ---------------------------------------------------------

    /// Direct tap on the text: place the caret there and surface the
    /// insertion handle when focused.
    pub fn on_tap(&mut self, host: &mut dyn HostSurface, position: PxPosition) {
        let Some(offset) = self.offset_for_position(position) else {
            return;
        };
        self.collapse_selection(host, offset);
        if self.focused && self.cursor_visible {
            self.show_insertion_handle(host);
        }
    }

    /// Shows the insertion handle under the caret.
    pub fn show_insertion_handle(&mut self, host: &mut dyn HostSurface) {
        self.hide_handle(host, HandleKind::SelectionStart);
        self.hide_handle(host, HandleKind::SelectionEnd);
        self.show_handle(host, HandleKind::Insertion);
    }

    /// Shows the selection handle pair. A collapsed selection has no edges
    /// to grab, so this is a no-op until a selection exists.
    pub fn show_selection_handles(&mut self, host: &mut dyn HostSurface) {
        if self.selection.is_collapsed() {
            return;
        }
        self.hide_handle(host, HandleKind::Insertion);
        self.show_handle(host, HandleKind::SelectionStart);
        self.show_handle(host, HandleKind::SelectionEnd);
    }

    /// Dismisses every handle and releases the predraw hook.
    pub fn hide_handles(&mut self, host: &mut dyn HostSurface) {
        self.hide_handle(host, HandleKind::Insertion);
        self.hide_handle(host, HandleKind::SelectionStart);
        self.hide_handle(host, HandleKind::SelectionEnd);
    }

    fn show_handle(&mut self, host: &mut dyn HostSurface, kind: HandleKind) {
        let offset = self.current_cursor_offset(kind);
        let is_rtl = self
            .layout
            .as_ref()
            .map(|layout| layout.is_rtl_at(self.buffer.clamp_offset(offset)))
            .unwrap_or(false);
        let handle_metrics = self.handle_metrics;
        let slot = self.handle_slot_raw(kind);
        if slot.is_none() {
            *slot = Some(Handle::new(kind, handle_metrics, is_rtl));
        }
        match self.broadcaster.subscribe(kind, true) {
            Ok(true) => host.arm_pre_draw(),
            Ok(false) => {}
            Err(error) => {
                warn!(%error, "handle subscription rejected");
                return;
            }
        }
        // A freshly shown handle always re-anchors, even at an unchanged
        // offset.
        self.anchor_handle(host, kind, offset, true);
    }

    fn hide_handle(&mut self, host: &mut dyn HostSurface, kind: HandleKind) {
        let Some(handle) = self.handle_slot_mut(kind) else {
            return;
        };
        handle.cancel();
        if handle.is_showing() {
            handle.set_showing(false);
            host.dismiss_handle(kind);
        }
        if self.broadcaster.unsubscribe(kind) {
            host.release_pre_draw();
        }
    }

    /// Routes one pointer event on a handle layer.
    pub fn on_handle_touch(
        &mut self,
        host: &mut dyn HostSurface,
        kind: HandleKind,
        action: TouchAction,
    ) {
        match action {
            TouchAction::Down { raw_x, raw_y } => {
                let offset = self.current_cursor_offset(kind);
                let parent = self.broadcaster.position();
                let now = self.clock.uptime();
                if let Some(handle) = self.handle_slot_mut(kind) {
                    handle.press(raw_x, raw_y, offset, parent, now);
                    trace!(?kind, offset, "handle drag started");
                }
            }
            TouchAction::Move { raw_x, raw_y } => {
                // After a crossing swap the gesture continues on whichever
                // slot carries the dragging handle, not the layer it began
                // on.
                let Some(kind) = self.dragging_kind() else {
                    return;
                };
                let Some(handle) = self.handle_slot_mut(kind) else {
                    return;
                };
                let target = handle.drag_target(raw_x, raw_y);
                let Some(offset) = self.offset_for_position(target) else {
                    return;
                };
                let now = self.clock.uptime();
                let kind = self.apply_drag_offset(host, kind, offset);
                if let Some(handle) = self.handle_slot_mut(kind) {
                    handle.record_sample(offset, now);
                }
                self.anchor_handle(host, kind, offset, false);
            }
            TouchAction::Up => {
                let Some(kind) = self.dragging_kind() else {
                    return;
                };
                let now = self.clock.uptime();
                let Some(handle) = self.handle_slot_mut(kind) else {
                    return;
                };
                if let Some(offset) = handle.release(now) {
                    let kind = self.apply_drag_offset(host, kind, offset);
                    self.anchor_handle(host, kind, offset, false);
                }
            }
            TouchAction::Cancel => {
                let Some(kind) = self.dragging_kind() else {
                    return;
                };
                if let Some(handle) = self.handle_slot_mut(kind) {
                    handle.cancel();
                }
            }
        }
    }

    // Applies a drag-derived offset to the selection edge `kind` controls.
    // Returns the kind the handle controls afterwards: dragging a selection
    // handle past its peer swaps the pair's edges from that update on, so
    // the handle under the finger keeps tracking it.
    fn apply_drag_offset(
        &mut self,
        host: &mut dyn HostSurface,
        kind: HandleKind,
        offset: usize,
    ) -> HandleKind {
        match kind {
            HandleKind::Insertion => {
                self.commit_selection(host, offset, offset);
                HandleKind::Insertion
            }
            HandleKind::SelectionStart => {
                let end = self.selection.max();
                if offset <= end {
                    self.commit_selection(host, offset, end);
                    HandleKind::SelectionStart
                } else {
                    self.commit_selection(host, end, offset);
                    self.swap_selection_handles();
                    HandleKind::SelectionEnd
                }
            }
            HandleKind::SelectionEnd => {
                let start = self.selection.min();
                if offset >= start {
                    self.commit_selection(host, start, offset);
                    HandleKind::SelectionEnd
                } else {
                    self.commit_selection(host, offset, start);
                    self.swap_selection_handles();
                    HandleKind::SelectionStart
                }
            }
        }
    }

    fn swap_selection_handles(&mut self) {
        debug!("selection handles crossed");
        std::mem::swap(&mut self.start_handle, &mut self.end_handle);
        let start_rtl = self.rtl_at(self.selection.min());
        let end_rtl = self.rtl_at(self.selection.max());
        if let Some(handle) = self.start_handle.as_mut() {
            handle.retarget(HandleKind::SelectionStart, start_rtl);
        }
        if let Some(handle) = self.end_handle.as_mut() {
            handle.retarget(HandleKind::SelectionEnd, end_rtl);
        }
    }

    fn rtl_at(&self, offset: usize) -> bool {
        self.layout
            .as_ref()
            .map(|layout| layout.is_rtl_at(self.buffer.clamp_offset(offset)))
            .unwrap_or(false)
    }

    fn current_cursor_offset(&self, kind: HandleKind) -> usize {
        match kind {
            HandleKind::Insertion => self.selection.start(),
            HandleKind::SelectionStart => self.selection.min(),
            HandleKind::SelectionEnd => self.selection.max(),
        }
    }

    fn dragging_kind(&self) -> Option<HandleKind> {
        [
            self.insertion_handle.as_ref(),
            self.start_handle.as_ref(),
            self.end_handle.as_ref(),
        ]
        .into_iter()
        .flatten()
        .find(|handle| handle.is_dragging())
        .map(|handle| handle.kind())
    }

    fn handle_slot_raw(&mut self, kind: HandleKind) -> &mut Option<Handle> {
        match kind {
            HandleKind::Insertion => &mut self.insertion_handle,
            HandleKind::SelectionStart => &mut self.start_handle,
            HandleKind::SelectionEnd => &mut self.end_handle,
        }
    }

    fn handle_slot_mut(&mut self, kind: HandleKind) -> Option<&mut Handle> {
        self.handle_slot_raw(kind).as_mut()
    }

    #[cfg(test)]
    fn handle_slot(&self, kind: HandleKind) -> Option<&Handle> {
        match kind {
            HandleKind::Insertion => self.insertion_handle.as_ref(),
            HandleKind::SelectionStart => self.start_handle.as_ref(),
            HandleKind::SelectionEnd => self.end_handle.as_ref(),
        }
    }

    // Recomputes the handle's content-relative anchor under its offset. No
    // layout means the anchor cannot be known; the handles retire until one
    // exists again.
    fn anchor_handle(
        &mut self,
        host: &mut dyn HostSurface,
        kind: HandleKind,
        offset: usize,
        force: bool,
    ) {
        let Some(layout) = self.layout.clone() else {
            self.hide_handles(host);
            return;
        };
        let offset = self.buffer.clamp_offset(offset);
        let scroll = self.scroll;
        let Some(handle) = self.handle_slot_mut(kind) else {
            return;
        };
        if handle.previous_offset() == Some(offset) && !force {
            return;
        }
        let line = layout.line_for_offset(offset);
        let position = PxPosition::new(
            layout.primary_horizontal(offset) - handle.hotspot_x() - scroll.x,
            layout.line_bottom(line) - scroll.y,
        );
        handle.set_position(position);
        handle.set_previous_offset(offset);
    }

    // --- per-frame --------------------------------------------------------

    /// Reports an externally driven scroll (an ancestor scrolled).
    pub fn on_scroll_changed(&mut self) {
        self.broadcaster.on_scroll_changed();
    }

    /// Per-frame predraw: runs a deferred scroll-into-view, then fans the
    /// widget's current window position out to the active handles.
    pub fn on_pre_draw(&mut self, host: &mut dyn HostSurface) {
        if self.layout.is_some() {
            if let Some(offset) = self.defer_scroll.take() {
                self.bring_offset_into_view(host, offset);
            }
        }
        if !self.broadcaster.is_active() {
            return;
        }
        let updates = self.broadcaster.pre_draw(host.location_in_window());
        for update in updates {
            self.update_handle_for_frame(host, update);
        }
    }

    fn update_handle_for_frame(&mut self, host: &mut dyn HostSurface, update: PositionUpdate) {
        let offset = self.current_cursor_offset(update.kind);
        self.anchor_handle(host, update.kind, offset, update.scroll_changed);

        let in_batch = self.batch.is_in_batch();
        let Some(handle) = self.handle_slot_mut(update.kind) else {
            return;
        };
        let anchor_moved = handle.take_position_changed();
        if !update.position_changed && !anchor_moved {
            return;
        }
        if handle.is_dragging() {
            handle.parent_moved(update.position);
        }
        let hotspot = PxPosition::new(
            handle.position().x + handle.hotspot_x(),
            handle.position().y,
        );
        let visible =
            handle.is_dragging() || (!in_batch && host.is_position_visible(hotspot));
        let window = update.position + handle.position();
        if visible {
            if handle.is_showing() {
                host.move_handle(update.kind, window);
            } else {
                handle.set_showing(true);
                host.show_handle(update.kind, window);
            }
        } else if handle.is_showing() {
            handle.set_showing(false);
            host.dismiss_handle(update.kind);
        }
    }
}
