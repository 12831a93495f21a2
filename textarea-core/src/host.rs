//! Host platform surface.
//!
//! Everything the widget needs from the embedding platform is behind one
//! trait: window placement, ancestor-chain visibility, the floating handle
//! layers, and damage reporting. The core never walks a view tree or owns a
//! popup; it asks.

use textarea_foundation::{PxPosition, PxRect};

use crate::handle::HandleKind;

/// Platform services consumed by the widget.
///
/// `is_position_visible` answers whether a content-relative point survives
/// the ancestor clipping chain; the host applies each ancestor's scroll and
/// transform and reports not-visible as soon as any ancestor clips the point
/// out. Handle layers are independently positioned floating surfaces keyed
/// by [`HandleKind`]; showing an already-shown handle repositions it.
pub trait HostSurface {
    /// The widget's current position in window coordinates.
    fn location_in_window(&self) -> PxPosition;

    /// Whether a content-relative point is inside the visible viewport chain.
    fn is_position_visible(&self, position: PxPosition) -> bool;

    /// Shows the floating layer for `kind` at a window position.
    fn show_handle(&mut self, kind: HandleKind, at: PxPosition);

    /// Repositions an already-shown floating layer.
    fn move_handle(&mut self, kind: HandleKind, at: PxPosition);

    /// Dismisses the floating layer for `kind`. Dismissing a hidden handle
    /// is a no-op.
    fn dismiss_handle(&mut self, kind: HandleKind);

    /// Requests that the per-frame predraw callback run before the next
    /// draw.
    fn arm_pre_draw(&mut self);

    /// Releases the per-frame predraw callback.
    fn release_pre_draw(&mut self);

    /// Marks a content-relative region dirty for repaint.
    fn invalidate(&mut self, region: PxRect);

    /// Marks the whole widget dirty for repaint.
    fn invalidate_all(&mut self);

    /// Scrolls the content so that `scroll` becomes the top-left visible
    /// corner.
    fn scroll_to(&mut self, scroll: PxPosition);
}
