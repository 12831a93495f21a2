//! Editable text-area widget core.
//!
//! This crate implements the state machine of an editable text widget:
//! a mutable character buffer with an IME composition annotation, a
//! direction-preserving selection, coalesced IME batch edits, a cooperative
//! caret blink, draggable insertion/selection handles with touch-up jitter
//! filtering, and per-frame position fan-out for the handle layers.
//!
//! It deliberately does *not* shape or paint text, own timers, or talk to a
//! window system. Text measurement comes in through the [`TextLayout`]
//! oracle, time through an injected [`Clock`], and everything platform-side
//! (damage, scrolling, floating handle surfaces, visibility clipping)
//! through the [`HostSurface`] trait, which keeps the whole state machine
//! deterministic under test.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use textarea_core::{HandleMetrics, SystemClock, TextArea};
//! use textarea_foundation::Px;
//!
//! let clock = Arc::new(SystemClock::new());
//! let mut area = TextArea::new(
//!     clock,
//!     HandleMetrics { width: Px(48), height: Px(48) },
//! );
//! // Wire `area` to a `HostSurface` implementation and feed it events.
//! ```

pub mod batch_edit;
pub mod blink;
pub mod buffer;
pub mod error;
pub mod handle;
pub mod host;
pub mod layout;
pub mod position;
pub mod selection;
pub mod text_area;
pub mod touch_filter;

pub use batch_edit::{BatchEditState, ChangedSpan, FinishOutcome, ImeSession};
pub use blink::{caret_visible, Blink, Clock, SystemClock, BLINK_INTERVAL};
pub use buffer::{TextBuffer, TextEdit};
pub use error::TextAreaError;
pub use handle::{Handle, HandleKind, HandleMetrics};
pub use host::HostSurface;
pub use layout::{RegionRects, TextLayout};
pub use position::{PositionBroadcaster, PositionUpdate, MAX_SUBSCRIBERS};
pub use selection::{Selection, SelectionChange};
pub use text_area::{TextArea, TouchAction};
pub use touch_filter::{TouchUpFilter, AFTER_WINDOW, BEFORE_WINDOW, HISTORY_SIZE};
