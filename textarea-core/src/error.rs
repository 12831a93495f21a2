//! Error types for the widget core.
//!
//! Nothing in this crate is fatal: invariant-violating input is clamped,
//! protocol misuse is absorbed as a no-op and missing layout defers the
//! operation. The errors below cover the few cases where a caller can
//! actually react, such as running out of position-subscriber slots.

use thiserror::Error;

use crate::position::MAX_SUBSCRIBERS;

/// Represents recoverable errors reported by the widget core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TextAreaError {
    /// All position-broadcast subscriber slots are occupied. The fixed limit
    /// exists because only a handful of handles can ever be on screen.
    #[error("all {MAX_SUBSCRIBERS} position subscriber slots are in use")]
    SubscriberLimit,
}
