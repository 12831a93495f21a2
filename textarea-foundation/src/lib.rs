//! Foundation primitives for the textarea widget crates.
//!
//! This crate only contains the physical-pixel geometry types the widget core
//! needs to talk about caret, selection and handle positions. It is
//! intentionally free of any rendering or platform concern.

pub mod px;

pub use px::{Px, PxPosition, PxRect, PxSize};
