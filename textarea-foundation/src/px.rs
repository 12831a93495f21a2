//! Physical pixel coordinate system.
//!
//! This module provides types for working with physical pixel coordinates,
//! positions, sizes and rectangles.
//!
//! # Key Types
//!
//! - [`Px`] - A single physical pixel coordinate value that supports negative
//!   values for scrolling
//! - [`PxPosition`] - A 2D position in physical pixel space
//! - [`PxSize`] - A 2D size in physical pixel space
//! - [`PxRect`] - An axis-aligned rectangle in physical pixel space
//!
//! # Coordinate System
//!
//! The coordinate system uses:
//! - Origin (0, 0) at the top-left corner
//! - X-axis increases to the right
//! - Y-axis increases downward
//! - Negative coordinates are supported for scrolling and off-screen
//!   positioning

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// A physical pixel coordinate value.
///
/// Physical pixels correspond directly to screen pixels. Negative values are
/// valid and show up routinely while scrolling or while a drag position is
/// outside the widget bounds.
///
/// # Examples
///
/// ```
/// use textarea_foundation::Px;
///
/// let a = Px::new(100);
/// let b = Px::new(-50);
/// assert_eq!(a + b, Px(50));
/// assert_eq!((a * 2).raw(), 200);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct Px(pub i32);

impl Px {
    /// A constant representing zero pixels.
    pub const ZERO: Self = Self(0);

    /// A constant representing the maximum possible pixel value.
    pub const MAX: Self = Self(i32::MAX);

    /// Creates a new `Px` from an i32 value.
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the raw i32 value.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Returns the absolute value.
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Returns the smaller of two values.
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    /// Returns the larger of two values.
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }

    /// Clamps `self` into `[lo, hi]`.
    pub fn clamp(self, lo: Self, hi: Self) -> Self {
        Self(self.0.clamp(lo.0, hi.0))
    }

    /// Adds two values, saturating at the numeric bounds instead of
    /// overflowing.
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts two values, saturating at the numeric bounds instead of
    /// overflowing.
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Converts to an f32 value.
    pub const fn to_f32(self) -> f32 {
        self.0 as f32
    }

    /// Creates a `Px` from an f32 value, rounding to the nearest pixel.
    ///
    /// Non-finite inputs collapse to zero so a bad coordinate from a pointer
    /// event can never poison downstream arithmetic.
    pub fn from_f32(value: f32) -> Self {
        if value.is_finite() {
            Self(value.round() as i32)
        } else {
            Self(0)
        }
    }
}

impl From<i32> for Px {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl Add for Px {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Px {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<i32> for Px {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<i32> for Px {
    type Output = Self;

    fn div(self, rhs: i32) -> Self {
        Self(self.0 / rhs)
    }
}

impl Neg for Px {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl AddAssign for Px {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Px {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

/// A 2D position in physical pixel space.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PxPosition {
    /// The x-coordinate.
    pub x: Px,
    /// The y-coordinate.
    pub y: Px,
}

impl PxPosition {
    /// A constant representing the origin position (0, 0).
    pub const ZERO: Self = Self {
        x: Px::ZERO,
        y: Px::ZERO,
    };

    /// Creates a new position from x and y coordinates.
    pub const fn new(x: Px, y: Px) -> Self {
        Self { x, y }
    }

    /// Returns a new position offset by the given deltas.
    pub fn offset(self, dx: Px, dy: Px) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl Add for PxPosition {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for PxPosition {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// A 2D size in physical pixel space.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PxSize {
    /// The width dimension.
    pub width: Px,
    /// The height dimension.
    pub height: Px,
}

impl PxSize {
    /// A constant representing a zero size.
    pub const ZERO: Self = Self {
        width: Px::ZERO,
        height: Px::ZERO,
    };

    /// Creates a new size from width and height.
    pub const fn new(width: Px, height: Px) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle in physical pixel space.
///
/// Stored as a top-left corner plus a size. A rectangle with zero or negative
/// width or height is considered empty.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PxRect {
    /// The x-coordinate of the top-left corner.
    pub x: Px,
    /// The y-coordinate of the top-left corner.
    pub y: Px,
    /// The rectangle width.
    pub width: Px,
    /// The rectangle height.
    pub height: Px,
}

impl PxRect {
    /// Creates a new rectangle.
    pub const fn new(x: Px, y: Px, width: Px, height: Px) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle from its left/top/right/bottom edges.
    pub fn from_edges(left: Px, top: Px, right: Px, bottom: Px) -> Self {
        Self {
            x: left,
            y: top,
            width: (right - left).max(Px::ZERO),
            height: (bottom - top).max(Px::ZERO),
        }
    }

    /// Returns the x-coordinate of the right edge.
    pub fn right(&self) -> Px {
        self.x + self.width
    }

    /// Returns the y-coordinate of the bottom edge.
    pub fn bottom(&self) -> Px {
        self.y + self.height
    }

    /// Returns `true` when the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        self.width <= Px::ZERO || self.height <= Px::ZERO
    }

    /// Returns `true` when `position` lies inside the rectangle.
    ///
    /// The right and bottom edges are exclusive, matching the coordinate
    /// convention of the layout oracle.
    pub fn contains(&self, position: PxPosition) -> bool {
        position.x >= self.x
            && position.x < self.right()
            && position.y >= self.y
            && position.y < self.bottom()
    }

    /// Returns `true` when the two rectangles overlap.
    pub fn intersects(&self, other: &PxRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Returns the smallest rectangle covering both inputs.
    ///
    /// An empty input contributes nothing, so the union of an empty rect and
    /// a non-empty rect is the non-empty one.
    pub fn union(&self, other: &PxRect) -> PxRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        PxRect::from_edges(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_px_arithmetic() {
        let a = Px(10);
        let b = Px(5);

        assert_eq!(a + b, Px(15));
        assert_eq!(a - b, Px(5));
        assert_eq!(a * 2, Px(20));
        assert_eq!(a / 2, Px(5));
        assert_eq!(-a, Px(-10));
    }

    #[test]
    fn test_px_saturating_arithmetic() {
        let max = Px(i32::MAX);
        let min = Px(i32::MIN);
        assert_eq!(max.saturating_add(Px(1)), max);
        assert_eq!(min.saturating_sub(Px(1)), min);
    }

    #[test]
    fn test_px_from_f32_rejects_non_finite() {
        assert_eq!(Px::from_f32(3.6), Px(4));
        assert_eq!(Px::from_f32(f32::NAN), Px(0));
        assert_eq!(Px::from_f32(f32::INFINITY), Px(0));
    }

    #[test]
    fn test_position_offset() {
        let pos = PxPosition::new(Px(10), Px(20));
        assert_eq!(pos.offset(Px(5), Px(-5)), PxPosition::new(Px(15), Px(15)));
        assert_eq!(pos - PxPosition::new(Px(1), Px(2)), PxPosition::new(Px(9), Px(18)));
    }

    #[test]
    fn test_rect_edges_and_contains() {
        let rect = PxRect::new(Px(10), Px(10), Px(20), Px(10));
        assert_eq!(rect.right(), Px(30));
        assert_eq!(rect.bottom(), Px(20));
        assert!(rect.contains(PxPosition::new(Px(10), Px(10))));
        assert!(!rect.contains(PxPosition::new(Px(30), Px(10))));
        assert!(!rect.contains(PxPosition::new(Px(15), Px(25))));
    }

    #[test]
    fn test_rect_union_ignores_empty() {
        let rect = PxRect::new(Px(0), Px(0), Px(10), Px(10));
        let empty = PxRect::default();
        assert_eq!(rect.union(&empty), rect);
        assert_eq!(empty.union(&rect), rect);

        let other = PxRect::new(Px(5), Px(5), Px(10), Px(10));
        assert_eq!(
            rect.union(&other),
            PxRect::from_edges(Px(0), Px(0), Px(15), Px(15))
        );
    }

    #[test]
    fn test_rect_intersects() {
        let a = PxRect::new(Px(0), Px(0), Px(10), Px(10));
        let b = PxRect::new(Px(9), Px(9), Px(10), Px(10));
        let c = PxRect::new(Px(10), Px(0), Px(10), Px(10));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
