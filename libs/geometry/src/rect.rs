//! Axis-aligned rectangles.

use serde::{Deserialize, Serialize};

use crate::dir::Dir;
use crate::point::Point;
use crate::side::{Side, Sides};
use crate::span::Span;

/// An axis-aligned rectangle, specified by lower-left and upper-right corners.
#[derive(
    Debug, Default, Copy, Clone, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Rect {
    /// The lower-left corner.
    p0: Point,
    /// The upper-right corner.
    p1: Point,
}

impl Rect {
    /// Creates a rectangle from all 4 sides (left, bottom, right, top).
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let rect = Rect::from_sides(15, 20, 30, 40);
    /// assert_eq!(rect.left(), 15);
    /// assert_eq!(rect.bot(), 20);
    /// assert_eq!(rect.right(), 30);
    /// assert_eq!(rect.top(), 40);
    /// ```
    pub fn from_sides(left: i64, bot: i64, right: i64, top: i64) -> Self {
        Self {
            p0: Point::new(left.min(right), bot.min(top)),
            p1: Point::new(left.max(right), bot.max(top)),
        }
    }

    /// Creates a zero-area rectangle containing the given point.
    #[inline]
    pub const fn from_point(p: Point) -> Self {
        Self { p0: p, p1: p }
    }

    /// Creates a rectangle from the given corner points, in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::from_sides(a.x, a.y, b.x, b.y)
    }

    /// Creates a rectangle from a horizontal and a vertical [`Span`].
    pub const fn from_spans(h: Span, v: Span) -> Self {
        Self {
            p0: Point::new(h.start(), v.start()),
            p1: Point::new(h.stop(), v.stop()),
        }
    }

    /// Creates a rectangle centered (rounding down) at `center` with the
    /// given width and height.
    pub const fn from_center_and_dims(center: Point, w: i64, h: i64) -> Self {
        Self {
            p0: Point::new(center.x - w / 2, center.y - h / 2),
            p1: Point::new(center.x - w / 2 + w, center.y - h / 2 + h),
        }
    }

    /// The lower-left corner.
    #[inline]
    pub const fn p0(&self) -> Point {
        self.p0
    }

    /// The upper-right corner.
    #[inline]
    pub const fn p1(&self) -> Point {
        self.p1
    }

    /// The left (minimum-x) edge coordinate.
    #[inline]
    pub const fn left(&self) -> i64 {
        self.p0.x
    }

    /// The bottom (minimum-y) edge coordinate.
    #[inline]
    pub const fn bot(&self) -> i64 {
        self.p0.y
    }

    /// The right (maximum-x) edge coordinate.
    #[inline]
    pub const fn right(&self) -> i64 {
        self.p1.x
    }

    /// The top (maximum-y) edge coordinate.
    #[inline]
    pub const fn top(&self) -> i64 {
        self.p1.y
    }

    /// The coordinate of the given side.
    pub const fn side(&self, side: Side) -> i64 {
        match side {
            Side::Left => self.p0.x,
            Side::Bot => self.p0.y,
            Side::Right => self.p1.x,
            Side::Top => self.p1.y,
        }
    }

    /// The width (horizontal extent) of the rectangle.
    #[inline]
    pub const fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }

    /// The height (vertical extent) of the rectangle.
    #[inline]
    pub const fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }

    /// The extent of this rectangle along `dir`.
    pub const fn length(&self, dir: Dir) -> i64 {
        match dir {
            Dir::Horiz => self.width(),
            Dir::Vert => self.height(),
        }
    }

    /// The span of this rectangle along `dir`.
    pub const fn span(&self, dir: Dir) -> Span {
        match dir {
            Dir::Horiz => self.hspan(),
            Dir::Vert => self.vspan(),
        }
    }

    /// The horizontal span of this rectangle.
    pub const fn hspan(&self) -> Span {
        // SAFETY of ordering: p0 <= p1 is a construction invariant.
        Span::with_start_and_length(self.p0.x, self.p1.x - self.p0.x)
    }

    /// The vertical span of this rectangle.
    pub const fn vspan(&self) -> Span {
        Span::with_start_and_length(self.p0.y, self.p1.y - self.p0.y)
    }

    /// The center point of the rectangle, rounded down.
    pub const fn center(&self) -> Point {
        Point::new((self.p0.x + self.p1.x) / 2, (self.p0.y + self.p1.y) / 2)
    }

    /// The area of this rectangle.
    #[inline]
    pub const fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Whether this rectangle has zero area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Whether this rectangle contains the given point (boundary included).
    pub const fn contains_point(&self, p: Point) -> bool {
        self.p0.x <= p.x && p.x <= self.p1.x && self.p0.y <= p.y && p.y <= self.p1.y
    }

    /// Whether this rectangle contains all of `other` (boundaries included).
    pub const fn contains_rect(&self, other: Rect) -> bool {
        self.p0.x <= other.p0.x
            && self.p0.y <= other.p0.y
            && other.p1.x <= self.p1.x
            && other.p1.y <= self.p1.y
    }

    /// Whether this rectangle and `other` share any point (edge contact
    /// counts).
    pub const fn touches(&self, other: Rect) -> bool {
        self.p0.x <= other.p1.x
            && other.p0.x <= self.p1.x
            && self.p0.y <= other.p1.y
            && other.p0.y <= self.p1.y
    }

    /// Whether this rectangle and `other` share interior area.
    pub const fn overlaps(&self, other: Rect) -> bool {
        self.p0.x < other.p1.x
            && other.p0.x < self.p1.x
            && self.p0.y < other.p1.y
            && other.p0.y < self.p1.y
    }

    /// The intersection of this rectangle with `other`, if it has positive
    /// extent in both directions (possibly zero area: edge contact yields a
    /// degenerate rectangle).
    pub fn intersection(&self, other: Rect) -> Option<Rect> {
        if !self.touches(other) {
            return None;
        }
        Some(Rect {
            p0: Point::new(self.p0.x.max(other.p0.x), self.p0.y.max(other.p0.y)),
            p1: Point::new(self.p1.x.min(other.p1.x), self.p1.y.min(other.p1.y)),
        })
    }

    /// The smallest rectangle containing both this rectangle and `other`.
    pub fn union(&self, other: Rect) -> Rect {
        Rect {
            p0: Point::new(self.p0.x.min(other.p0.x), self.p0.y.min(other.p0.y)),
            p1: Point::new(self.p1.x.max(other.p1.x), self.p1.y.max(other.p1.y)),
        }
    }

    /// The smallest rectangle containing this rectangle and the given point.
    pub fn union_point(&self, p: Point) -> Rect {
        self.union(Rect::from_point(p))
    }

    /// Expands the rectangle by `amount` on all sides.
    pub const fn expand_all(&self, amount: i64) -> Rect {
        Rect {
            p0: Point::new(self.p0.x - amount, self.p0.y - amount),
            p1: Point::new(self.p1.x + amount, self.p1.y + amount),
        }
    }

    /// Expands the rectangle by `amount` on the given side.
    pub fn expand_side(&self, side: Side, amount: i64) -> Rect {
        let mut r = *self;
        match side {
            Side::Left => r.p0.x -= amount,
            Side::Bot => r.p0.y -= amount,
            Side::Right => r.p1.x += amount,
            Side::Top => r.p1.y += amount,
        }
        r
    }

    /// Expands the rectangle by per-side amounts.
    ///
    /// Negative amounts shrink the corresponding side; the result is
    /// normalized so `p0 <= p1` still holds.
    pub fn expand_sides(&self, amounts: Sides<i64>) -> Rect {
        Rect::from_sides(
            self.p0.x - amounts[Side::Left],
            self.p0.y - amounts[Side::Bot],
            self.p1.x + amounts[Side::Right],
            self.p1.y + amounts[Side::Top],
        )
    }

    /// Translates the rectangle by the given offset.
    pub fn translate(&self, ofs: Point) -> Rect {
        Rect {
            p0: self.p0 + ofs,
            p1: self.p1 + ofs,
        }
    }

    /// The four corner points, counter-clockwise from the lower-left.
    pub const fn corners(&self) -> [Point; 4] {
        [
            self.p0,
            Point::new(self.p1.x, self.p0.y),
            self.p1,
            Point::new(self.p0.x, self.p1.y),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_construction() {
        let r = Rect::from_corners(Point::new(30, 40), Point::new(15, 20));
        assert_eq!(r, Rect::from_sides(15, 20, 30, 40));
        assert_eq!(r.width(), 15);
        assert_eq!(r.height(), 20);
        assert_eq!(r.area(), 300);
        assert_eq!(r.center(), Point::new(22, 30));
        let c = Rect::from_center_and_dims(Point::new(0, 0), 10, 4);
        assert_eq!(c, Rect::from_sides(-5, -2, 5, 2));
    }

    #[test]
    fn rect_set_ops() {
        let a = Rect::from_sides(0, 0, 10, 10);
        let b = Rect::from_sides(5, 5, 15, 15);
        let c = Rect::from_sides(11, 0, 12, 1);
        assert_eq!(a.intersection(b), Some(Rect::from_sides(5, 5, 10, 10)));
        assert_eq!(a.intersection(c), None);
        assert_eq!(a.union(c), Rect::from_sides(0, 0, 12, 10));
        assert!(a.contains_rect(Rect::from_sides(0, 0, 10, 5)));
        assert!(!a.contains_rect(b));
        assert!(a.touches(Rect::from_sides(10, 0, 12, 1)));
        assert!(!a.overlaps(Rect::from_sides(10, 0, 12, 1)));
    }

    #[test]
    fn rect_expansion() {
        let r = Rect::from_sides(0, 0, 10, 10);
        assert_eq!(r.expand_all(2), Rect::from_sides(-2, -2, 12, 12));
        assert_eq!(
            r.expand_sides(Sides::new(1, 2, 3, 4)),
            Rect::from_sides(-1, -2, 13, 14)
        );
        assert_eq!(
            r.expand_side(Side::Right, 5),
            Rect::from_sides(0, 0, 15, 10)
        );
    }
}
