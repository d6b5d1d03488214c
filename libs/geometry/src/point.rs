//! 2-D points.

use serde::{Deserialize, Serialize};

use crate::dir::Dir;
use crate::snap::snap_to_grid;

/// A point in two-dimensional space.
#[derive(
    Debug, Copy, Clone, Default, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Point {
    /// The x-coordinate of the point.
    pub x: i64,
    /// The y-coordinate of the point.
    pub y: i64,
}

impl Point {
    /// Creates a new [`Point`] from (x, y) coordinates.
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Returns the origin, `(0, 0)`.
    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// Gets the coordinate associated with direction `dir`.
    pub const fn coord(&self, dir: Dir) -> i64 {
        match dir {
            Dir::Horiz => self.x,
            Dir::Vert => self.y,
        }
    }

    /// Creates a new point from the given direction and coordinates.
    ///
    /// If `dir` is [`Dir::Horiz`], `a` becomes the x-coordinate and `b`
    /// becomes the y-coordinate; if [`Dir::Vert`], the roles are swapped.
    pub const fn from_dir_coords(dir: Dir, a: i64, b: i64) -> Self {
        match dir {
            Dir::Horiz => Self::new(a, b),
            Dir::Vert => Self::new(b, a),
        }
    }

    /// Snaps the x and y coordinates of this point to the nearest multiple
    /// of `grid`.
    pub const fn snap_to_grid(&self, grid: i64) -> Self {
        Self::new(snap_to_grid(self.x, grid), snap_to_grid(self.y, grid))
    }

    /// The Manhattan distance to `other`.
    pub const fn manhattan_dist(&self, other: Point) -> i64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// The squared Euclidean distance to `other`.
    pub const fn dist_sq(&self, other: Point) -> i64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

impl std::ops::Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Point {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Neg for Point {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_arithmetic() {
        let a = Point::new(3, -4);
        let b = Point::new(-1, 6);
        assert_eq!(a + b, Point::new(2, 2));
        assert_eq!(a - b, Point::new(4, -10));
        assert_eq!(-a, Point::new(-3, 4));
        assert_eq!(a.manhattan_dist(b), 14);
    }

    #[test]
    fn point_snapping() {
        assert_eq!(Point::new(12, -12).snap_to_grid(5), Point::new(10, -10));
        assert_eq!(Point::new(13, 17).snap_to_grid(5), Point::new(15, 15));
    }
}
