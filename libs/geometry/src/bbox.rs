//! Axis-aligned rectangular bounding boxes.

use crate::point::Point;
use crate::polygon::Polygon;
use crate::rect::Rect;

/// A geometric shape that has a bounding box.
pub trait Bbox {
    /// Computes the axis-aligned rectangular bounding box.
    ///
    /// Returns [`None`] if the shape is empty.
    fn bbox(&self) -> Option<Rect>;
}

impl Bbox for Rect {
    fn bbox(&self) -> Option<Rect> {
        Some(*self)
    }
}

impl Bbox for Point {
    fn bbox(&self) -> Option<Rect> {
        Some(Rect::from_point(*self))
    }
}

impl Bbox for Polygon {
    fn bbox(&self) -> Option<Rect> {
        Polygon::bbox(self)
    }
}

impl<T: Bbox> Bbox for [T] {
    fn bbox(&self) -> Option<Rect> {
        let mut acc: Option<Rect> = None;
        for item in self {
            match (acc, item.bbox()) {
                (Some(a), Some(b)) => acc = Some(a.union(b)),
                (None, b) => acc = b,
                (a, None) => acc = a,
            }
        }
        acc
    }
}

impl<T: Bbox> Bbox for Vec<T> {
    fn bbox(&self) -> Option<Rect> {
        self.as_slice().bbox()
    }
}
