//! Integer coordinate polygons.

use serde::{Deserialize, Serialize};

use crate::point::Point;
use crate::rect::Rect;

/// A polygon, given by its vertices in order.
///
/// The final vertex is implicitly connected back to the first; callers should
/// not repeat the first vertex at the end.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Polygon {
    points: Vec<Point>,
}

/// One boundary edge of a [`Polygon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolyEdge {
    /// The edge's starting vertex.
    pub start: Point,
    /// The edge's ending vertex.
    pub end: Point,
}

impl PolyEdge {
    /// The edge's angle in tenth-degrees in `[0, 1800)`, folding opposite
    /// directions together.
    ///
    /// Parallel edges (including anti-parallel ones) share an angle class.
    pub fn angle_class(&self) -> i64 {
        let dx = (self.end.x - self.start.x) as f64;
        let dy = (self.end.y - self.start.y) as f64;
        let deg = dy.atan2(dx).to_degrees();
        let tenths = (deg * 10.0).round() as i64;
        tenths.rem_euclid(1800)
    }
}

impl Polygon {
    /// Creates a polygon with the given vertices.
    pub fn from_verts(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Creates the four-vertex polygon equivalent to `rect`,
    /// counter-clockwise from the lower-left.
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            points: rect.corners().to_vec(),
        }
    }

    /// The vertices of this polygon.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The number of vertices.
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// The bounding box of this polygon.
    ///
    /// Returns `None` for a polygon with no vertices.
    pub fn bbox(&self) -> Option<Rect> {
        let first = *self.points.first()?;
        Some(
            self.points
                .iter()
                .fold(Rect::from_point(first), |r, &p| r.union_point(p)),
        )
    }

    /// Iterates over the boundary edges, including the closing edge from the
    /// last vertex back to the first.
    pub fn edges(&self) -> impl Iterator<Item = PolyEdge> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| PolyEdge {
            start: self.points[i],
            end: self.points[(i + 1) % n],
        })
    }

    /// Twice the signed area of this polygon (shoelace formula).
    ///
    /// Positive for counter-clockwise vertex order. Doubling keeps the result
    /// exact in integer arithmetic.
    pub fn double_signed_area(&self) -> i64 {
        self.edges()
            .map(|e| e.start.x * e.end.y - e.end.x * e.start.y)
            .sum()
    }

    /// The absolute area of this polygon, rounded down from half the
    /// shoelace sum.
    pub fn area(&self) -> i64 {
        self.double_signed_area().abs() / 2
    }

    /// If this polygon is an axis-aligned rectangle, returns it as a [`Rect`].
    pub fn as_rect(&self) -> Option<Rect> {
        if self.points.len() != 4 {
            return None;
        }
        if !self.is_rectilinear() {
            return None;
        }
        let bbox = self.bbox()?;
        // Four rectilinear vertices forming the bbox corners is a rectangle.
        (self.area() == bbox.area()).then_some(bbox)
    }

    /// Whether every edge of this polygon is axis-aligned.
    pub fn is_rectilinear(&self) -> bool {
        self.edges()
            .all(|e| e.start.x == e.end.x || e.start.y == e.end.y)
    }

    /// Whether the given point lies inside this polygon (even-odd rule).
    ///
    /// Points exactly on the boundary are reported as inside.
    pub fn contains_point(&self, p: Point) -> bool {
        let mut inside = false;
        for e in self.edges() {
            let (a, b) = (e.start, e.end);
            // Boundary check: p on segment a-b.
            let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
            if cross == 0
                && p.x >= a.x.min(b.x)
                && p.x <= a.x.max(b.x)
                && p.y >= a.y.min(b.y)
                && p.y <= a.y.max(b.y)
            {
                return true;
            }
            if (a.y > p.y) != (b.y > p.y) {
                // Compare p.x against the edge's x at height p.y without
                // division: sign depends on edge direction.
                let dy = b.y - a.y;
                let t = (p.y - a.y) * (b.x - a.x) - (p.x - a.x) * dy;
                if (dy > 0 && t > 0) || (dy < 0 && t < 0) {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Translates this polygon by the given offset.
    pub fn translate(&self, ofs: Point) -> Polygon {
        Polygon {
            points: self.points.iter().map(|&p| p + ofs).collect(),
        }
    }
}

impl From<Rect> for Polygon {
    fn from(value: Rect) -> Self {
        Polygon::from_rect(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ell() -> Polygon {
        // An L-shape: 20x10 base with a 10x10 tower on the left.
        Polygon::from_verts(vec![
            Point::new(0, 0),
            Point::new(20, 0),
            Point::new(20, 10),
            Point::new(10, 10),
            Point::new(10, 20),
            Point::new(0, 20),
        ])
    }

    #[test]
    fn polygon_area_and_bbox() {
        let p = ell();
        assert_eq!(p.area(), 300);
        assert_eq!(p.bbox(), Some(Rect::from_sides(0, 0, 20, 20)));
        assert!(p.is_rectilinear());
        assert_eq!(p.as_rect(), None);

        let r = Polygon::from_rect(Rect::from_sides(1, 2, 5, 9));
        assert_eq!(r.as_rect(), Some(Rect::from_sides(1, 2, 5, 9)));
        assert_eq!(r.area(), 28);
    }

    #[test]
    fn polygon_containment() {
        let p = ell();
        assert!(p.contains_point(Point::new(5, 5)));
        assert!(p.contains_point(Point::new(5, 15)));
        assert!(!p.contains_point(Point::new(15, 15)));
        // Boundary points count as inside.
        assert!(p.contains_point(Point::new(0, 0)));
        assert!(p.contains_point(Point::new(10, 15)));
    }

    #[test]
    fn edge_angle_classes() {
        let p = ell();
        let classes: Vec<i64> = p.edges().map(|e| e.angle_class()).collect();
        // Axis-aligned edges fall in exactly two classes.
        assert!(classes.iter().all(|&c| c == 0 || c == 900));

        let diag = PolyEdge {
            start: Point::new(0, 0),
            end: Point::new(10, 10),
        };
        assert_eq!(diag.angle_class(), 450);
        let anti = PolyEdge {
            start: Point::new(10, 10),
            end: Point::new(0, 0),
        };
        assert_eq!(anti.angle_class(), 450);
    }
}
