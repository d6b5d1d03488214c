//! Polygon sets represented as disjoint axis-aligned rectangles.
//!
//! A [`PolySet`] is a region of the plane: the union of a list of mutually
//! disjoint, positive-area rectangles. Insertion and subtraction maintain
//! disjointness, so area queries are exact sums and containment is an exact
//! cover test.
//!
//! The representation is exact for rectilinear geometry. Non-rectilinear
//! polygons are handled conservatively: containment tests use a covering
//! (over-approximating) decomposition and may therefore report a fitting
//! shape as not contained, but never the reverse. Callers are expected to
//! treat "not contained" as recoverable.

#![warn(missing_docs)]

use geometry::point::Point;
use geometry::polygon::Polygon;
use geometry::rect::Rect;
use serde::{Deserialize, Serialize};

mod decompose;
mod outline;

pub use decompose::{decompose_cover, decompose_fill};
pub use outline::RegionOutline;

/// A set of points in the plane: the union of disjoint rectangles.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolySet {
    rects: Vec<Rect>,
}

impl PolySet {
    /// Creates a new, empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The disjoint rectangles making up this set, in insertion order.
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Whether this set is empty.
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// The total area of this set.
    pub fn area(&self) -> i64 {
        self.rects.iter().map(|r| r.area()).sum()
    }

    /// Adds the given rectangle to the set.
    pub fn insert_rect(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        // Subtract first so the stored rectangles stay disjoint.
        self.subtract_rect(rect);
        self.rects.push(rect);
    }

    /// Adds the given polygon to the set.
    ///
    /// Rectilinear polygons are decomposed exactly; others approximately
    /// (see [`decompose_fill`]).
    pub fn insert_polygon(&mut self, poly: &Polygon) {
        for rect in decompose_fill(poly) {
            self.insert_rect(rect);
        }
    }

    /// Removes the given rectangle from the set.
    pub fn subtract_rect(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        let mut kept = Vec::with_capacity(self.rects.len());
        for r in self.rects.drain(..) {
            if !r.overlaps(rect) {
                kept.push(r);
                continue;
            }
            // Up to four L-shaped remainders around the subtracted region.
            let ix = r.intersection(rect).unwrap();
            if r.left() < ix.left() {
                kept.push(Rect::from_sides(r.left(), r.bot(), ix.left(), r.top()));
            }
            if ix.right() < r.right() {
                kept.push(Rect::from_sides(ix.right(), r.bot(), r.right(), r.top()));
            }
            if r.bot() < ix.bot() {
                kept.push(Rect::from_sides(ix.left(), r.bot(), ix.right(), ix.bot()));
            }
            if ix.top() < r.top() {
                kept.push(Rect::from_sides(ix.left(), ix.top(), ix.right(), r.top()));
            }
        }
        self.rects = kept;
    }

    /// Removes the given polygon from the set.
    pub fn subtract_polygon(&mut self, poly: &Polygon) {
        for rect in decompose_fill(poly) {
            self.subtract_rect(rect);
        }
    }

    /// Whether the given point lies in the set (rectangle boundaries count).
    pub fn contains_point(&self, p: Point) -> bool {
        self.rects.iter().any(|r| r.contains_point(p))
    }

    /// Whether the set fully covers the given rectangle.
    pub fn contains_rect(&self, rect: Rect) -> bool {
        if rect.is_empty() {
            // A degenerate query still has to land on the set.
            return self.contains_point(rect.p0()) && self.contains_point(rect.p1());
        }
        let covered: i64 = self
            .rects
            .iter()
            .filter_map(|r| r.intersection(rect))
            .map(|ix| ix.area())
            .sum();
        covered == rect.area()
    }

    /// Whether the set fully covers the given polygon.
    ///
    /// Conservative for non-rectilinear polygons: may report `false` for a
    /// polygon that does fit, never `true` for one that does not.
    pub fn contains_polygon(&self, poly: &Polygon) -> bool {
        decompose_cover(poly).into_iter().all(|r| self.contains_rect(r))
    }

    /// Whether the set shares any interior area with the given rectangle.
    pub fn intersects_rect(&self, rect: Rect) -> bool {
        self.rects.iter().any(|r| r.overlaps(rect))
    }

    /// Whether the set shares any interior area with the given polygon.
    pub fn intersects_polygon(&self, poly: &Polygon) -> bool {
        decompose_fill(poly)
            .into_iter()
            .any(|r| self.intersects_rect(r))
    }

    /// The intersection of this set with `other`, as a new set.
    pub fn intersection(&self, other: &PolySet) -> PolySet {
        let mut rects = Vec::new();
        for a in &self.rects {
            for b in &other.rects {
                if let Some(ix) = a.intersection(*b) {
                    if !ix.is_empty() {
                        rects.push(ix);
                    }
                }
            }
        }
        // Pairwise intersections of two disjoint families are disjoint.
        PolySet { rects }
    }

    /// The merged outline polygons of this set, one per connected component,
    /// ordered by (bottom, left) of the component bounding box.
    ///
    /// Each outline is traced counter-clockwise. Interior holes are not
    /// returned; see [`PolySet::regions`] for the full boundaries.
    pub fn outlines(&self) -> Vec<Polygon> {
        outline::trace_outlines(&self.rects)
    }

    /// The merged regions of this set with their hole boundaries, one per
    /// connected component, ordered like [`PolySet::outlines`].
    pub fn regions(&self) -> Vec<RegionOutline> {
        outline::trace_regions(&self.rects)
    }

    /// Tests whether a wire of the given width between `p1` and `p2` fits
    /// inside the set.
    ///
    /// A wire end may be extended past its endpoint by half the wire width.
    /// Extensions are tried most-coverage-first: both ends, head only, tail
    /// only, neither. Returns the `(head_extended, tail_extended)` flags of
    /// the first fitting variant, or `None` if no variant fits.
    pub fn wire_fits(&self, p1: Point, p2: Point, width: i64) -> Option<(bool, bool)> {
        for (head, tail) in [(true, true), (true, false), (false, true), (false, false)] {
            let Some(shape) = wire_shape(p1, p2, width, head, tail) else {
                continue;
            };
            let fits = match shape {
                WireShape::Rect(r) => self.contains_rect(r),
                WireShape::Poly(p) => self.contains_polygon(&p),
            };
            if fits {
                return Some((head, tail));
            }
        }
        None
    }
}

enum WireShape {
    Rect(Rect),
    Poly(Polygon),
}

/// The footprint of a wire from `p1` to `p2`, or `None` if degenerate.
fn wire_shape(p1: Point, p2: Point, width: i64, head: bool, tail: bool) -> Option<WireShape> {
    let half = width / 2;
    if p1 == p2 {
        // A point wire only has a footprint through its end extensions.
        if !(head && tail) || width == 0 {
            return None;
        }
        return Some(WireShape::Rect(Rect::from_center_and_dims(
            p1, width, width,
        )));
    }
    if p1.x == p2.x || p1.y == p2.y {
        let mut r = Rect::from_corners(p1, p2);
        let dir = if p1.x == p2.x {
            geometry::dir::Dir::Vert
        } else {
            geometry::dir::Dir::Horiz
        };
        let along = r.span(dir);
        let mut lo = along.start();
        let mut hi = along.stop();
        // Head is the p1 end: extend whichever extreme p1 sits on.
        let p1_at_lo = p1.coord(dir) == along.start();
        if head {
            if p1_at_lo {
                lo -= half;
            } else {
                hi += half;
            }
        }
        if tail {
            if p1_at_lo {
                hi += half;
            } else {
                lo -= half;
            }
        }
        let across = geometry::span::Span::from_center_and_length(
            r.span(dir.other()).center(),
            width,
        );
        r = match dir {
            geometry::dir::Dir::Horiz => {
                Rect::from_spans(geometry::span::Span::new(lo, hi), across)
            }
            geometry::dir::Dir::Vert => {
                Rect::from_spans(across, geometry::span::Span::new(lo, hi))
            }
        };
        if r.is_empty() {
            return None;
        }
        return Some(WireShape::Rect(r));
    }
    // Angled wire: build the rotated-rectangle footprint in floating point
    // and round corners outward onto the integer grid.
    let dx = (p2.x - p1.x) as f64;
    let dy = (p2.y - p1.y) as f64;
    let len = (dx * dx + dy * dy).sqrt();
    let (ux, uy) = (dx / len, dy / len);
    let (nx, ny) = (-uy, ux);
    let h = width as f64 / 2.0;
    let e1 = if head { h } else { 0.0 };
    let e2 = if tail { h } else { 0.0 };
    let sx = p1.x as f64 - ux * e1;
    let sy = p1.y as f64 - uy * e1;
    let ex = p2.x as f64 + ux * e2;
    let ey = p2.y as f64 + uy * e2;
    let corners = [
        (sx + nx * h, sy + ny * h),
        (sx - nx * h, sy - ny * h),
        (ex - nx * h, ey - ny * h),
        (ex + nx * h, ey + ny * h),
    ];
    let verts = corners
        .iter()
        .map(|&(x, y)| Point::new(x.round() as i64, y.round() as i64))
        .collect();
    Some(WireShape::Poly(Polygon::from_verts(verts)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_subtract_keep_area() {
        let mut set = PolySet::new();
        set.insert_rect(Rect::from_sides(0, 0, 10, 10));
        set.insert_rect(Rect::from_sides(5, 5, 15, 15));
        // Overlap is not double counted.
        assert_eq!(set.area(), 175);
        set.subtract_rect(Rect::from_sides(5, 5, 10, 10));
        assert_eq!(set.area(), 150);
        set.subtract_rect(Rect::from_sides(-100, -100, 100, 100));
        assert!(set.is_empty());
    }

    #[test]
    fn containment_and_intersection() {
        let mut set = PolySet::new();
        set.insert_rect(Rect::from_sides(0, 0, 10, 10));
        set.insert_rect(Rect::from_sides(10, 0, 20, 5));
        // Cover across the rect seam.
        assert!(set.contains_rect(Rect::from_sides(5, 0, 15, 5)));
        assert!(!set.contains_rect(Rect::from_sides(5, 0, 15, 6)));
        assert!(set.intersects_rect(Rect::from_sides(19, 4, 30, 30)));
        assert!(!set.intersects_rect(Rect::from_sides(20, 5, 30, 30)));
        assert!(set.contains_point(Point::new(20, 5)));
    }

    #[test]
    fn set_intersection() {
        let mut a = PolySet::new();
        a.insert_rect(Rect::from_sides(0, 0, 10, 10));
        let mut b = PolySet::new();
        b.insert_rect(Rect::from_sides(5, 5, 15, 15));
        b.insert_rect(Rect::from_sides(-5, -5, 2, 2));
        let ix = a.intersection(&b);
        assert_eq!(ix.area(), 25 + 4);
        assert!(ix.contains_rect(Rect::from_sides(5, 5, 10, 10)));
    }

    #[test]
    fn wire_fit_extension_flags() {
        let mut set = PolySet::new();
        // A horizontal bar exactly covering an extended wire.
        set.insert_rect(Rect::from_sides(0, 0, 100, 10));
        // Fully extended wire fits when endpoints leave half-width margin.
        assert_eq!(
            set.wire_fits(Point::new(5, 5), Point::new(95, 5), 10),
            Some((true, true))
        );
        // Head margin missing: only the tail can extend.
        assert_eq!(
            set.wire_fits(Point::new(0, 5), Point::new(95, 5), 10),
            Some((false, true))
        );
        // Neither end can extend.
        assert_eq!(
            set.wire_fits(Point::new(0, 5), Point::new(100, 5), 10),
            Some((false, false))
        );
        // Too wide anywhere.
        assert_eq!(set.wire_fits(Point::new(5, 5), Point::new(95, 5), 12), None);
    }

    #[test]
    fn polygon_round_trip_area() {
        let poly = Polygon::from_verts(vec![
            Point::new(0, 0),
            Point::new(20, 0),
            Point::new(20, 10),
            Point::new(10, 10),
            Point::new(10, 20),
            Point::new(0, 20),
        ]);
        let mut set = PolySet::new();
        set.insert_polygon(&poly);
        assert_eq!(set.area(), poly.area());
        assert!(set.contains_polygon(&poly));
        set.subtract_polygon(&poly);
        assert!(set.is_empty());
    }
}
