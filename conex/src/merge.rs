//! The polygon-set engine contract and the per-layer merge.
//!
//! The extractor never implements boolean polygon algebra itself; it talks to
//! an engine through [`PolygonEngine`]. Two merges exist during extraction: a
//! mutable working merge that is progressively emptied as features are
//! recognized, and an immutable original merge retained for fit and
//! containment tests against the unmodified input.

use geometry::point::Point;
use geometry::polygon::Polygon;
use geometry::rect::Rect;
use indexmap::IndexMap;
use polyset::PolySet;

use crate::tech::LayerId;

/// The polygon-set operations the extractor requires of its engine.
pub trait PolygonEngine: Default + Clone {
    /// Adds a rectangle to the set.
    fn insert_rect(&mut self, rect: Rect);
    /// Adds a polygon to the set.
    fn insert_polygon(&mut self, poly: &Polygon);
    /// Removes a rectangle from the set.
    fn subtract_rect(&mut self, rect: Rect);
    /// Removes a polygon from the set.
    fn subtract_polygon(&mut self, poly: &Polygon);
    /// Whether the set covers the given point.
    fn contains_point(&self, p: Point) -> bool;
    /// Whether the set fully covers the given rectangle.
    fn contains_rect(&self, rect: Rect) -> bool;
    /// Whether the set fully covers the given polygon. May be conservative
    /// for non-rectilinear polygons (report a fitting polygon as unfitting,
    /// never the reverse).
    fn contains_polygon(&self, poly: &Polygon) -> bool;
    /// Whether the set shares interior area with the given rectangle.
    fn intersects_rect(&self, rect: Rect) -> bool;
    /// The intersection of this set with another.
    fn intersection(&self, other: &Self) -> Self;
    /// The total area of the set.
    fn area(&self) -> i64;
    /// Whether the set is empty.
    fn is_empty(&self) -> bool;
    /// The merged outline polygons of the set, deterministically ordered.
    fn merged_polygons(&self) -> Vec<Polygon>;
    /// The merged regions of the set as `(outer, holes)` boundary pairs,
    /// ordered like [`PolygonEngine::merged_polygons`]. Engines that cannot
    /// trace holes may return every region with an empty hole list.
    fn merged_regions(&self) -> Vec<(Polygon, Vec<Polygon>)> {
        self.merged_polygons()
            .into_iter()
            .map(|p| (p, Vec::new()))
            .collect()
    }
    /// Whether a wire of the given width between two points fits in the
    /// set, returning the `(head, tail)` half-width end-extension flags of
    /// the first fitting variant.
    fn wire_fits(&self, p1: Point, p2: Point, width: i64) -> Option<(bool, bool)>;
}

impl PolygonEngine for PolySet {
    fn insert_rect(&mut self, rect: Rect) {
        PolySet::insert_rect(self, rect)
    }
    fn insert_polygon(&mut self, poly: &Polygon) {
        PolySet::insert_polygon(self, poly)
    }
    fn subtract_rect(&mut self, rect: Rect) {
        PolySet::subtract_rect(self, rect)
    }
    fn subtract_polygon(&mut self, poly: &Polygon) {
        PolySet::subtract_polygon(self, poly)
    }
    fn contains_point(&self, p: Point) -> bool {
        PolySet::contains_point(self, p)
    }
    fn contains_rect(&self, rect: Rect) -> bool {
        PolySet::contains_rect(self, rect)
    }
    fn contains_polygon(&self, poly: &Polygon) -> bool {
        PolySet::contains_polygon(self, poly)
    }
    fn intersects_rect(&self, rect: Rect) -> bool {
        PolySet::intersects_rect(self, rect)
    }
    fn intersection(&self, other: &Self) -> Self {
        PolySet::intersection(self, other)
    }
    fn area(&self) -> i64 {
        PolySet::area(self)
    }
    fn is_empty(&self) -> bool {
        PolySet::is_empty(self)
    }
    fn merged_polygons(&self) -> Vec<Polygon> {
        PolySet::outlines(self)
    }
    fn merged_regions(&self) -> Vec<(Polygon, Vec<Polygon>)> {
        PolySet::regions(self)
            .into_iter()
            .map(|r| (r.outer, r.holes))
            .collect()
    }
    fn wire_fits(&self, p1: Point, p2: Point, width: i64) -> Option<(bool, bool)> {
        PolySet::wire_fits(self, p1, p2, width)
    }
}

/// A mapping from canonical layer to its merged geometric region.
#[derive(Debug, Clone, Default)]
pub struct Merge<E: PolygonEngine> {
    layers: IndexMap<LayerId, E>,
}

impl<E: PolygonEngine> Merge<E> {
    /// Creates an empty merge.
    pub fn new() -> Self {
        Self {
            layers: IndexMap::new(),
        }
    }

    /// The engine for one layer, if any geometry was ever inserted there.
    pub fn layer(&self, layer: LayerId) -> Option<&E> {
        self.layers.get(&layer)
    }

    /// The engine for one layer, created empty on first use.
    pub fn layer_mut(&mut self, layer: LayerId) -> &mut E {
        self.layers.entry(layer).or_default()
    }

    /// Iterates over `(layer, engine)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (LayerId, &E)> {
        self.layers.iter().map(|(&l, e)| (l, e))
    }

    /// The layers present, in insertion order.
    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.keys().copied().collect()
    }

    /// Adds a rectangle on the given layer.
    pub fn insert_rect(&mut self, layer: LayerId, rect: Rect) {
        self.layer_mut(layer).insert_rect(rect);
    }

    /// Adds a polygon on the given layer.
    pub fn insert_polygon(&mut self, layer: LayerId, poly: &Polygon) {
        self.layer_mut(layer).insert_polygon(poly);
    }

    /// Removes a rectangle from the given layer.
    pub fn subtract_rect(&mut self, layer: LayerId, rect: Rect) {
        if let Some(e) = self.layers.get_mut(&layer) {
            e.subtract_rect(rect);
        }
    }

    /// Removes a polygon from the given layer.
    pub fn subtract_polygon(&mut self, layer: LayerId, poly: &Polygon) {
        if let Some(e) = self.layers.get_mut(&layer) {
            e.subtract_polygon(poly);
        }
    }

    /// Whether the given layer covers the point.
    pub fn contains_point(&self, layer: LayerId, p: Point) -> bool {
        self.layer(layer).is_some_and(|e| e.contains_point(p))
    }

    /// Whether the given layer fully covers the rectangle.
    pub fn contains_rect(&self, layer: LayerId, rect: Rect) -> bool {
        self.layer(layer).is_some_and(|e| e.contains_rect(rect))
    }

    /// The total area on the given layer.
    pub fn area(&self, layer: LayerId) -> i64 {
        self.layer(layer).map(|e| e.area()).unwrap_or(0)
    }

    /// The total area across all layers.
    pub fn total_area(&self) -> i64 {
        self.layers.values().map(|e| e.area()).sum()
    }

    /// Whether every layer is empty.
    pub fn is_empty(&self) -> bool {
        self.layers.values().all(|e| e.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_layer_bookkeeping() {
        let mut m: Merge<PolySet> = Merge::new();
        let a = LayerId(0);
        let b = LayerId(1);
        m.insert_rect(a, Rect::from_sides(0, 0, 10, 10));
        m.insert_rect(b, Rect::from_sides(0, 0, 4, 4));
        assert_eq!(m.area(a), 100);
        assert_eq!(m.total_area(), 116);
        m.subtract_rect(a, Rect::from_sides(0, 0, 10, 5));
        assert_eq!(m.area(a), 50);
        assert!(m.contains_point(a, Point::new(5, 7)));
        assert!(!m.contains_point(a, Point::new(5, 3)));
        // Subtracting from an untouched layer is a no-op, not a panic.
        m.subtract_rect(LayerId(9), Rect::from_sides(0, 0, 1, 1));
        assert!(!m.is_empty());
    }
}
