//! Decomposition of polygons into horizontal rectangle slabs.
//!
//! Slab boundaries are the distinct vertex y-coordinates, so a rectilinear
//! polygon decomposes exactly. For polygons with angled edges two variants
//! exist: a *fill* decomposition that crosses each slab at its mid-line (an
//! approximation of the enclosed area) and a *cover* decomposition that
//! rounds each slab outward to the edge extremes (a superset of the enclosed
//! area, suitable for conservative containment tests).

use geometry::point::Point;
use geometry::polygon::Polygon;
use geometry::rect::Rect;
use itertools::Itertools;

/// Decomposes `poly` into slab rectangles approximating its area.
///
/// Exact for rectilinear polygons.
pub fn decompose_fill(poly: &Polygon) -> Vec<Rect> {
    decompose(poly, Mode::Fill)
}

/// Decomposes `poly` into slab rectangles covering its area.
///
/// Exact for rectilinear polygons; a superset otherwise.
pub fn decompose_cover(poly: &Polygon) -> Vec<Rect> {
    decompose(poly, Mode::Cover)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Fill,
    Cover,
}

/// One edge crossing of a slab: its x at the slab mid-line and its x extent
/// within the slab.
struct Crossing {
    x_mid: f64,
    x_min: f64,
    x_max: f64,
}

fn decompose(poly: &Polygon, mode: Mode) -> Vec<Rect> {
    let points = poly.points();
    if points.len() < 3 {
        return Vec::new();
    }
    let ys: Vec<i64> = points.iter().map(|p| p.y).sorted().dedup().collect();

    let mut rects = Vec::new();
    for (&y0, &y1) in ys.iter().tuple_windows() {
        let mut crossings: Vec<Crossing> = poly
            .edges()
            .filter_map(|e| slab_crossing(e.start, e.end, y0, y1))
            .collect();
        crossings.sort_by(|a, b| a.x_mid.total_cmp(&b.x_mid));
        // Even-odd pairing: each (enter, exit) pair bounds one interior run.
        for pair in crossings.chunks_exact(2) {
            let (left, right) = (&pair[0], &pair[1]);
            let (xl, xr) = match mode {
                Mode::Fill => (left.x_mid.round() as i64, right.x_mid.round() as i64),
                Mode::Cover => (left.x_min.floor() as i64, right.x_max.ceil() as i64),
            };
            if xl < xr {
                rects.push(Rect::from_sides(xl, y0, xr, y1));
            }
        }
    }
    rects
}

/// The crossing of edge `a`-`b` through slab `[y0, y1]`, if its span covers
/// the slab interior.
fn slab_crossing(a: Point, b: Point, y0: i64, y1: i64) -> Option<Crossing> {
    if a.y == b.y {
        return None;
    }
    let (lo, hi) = (a.y.min(b.y), a.y.max(b.y));
    // Slab boundaries are vertex ys, so an edge overlapping the slab
    // interior covers the whole slab.
    if lo > y0 || hi < y1 {
        return None;
    }
    let x_at = |y: f64| -> f64 {
        let t = (y - a.y as f64) / (b.y as f64 - a.y as f64);
        a.x as f64 + t * (b.x as f64 - a.x as f64)
    };
    let x_bot = x_at(y0 as f64);
    let x_top = x_at(y1 as f64);
    Some(Crossing {
        x_mid: x_at((y0 + y1) as f64 / 2.0),
        x_min: x_bot.min(x_top),
        x_max: x_bot.max(x_top),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectilinear_is_exact() {
        let poly = Polygon::from_verts(vec![
            Point::new(0, 0),
            Point::new(20, 0),
            Point::new(20, 10),
            Point::new(10, 10),
            Point::new(10, 20),
            Point::new(0, 20),
        ]);
        let fill = decompose_fill(&poly);
        assert_eq!(fill.iter().map(|r| r.area()).sum::<i64>(), 300);
        let cover = decompose_cover(&poly);
        assert_eq!(cover.iter().map(|r| r.area()).sum::<i64>(), 300);
    }

    #[test]
    fn angled_cover_contains_fill() {
        // A 45-degree parallelogram.
        let poly = Polygon::from_verts(vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(30, 20),
            Point::new(20, 20),
        ]);
        let fill = decompose_fill(&poly);
        let cover = decompose_cover(&poly);
        assert!(!fill.is_empty());
        for f in &fill {
            assert!(
                cover.iter().any(|c| c.contains_rect(*f)),
                "fill slab {f:?} not covered"
            );
        }
    }

    #[test]
    fn degenerate_inputs() {
        assert!(decompose_fill(&Polygon::from_verts(vec![])).is_empty());
        assert!(decompose_fill(&Polygon::from_verts(vec![
            Point::new(0, 0),
            Point::new(5, 0),
        ]))
        .is_empty());
    }
}
