//! Centerline skeletonization: collapsing a wire-shaped polygon into a
//! minimal set of oriented rectangular spans.
//!
//! The skeleton is found iteratively: pair up parallel boundary edges,
//! project them onto a shared centerline, keep the largest overlap extents
//! that still fit the original geometry, subtract what was claimed, and
//! repeat on the residue until a pass adds nothing. A final extension pass
//! snaps nearby endpoints together (marking them as hubs) and splits lines
//! crossed in their interior.

use geometry::point::Point;
use geometry::polygon::Polygon;
use geometry::rect::Rect;
use geometry::snap::snap_to_grid;
use geometry::span::Span;
use itertools::Itertools;

use crate::config::{ExtractionConfig, HalfWidthMode};
use crate::merge::PolygonEngine;

/// An oriented rectangular span: part of a wire-shaped polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Centerline {
    /// The span's starting point.
    pub start: Point,
    /// The span's ending point.
    pub end: Point,
    /// The span width.
    pub width: i64,
    /// Whether the start abuts another centerline rather than free space.
    pub head_hub: bool,
    /// Whether the end abuts another centerline rather than free space.
    pub tail_hub: bool,
}

impl Centerline {
    pub(crate) fn new(start: Point, end: Point, width: i64) -> Self {
        Self {
            start,
            end,
            width,
            head_hub: false,
            tail_hub: false,
        }
    }

    /// The squared span length.
    pub fn length_sq(&self) -> i64 {
        self.start.dist_sq(self.end)
    }

    /// Whether this span runs parallel to an axis.
    pub fn is_axis_aligned(&self) -> bool {
        self.start.x == self.end.x || self.start.y == self.end.y
    }

    /// The axis-aligned footprint, when the span is axis-aligned.
    pub fn footprint_rect(&self) -> Option<Rect> {
        if !self.is_axis_aligned() {
            return None;
        }
        let r = Rect::from_corners(self.start, self.end);
        Some(if self.start.y == self.end.y {
            Rect::from_spans(
                r.hspan(),
                Span::from_center_and_length(r.vspan().center(), self.width),
            )
        } else {
            Rect::from_spans(
                Span::from_center_and_length(r.hspan().center(), self.width),
                r.vspan(),
            )
        })
    }

    /// The footprint as a polygon, handling angled spans.
    pub fn footprint_polygon(&self) -> Polygon {
        if let Some(r) = self.footprint_rect() {
            return Polygon::from_rect(r);
        }
        let dx = (self.end.x - self.start.x) as f64;
        let dy = (self.end.y - self.start.y) as f64;
        let len = (dx * dx + dy * dy).sqrt();
        let (ux, uy) = (dx / len, dy / len);
        let (nx, ny) = (-uy, ux);
        let h = self.width as f64 / 2.0;
        let corners = [
            (self.start.x as f64 + nx * h, self.start.y as f64 + ny * h),
            (self.start.x as f64 - nx * h, self.start.y as f64 - ny * h),
            (self.end.x as f64 - nx * h, self.end.y as f64 - ny * h),
            (self.end.x as f64 + nx * h, self.end.y as f64 + ny * h),
        ];
        Polygon::from_verts(
            corners
                .iter()
                .map(|&(x, y)| Point::new(x.round() as i64, y.round() as i64))
                .collect(),
        )
    }

    /// The loose bounding box used for pairwise-intersection screening.
    pub(crate) fn loose_bbox(&self) -> Rect {
        Rect::from_corners(self.start, self.end).expand_all(self.width)
    }
}

/// Reduces one merged polygon to centerline spans.
///
/// `original` is the layer's original (unmodified) region; every produced
/// span fits inside it. Spans narrower than `min_width` are not produced.
pub(crate) fn skeletonize<E: PolygonEngine>(
    region: &Polygon,
    min_width: i64,
    original: &E,
    cfg: &ExtractionConfig,
) -> Vec<Centerline> {
    let mut residual = E::default();
    residual.insert_polygon(region);
    let mut claimed = E::default();
    let mut accepted: Vec<Centerline> = Vec::new();

    let mut prev_area = residual.area();
    loop {
        let polys = residual.merged_polygons();
        if polys.is_empty() {
            break;
        }
        let mut candidates: Vec<Centerline> = polys
            .iter()
            .flat_map(|p| candidate_lines(p, min_width, original))
            .collect();
        if candidates.is_empty() {
            break;
        }
        // Longest candidates claim area first.
        candidates.sort_by_key(|c| std::cmp::Reverse((c.length_sq(), c.width)));
        let mut pass: Vec<Centerline> = Vec::new();
        for cand in candidates {
            let fp = cand.footprint_polygon();
            if claimed.contains_polygon(&fp) {
                // Redundant: an earlier, longer span already covers this.
                continue;
            }
            claimed.insert_polygon(&fp);
            pass.push(cand);
        }
        if pass.is_empty() {
            break;
        }
        for line in &pass {
            residual.subtract_polygon(&line.footprint_polygon());
        }
        accepted.extend(pass);
        let area = residual.area();
        if area == 0 || area >= prev_area {
            break;
        }
        prev_area = area;
    }

    // Wider spans are more authoritative and realized first downstream.
    accepted.sort_by_key(|c| std::cmp::Reverse((c.width, c.length_sq())));
    extension_pass(&mut accepted, original);
    for line in &mut accepted {
        grid_align(line, cfg.routing_grid, cfg.half_width);
    }
    accepted.retain(|l| l.start != l.end);
    accepted
}

/// Candidate spans from parallel boundary-edge pairs of one polygon.
fn candidate_lines<E: PolygonEngine>(
    poly: &Polygon,
    min_width: i64,
    original: &E,
) -> Vec<Centerline> {
    let edges: Vec<_> = poly.edges().collect();
    let mut out = Vec::new();
    let by_class = edges
        .iter()
        .map(|e| (e.angle_class(), *e))
        .into_group_map();
    for (class, group) in by_class.into_iter().sorted_by_key(|(c, _)| *c) {
        for (a, b) in group.iter().tuple_combinations() {
            let cand = if class == 0 || class == 900 {
                axis_pair_candidate(class == 0, a.start, a.end, b.start, b.end, min_width, original)
            } else {
                angled_pair_candidate(class, a.start, a.end, b.start, b.end, min_width, original)
            };
            if let Some(c) = cand {
                out.push(c);
            }
        }
    }
    out
}

/// The best span between one pair of parallel axis-aligned edges.
fn axis_pair_candidate<E: PolygonEngine>(
    horizontal: bool,
    a0: Point,
    a1: Point,
    b0: Point,
    b1: Point,
    min_width: i64,
    original: &E,
) -> Option<Centerline> {
    let (cross_a, cross_b) = if horizontal { (a0.y, b0.y) } else { (a0.x, b0.x) };
    let width = (cross_a - cross_b).abs();
    if width == 0 || width < min_width {
        return None;
    }
    let center = (cross_a + cross_b) / 2;
    let ra = if horizontal {
        Span::new(a0.x, a1.x)
    } else {
        Span::new(a0.y, a1.y)
    };
    let rb = if horizontal {
        Span::new(b0.x, b1.x)
    } else {
        Span::new(b0.y, b1.y)
    };
    // Extents to try, largest first: full union, the two mixed extents,
    // then the inner overlap.
    let mut extents = vec![ra.union(rb)];
    extents.push(Span::new(ra.start(), rb.stop()));
    extents.push(Span::new(rb.start(), ra.stop()));
    if let Some(ix) = ra.intersection(rb) {
        extents.push(ix);
    }
    extents.sort_by_key(|s| std::cmp::Reverse(s.length()));
    extents.dedup();
    for extent in extents {
        if extent.length() == 0 {
            continue;
        }
        let mut line = if horizontal {
            Centerline::new(
                Point::new(extent.start(), center),
                Point::new(extent.stop(), center),
                width,
            )
        } else {
            Centerline::new(
                Point::new(center, extent.start()),
                Point::new(center, extent.stop()),
                width,
            )
        };
        // A span wider than it is long is a sideways wire: re-quantize it
        // into a long-thin span across the pair.
        if width > extent.length() {
            let mid = extent.center();
            line = if horizontal {
                Centerline::new(
                    Point::new(mid, center - width / 2),
                    Point::new(mid, center - width / 2 + width),
                    extent.length(),
                )
            } else {
                Centerline::new(
                    Point::new(center - width / 2, mid),
                    Point::new(center - width / 2 + width, mid),
                    extent.length(),
                )
            };
            if line.width < min_width {
                continue;
            }
        }
        if original.contains_polygon(&line.footprint_polygon()) {
            return Some(line);
        }
    }
    None
}

/// The best span between one pair of parallel angled edges.
fn angled_pair_candidate<E: PolygonEngine>(
    class: i64,
    a0: Point,
    a1: Point,
    b0: Point,
    b1: Point,
    min_width: i64,
    original: &E,
) -> Option<Centerline> {
    let theta = (class as f64 / 10.0).to_radians();
    let (ux, uy) = (theta.cos(), theta.sin());
    let (nx, ny) = (-uy, ux);
    let t = |p: Point| p.x as f64 * ux + p.y as f64 * uy;
    let o = |p: Point| p.x as f64 * nx + p.y as f64 * ny;
    let oa = (o(a0) + o(a1)) / 2.0;
    let ob = (o(b0) + o(b1)) / 2.0;
    let width = (oa - ob).abs().round() as i64;
    if width == 0 || width < min_width {
        return None;
    }
    let oc = (oa + ob) / 2.0;
    let (ta0, ta1) = (t(a0).min(t(a1)), t(a0).max(t(a1)));
    let (tb0, tb1) = (t(b0).min(t(b1)), t(b0).max(t(b1)));
    let mut extents = vec![
        (ta0.min(tb0), ta1.max(tb1)),
        (ta0, tb1),
        (tb0, ta1),
        (ta0.max(tb0), ta1.min(tb1)),
    ];
    extents.sort_by(|x, y| (y.1 - y.0).total_cmp(&(x.1 - x.0)));
    for (lo, hi) in extents {
        if hi - lo < 1.0 {
            continue;
        }
        let at = |s: f64| Point::new((ux * s + nx * oc).round() as i64, (uy * s + ny * oc).round() as i64);
        let line = Centerline::new(at(lo), at(hi), width);
        if original.contains_polygon(&line.footprint_polygon()) {
            return Some(line);
        }
    }
    None
}

/// Snaps nearby centerline endpoints to their mutual intersection (marking
/// hubs) and splits lines crossed deep in their interior.
fn extension_pass<E: PolygonEngine>(lines: &mut Vec<Centerline>, original: &E) {
    let mut i = 0;
    while i < lines.len() {
        let mut j = i + 1;
        while j < lines.len() {
            if lines[i].loose_bbox().touches(lines[j].loose_bbox()) {
                if let Some(p) = line_intersection(&lines[i], &lines[j]) {
                    // Splitting may append; handle each side independently.
                    attach(lines, i, p, original);
                    attach(lines, j, p, original);
                }
            }
            j += 1;
        }
        i += 1;
    }
}

/// The intersection point of the two infinite lines, if not parallel.
fn line_intersection(a: &Centerline, b: &Centerline) -> Option<Point> {
    let (x1, y1) = (a.start.x as f64, a.start.y as f64);
    let (x2, y2) = (a.end.x as f64, a.end.y as f64);
    let (x3, y3) = (b.start.x as f64, b.start.y as f64);
    let (x4, y4) = (b.end.x as f64, b.end.y as f64);
    let denom = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
    if denom.abs() < 1e-9 {
        return None;
    }
    let tn = (x1 - x3) * (y3 - y4) - (y1 - y3) * (x3 - x4);
    let t = tn / denom;
    Some(Point::new(
        (x1 + t * (x2 - x1)).round() as i64,
        (y1 + t * (y2 - y1)).round() as i64,
    ))
}

/// Connects line `idx` to the junction point `p`: split when `p` lies deep
/// in the interior, otherwise snap the nearer endpoint (when the extension
/// still fits the original geometry).
fn attach<E: PolygonEngine>(lines: &mut Vec<Centerline>, idx: usize, p: Point, original: &E) {
    let line = lines[idx];
    let dx = (line.end.x - line.start.x) as f64;
    let dy = (line.end.y - line.start.y) as f64;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return;
    }
    let t = ((p.x - line.start.x) as f64 * dx + (p.y - line.start.y) as f64 * dy) / len;
    let near = line.width as f64;
    if t > near && t < len - near {
        // Interior crossing: split into two spans, both hubs at `p`.
        let mut head = line;
        head.end = p;
        head.tail_hub = true;
        let mut tail = line;
        tail.start = p;
        tail.head_hub = true;
        lines[idx] = head;
        lines.push(tail);
        return;
    }
    // Snap the nearer endpoint, keeping the span only if it still fits.
    let head_nearer = t < len / 2.0;
    let mut extended = line;
    if head_nearer {
        extended.start = p;
        extended.head_hub = true;
    } else {
        extended.end = p;
        extended.tail_hub = true;
    }
    if extended.start == extended.end {
        return;
    }
    if original.contains_polygon(&extended.footprint_polygon()) {
        lines[idx] = extended;
    }
}

/// Snaps a centerline's endpoints onto the routing grid.
fn grid_align(line: &mut Centerline, grid: i64, mode: HalfWidthMode) {
    if grid <= 1 {
        return;
    }
    let half = match mode {
        HalfWidthMode::Ignore => 0,
        HalfWidthMode::Compensate => line.width / 2,
    };
    let align = |c: i64| snap_to_grid(c - half, grid) + half;
    // Hub endpoints stay put: they must keep meeting their junction.
    if !line.head_hub {
        line.start = Point::new(align(line.start.x), align(line.start.y));
    }
    if !line.tail_hub {
        line.end = Point::new(align(line.end.x), align(line.end.y));
    }
}
