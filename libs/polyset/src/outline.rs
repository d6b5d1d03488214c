//! Outline reconstruction: tracing disjoint rectangles back into merged
//! boundary polygons.

use geometry::point::Point;
use geometry::polygon::Polygon;
use geometry::rect::Rect;
use geometry::span::Span;
use itertools::Itertools;

/// The full boundary of one connected component: its outer loop plus any
/// interior hole loops.
#[derive(Debug, Clone)]
pub struct RegionOutline {
    /// The outer boundary, counter-clockwise.
    pub outer: Polygon,
    /// Interior hole boundaries, clockwise as traced.
    pub holes: Vec<Polygon>,
}

/// Traces the boundary of each connected component of `rects`.
///
/// Components are connected through shared edge segments of positive length;
/// rectangles that only touch at a corner are separate components. Regions
/// are ordered by (bottom, left) of the outer-loop bounding box.
pub fn trace_regions(rects: &[Rect]) -> Vec<RegionOutline> {
    let mut regions = Vec::new();
    for component in components(rects) {
        let segments = boundary_segments(&component);
        let mut outer = None;
        let mut holes = Vec::new();
        for poly in chain_loops(segments) {
            // Our orientation convention traces outer loops CCW and holes CW.
            if poly.double_signed_area() > 0 {
                outer = Some(poly);
            } else {
                holes.push(poly);
            }
        }
        if let Some(outer) = outer {
            regions.push(RegionOutline { outer, holes });
        }
    }
    regions.sort_by_key(|r| {
        let b = r.outer.bbox().expect("outline polygons are non-empty");
        (b.bot(), b.left())
    });
    regions
}

/// The outer boundaries of [`trace_regions`], without their holes.
pub fn trace_outlines(rects: &[Rect]) -> Vec<Polygon> {
    trace_regions(rects).into_iter().map(|r| r.outer).collect()
}

/// Splits `rects` into edge-connected components.
fn components(rects: &[Rect]) -> Vec<Vec<Rect>> {
    let n = rects.len();
    let mut assigned = vec![usize::MAX; n];
    let mut count = 0;
    for i in 0..n {
        if assigned[i] != usize::MAX {
            continue;
        }
        let comp = count;
        count += 1;
        let mut stack = vec![i];
        assigned[i] = comp;
        while let Some(a) = stack.pop() {
            for b in 0..n {
                if assigned[b] == usize::MAX && edge_connected(rects[a], rects[b]) {
                    assigned[b] = comp;
                    stack.push(b);
                }
            }
        }
    }
    let mut out = vec![Vec::new(); count];
    for (i, &c) in assigned.iter().enumerate() {
        out[c].push(rects[i]);
    }
    out
}

/// Whether two disjoint rectangles share an edge segment of positive length.
fn edge_connected(a: Rect, b: Rect) -> bool {
    match a.intersection(b) {
        Some(ix) => ix.width() > 0 || ix.height() > 0,
        None => false,
    }
}

/// An oriented axis-aligned boundary segment. Traversal keeps the component
/// interior on the left, so outer loops come out counter-clockwise.
#[derive(Debug, Clone, Copy)]
struct Segment {
    start: Point,
    end: Point,
}

fn boundary_segments(rects: &[Rect]) -> Vec<Segment> {
    let mut segs = Vec::new();
    for r in rects {
        // Left edge: exposed where no neighbor ends at this x. Interior is to
        // the east, so traversal runs north-to-south.
        for s in exposed(
            r.vspan(),
            rects
                .iter()
                .filter(|o| o.right() == r.left())
                .map(|o| o.vspan()),
        ) {
            segs.push(Segment {
                start: Point::new(r.left(), s.stop()),
                end: Point::new(r.left(), s.start()),
            });
        }
        // Right edge: south-to-north.
        for s in exposed(
            r.vspan(),
            rects
                .iter()
                .filter(|o| o.left() == r.right())
                .map(|o| o.vspan()),
        ) {
            segs.push(Segment {
                start: Point::new(r.right(), s.start()),
                end: Point::new(r.right(), s.stop()),
            });
        }
        // Bottom edge: west-to-east.
        for s in exposed(
            r.hspan(),
            rects
                .iter()
                .filter(|o| o.top() == r.bot())
                .map(|o| o.hspan()),
        ) {
            segs.push(Segment {
                start: Point::new(s.start(), r.bot()),
                end: Point::new(s.stop(), r.bot()),
            });
        }
        // Top edge: east-to-west.
        for s in exposed(
            r.hspan(),
            rects
                .iter()
                .filter(|o| o.bot() == r.top())
                .map(|o| o.hspan()),
        ) {
            segs.push(Segment {
                start: Point::new(s.stop(), r.top()),
                end: Point::new(s.start(), r.top()),
            });
        }
    }
    segs
}

/// The sub-spans of `span` not covered by any of `covers`.
fn exposed(span: Span, covers: impl Iterator<Item = Span>) -> Vec<Span> {
    let mut remaining = vec![span];
    for c in covers {
        remaining = remaining
            .into_iter()
            .flat_map(|s| {
                let mut out = Vec::new();
                match s.intersection(c) {
                    Some(ix) if ix.length() > 0 => {
                        if s.start() < ix.start() {
                            out.push(Span::new(s.start(), ix.start()));
                        }
                        if ix.stop() < s.stop() {
                            out.push(Span::new(ix.stop(), s.stop()));
                        }
                    }
                    _ => out.push(s),
                }
                out
            })
            .collect();
    }
    remaining.retain(|s| s.length() > 0);
    remaining
}

/// Chains oriented segments into closed loops, merging collinear runs.
fn chain_loops(segments: Vec<Segment>) -> Vec<Polygon> {
    let mut used = vec![false; segments.len()];
    let mut loops = Vec::new();
    loop {
        // Deterministic starting segment: smallest unused start point.
        let Some(first) = (0..segments.len())
            .filter(|&i| !used[i])
            .sorted_by_key(|&i| (segments[i].start, segments[i].end))
            .next()
        else {
            break;
        };
        let mut verts: Vec<Point> = vec![segments[first].start];
        let mut cur = first;
        used[first] = true;
        loop {
            let end = segments[cur].end;
            push_vertex(&mut verts, segments[cur].start, end);
            if end == verts[0] {
                break;
            }
            let incoming = direction(segments[cur]);
            // At a degenerate crossing vertex, prefer the sharpest left turn
            // so the trace hugs the interior.
            let next = (0..segments.len())
                .filter(|&i| !used[i] && segments[i].start == end)
                .min_by_key(|&i| turn_rank(incoming, direction(segments[i])));
            match next {
                Some(i) => {
                    used[i] = true;
                    cur = i;
                }
                // Open chain; abandon it rather than emit a bad polygon.
                None => {
                    verts.clear();
                    break;
                }
            }
        }
        if verts.len() >= 4 {
            // The closing vertex duplicates the start; drop it, and drop the
            // start too if the closing run is collinear with the first edge.
            verts.pop();
            if verts.len() >= 3 {
                let n = verts.len();
                if collinear(verts[n - 1], verts[0], verts[1]) {
                    verts.remove(0);
                }
                loops.push(Polygon::from_verts(verts));
            }
        }
    }
    loops
}

fn direction(s: Segment) -> (i64, i64) {
    ((s.end.x - s.start.x).signum(), (s.end.y - s.start.y).signum())
}

/// Ranks an outgoing direction relative to `incoming`: left turn, straight,
/// right turn, then u-turn.
fn turn_rank(incoming: (i64, i64), outgoing: (i64, i64)) -> u8 {
    let cross = incoming.0 * outgoing.1 - incoming.1 * outgoing.0;
    let dot = incoming.0 * outgoing.0 + incoming.1 * outgoing.1;
    match (cross, dot) {
        (c, _) if c > 0 => 0,
        (0, d) if d > 0 => 1,
        (c, _) if c < 0 => 2,
        _ => 3,
    }
}

fn collinear(a: Point, b: Point, c: Point) -> bool {
    (b.x - a.x) * (c.y - a.y) == (b.y - a.y) * (c.x - a.x)
}

/// Appends `end`, merging it into the previous edge when collinear.
fn push_vertex(verts: &mut Vec<Point>, start: Point, end: Point) {
    let n = verts.len();
    if n >= 2 && collinear(verts[n - 2], start, end) {
        verts[n - 1] = end;
    } else {
        verts.push(end);
    }
}
