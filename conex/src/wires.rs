//! Wire realization: turning skeleton centerlines into routed arcs.
//!
//! Each connectable layer remaining in the working merge is skeletonized;
//! every centerline becomes an arc between two resolved ports. Ports prefer
//! an existing node at the endpoint, then a sub-cell instance (synthesizing
//! an export on the extracted child when needed), and finally a fresh pin.
//! Realized footprints are subtracted from the working merge; whatever
//! cannot carry a wire is left for leftover conversion.

use arcstr::ArcStr;
use diagnostics::IssueSet;
use geometry::point::Point;
use geometry::polygon::Polygon;
use geometry::rect::Rect;
use geometry::snap::{on_grid, snap_to_grid_down};
use slotmap::SecondaryMap;
use tracing::{debug, trace};

use crate::cell::{
    node_connects_to, ArcEnd, ArcInst, Cell, CellKey, Element, ElementKey, Export, Node, NodeKind,
    Orient,
};
use crate::config::ExtractionConfig;
use crate::error::{ExtractionError, Result};
use crate::gather::Gathered;
use crate::issue::ExtractionIssue;
use crate::job::Job;
use crate::merge::PolygonEngine;
use crate::skeleton::{skeletonize, Centerline};
use crate::tech::{LayerId, Technology};
use crate::Extracted;

/// Realizes wires on every connectable layer of the working merge.
#[allow(clippy::too_many_arguments)]
pub(crate) fn extract_wires<T: Technology + ?Sized, E: PolygonEngine>(
    cell_name: &ArcStr,
    children: &mut SecondaryMap<CellKey, Extracted>,
    g: &mut Gathered<E>,
    tech: &T,
    cfg: &ExtractionConfig,
    out: &mut Cell,
    issues: &mut IssueSet<ExtractionIssue>,
    job: &mut dyn Job,
    progress: (u8, u8),
) -> Result<()> {
    let layers: Vec<LayerId> = g
        .working
        .layer_ids()
        .into_iter()
        .filter(|&l| tech.function(l).is_connectable())
        .collect();
    let mut arcs = 0usize;

    for (li, &layer) in layers.iter().enumerate() {
        job.set_progress(stage_progress(progress, li, layers.len()));
        if job.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }
        let min_width = tech.min_wire_width(layer).max(1);
        let regions = match g.working.layer(layer) {
            Some(e) if !e.is_empty() => e.merged_polygons(),
            _ => continue,
        };
        let Some(original) = g.original.layer(layer) else {
            continue;
        };
        let original = original.clone();

        for region in regions {
            let lines = skeletonize(&region, min_width, &original, cfg);
            if lines.is_empty() {
                let loc = region.bbox().map(|b| b.center()).unwrap_or_default();
                issues.add(
                    ExtractionIssue::warn(
                        cell_name.clone(),
                        loc,
                        "geometry too narrow to carry a wire",
                    )
                    .with_layers([tech.layer_name(layer)]),
                );
                continue;
            }
            for line in lines {
                realize_arc(
                    &line, layer, &original, children, g, tech, cfg, out,
                )?;
                arcs += 1;
            }
        }
    }

    debug!(cell = %cell_name, arcs, "wire realization complete");
    job.set_progress(progress.1);
    Ok(())
}

/// Realizes one centerline as an arc, trying widths from the skeleton width
/// down a grid ladder to a connectivity-only zero-width arc.
#[allow(clippy::too_many_arguments)]
fn realize_arc<T: Technology + ?Sized, E: PolygonEngine>(
    line: &Centerline,
    layer: LayerId,
    original: &E,
    children: &mut SecondaryMap<CellKey, Extracted>,
    g: &mut Gathered<E>,
    tech: &T,
    cfg: &ExtractionConfig,
    out: &mut Cell,
) -> Result<()> {
    let mut width = 0;
    let mut ext = (false, false);
    for w in width_ladder(line.width, cfg.routing_grid) {
        if w == 0 {
            break;
        }
        if let Some(flags) = original.wire_fits(line.start, line.end, w) {
            width = w;
            ext = flags;
            break;
        }
    }
    ext = (
        grid_vetoed_extension(ext.0, line.start, width, cfg.routing_grid),
        grid_vetoed_extension(ext.1, line.end, width, cfg.routing_grid),
    );

    let head = resolve_port(out, children, tech, layer, line.start);
    let tail = resolve_port(out, children, tech, layer, line.end);
    trace!(?layer, width, start = ?line.start, end = ?line.end, "realized arc");
    out.add_arc(ArcInst {
        layer,
        width,
        head: ArcEnd {
            node: head,
            loc: line.start,
            extended: ext.0,
        },
        tail: ArcEnd {
            node: tail,
            loc: line.end,
            extended: ext.1,
        },
    });
    if width > 0 {
        g.working
            .subtract_polygon(layer, &arc_polygon(line, width, ext.0, ext.1));
    }
    Ok(())
}

/// Widths to try: the skeleton width, its grid snap, one grid step below,
/// then zero.
fn width_ladder(w: i64, grid: i64) -> Vec<i64> {
    let mut out = vec![w];
    if grid > 1 {
        let snapped = snap_to_grid_down(w, grid);
        if snapped > 0 && !out.contains(&snapped) {
            out.push(snapped);
        }
        if snapped - grid > 0 && !out.contains(&(snapped - grid)) {
            out.push(snapped - grid);
        }
    }
    out.push(0);
    out
}

/// An extension is dropped when it would move an on-grid wire end to an
/// off-grid position.
fn grid_vetoed_extension(flag: bool, loc: Point, width: i64, grid: i64) -> bool {
    if !flag || grid <= 1 {
        return flag;
    }
    let endpoint_on_grid = on_grid(loc.x, grid) && on_grid(loc.y, grid);
    let half_on_grid = (width / 2) % grid == 0;
    !(endpoint_on_grid && !half_on_grid) && flag
}

/// The drawn footprint of an arc, with half-width extensions where flagged.
fn arc_polygon(line: &Centerline, width: i64, head_ext: bool, tail_ext: bool) -> Polygon {
    let half = width / 2;
    let extend = |from: Point, toward: Point, by: i64| -> Point {
        let dx = (from.x - toward.x) as f64;
        let dy = (from.y - toward.y) as f64;
        let len = (dx * dx + dy * dy).sqrt();
        if len == 0.0 {
            return from;
        }
        Point::new(
            from.x + (dx / len * by as f64).round() as i64,
            from.y + (dy / len * by as f64).round() as i64,
        )
    };
    let start = if head_ext {
        extend(line.start, line.end, half)
    } else {
        line.start
    };
    let end = if tail_ext {
        extend(line.end, line.start, half)
    } else {
        line.end
    };
    Centerline::new(start, end, width).footprint_polygon()
}

/// Resolves the port for an arc end: an existing connectable node, then a
/// sub-cell instance (with a synthesized child export), then a fresh pin.
pub(crate) fn resolve_port<T: Technology + ?Sized>(
    out: &mut Cell,
    children: &mut SecondaryMap<CellKey, Extracted>,
    tech: &T,
    layer: LayerId,
    p: Point,
) -> ElementKey {
    if let Some(key) = find_port(out, tech, layer, p) {
        return key;
    }
    let inst = out
        .instances()
        .find(|(_, i)| i.bbox.contains_point(p))
        .map(|(k, i)| (k, i.cell, i.loc, i.orient));
    if let Some((key, child, loc, orient)) = inst {
        let local = orient.inverse().apply(p - loc);
        ensure_child_export(children, tech, child, local, layer);
        return key;
    }
    out.add_node(Node {
        kind: NodeKind::Pin(layer),
        bbox: Rect::from_point(p),
        orient: Orient::R0,
        outline: None,
        holes: Vec::new(),
    })
}

/// An existing element of `out` offering a port on `layer` at `p`.
pub(crate) fn find_port<T: Technology + ?Sized>(
    out: &Cell,
    tech: &T,
    layer: LayerId,
    p: Point,
) -> Option<ElementKey> {
    out.nodes()
        .find(|(_, n)| n.bbox.contains_point(p) && node_connects_to(tech, n.kind, layer))
        .map(|(k, _)| k)
}

/// Guarantees the extracted child cell exports a port on `layer` at the
/// child-local point `p`, creating a pin if nothing connectable is there.
pub(crate) fn ensure_child_export<T: Technology + ?Sized>(
    children: &mut SecondaryMap<CellKey, Extracted>,
    tech: &T,
    cell: CellKey,
    p: Point,
    layer: LayerId,
) {
    enum Resolution {
        Done,
        At(ElementKey),
        Descend(ElementKey, CellKey, Point),
        NewPin,
    }
    // Resolve with the child borrowed immutably, then mutate.
    let resolution = {
        let Some(extracted) = children.get(cell) else {
            return;
        };
        let cell = &extracted.cell;
        if cell.exports.iter().any(|e| e.loc == p && e.layer == layer) {
            Resolution::Done
        } else if let Some(k) = find_port(cell, tech, layer, p) {
            Resolution::At(k)
        } else if let Some(end) = cell.arcs().find_map(|(_, a)| {
            (a.layer == layer && (a.head.loc == p || a.tail.loc == p)).then_some(
                if a.head.loc == p {
                    a.head.node
                } else {
                    a.tail.node
                },
            )
        }) {
            Resolution::At(end)
        } else if let Some((k, child, loc, orient)) = cell
            .instances()
            .find(|(_, i)| i.bbox.contains_point(p))
            .map(|(k, i)| (k, i.cell, i.loc, i.orient))
        {
            Resolution::Descend(k, child, orient.inverse().apply(p - loc))
        } else {
            Resolution::NewPin
        }
    };
    match resolution {
        Resolution::Done => {}
        Resolution::At(at) => {
            if let Some(extracted) = children.get_mut(cell) {
                add_export(&mut extracted.cell, at, p, layer);
            }
        }
        Resolution::Descend(at, child, local) => {
            // The connection lands on a grandchild.
            ensure_child_export(children, tech, child, local, layer);
            if let Some(extracted) = children.get_mut(cell) {
                add_export(&mut extracted.cell, at, p, layer);
            }
        }
        Resolution::NewPin => {
            if let Some(extracted) = children.get_mut(cell) {
                let at = extracted.cell.add_node(Node {
                    kind: NodeKind::Pin(layer),
                    bbox: Rect::from_point(p),
                    orient: Orient::R0,
                    outline: None,
                    holes: Vec::new(),
                });
                add_export(&mut extracted.cell, at, p, layer);
            }
        }
    }
}

fn add_export(cell: &mut Cell, at: ElementKey, p: Point, layer: LayerId) {
    let name: ArcStr = arcstr::format!("__port{}", cell.exports.len());
    cell.exports.push(Export {
        name,
        at,
        loc: p,
        layer,
    });
    debug_assert!(matches!(
        cell.elements.get(at),
        Some(Element::Node(_) | Element::Arc(_) | Element::Instance(_))
    ));
}

fn stage_progress(range: (u8, u8), done: usize, total: usize) -> u8 {
    if total == 0 {
        return range.1;
    }
    let span = (range.1 - range.0) as usize;
    range.0 + (span * done.min(total) / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Library, PureShape, Shape, SourceCell};
    use crate::gather::gather;
    use crate::job::NoJob;
    use crate::tech::example::ExampleTech;
    use polyset::PolySet;

    fn rect_shape(layer: LayerId, l: i64, b: i64, r: i64, t: i64) -> PureShape {
        PureShape {
            layer,
            shape: Shape::Rect(Rect::from_sides(l, b, r, t)),
        }
    }

    fn run(cell: SourceCell) -> (Cell, IssueSet<ExtractionIssue>, Gathered<PolySet>) {
        let tech = ExampleTech::new();
        let mut lib = Library::new();
        let name = cell.name.clone();
        let key = lib.add_cell(cell);
        let cfg = ExtractionConfig::default();
        let mut g: Gathered<PolySet> = gather(&lib, key, &tech, &cfg).unwrap();
        let mut out = Cell::new(name.clone());
        let mut issues = IssueSet::new();
        let mut children = SecondaryMap::new();
        extract_wires(
            &name,
            &mut children,
            &mut g,
            &tech,
            &cfg,
            &mut out,
            &mut issues,
            &mut NoJob,
            (65, 85),
        )
        .unwrap();
        (out, issues, g)
    }

    #[test]
    fn bar_becomes_arc_between_pins() {
        let mut cell = SourceCell::new("c");
        cell.shapes.push(rect_shape(ExampleTech::MET1, 0, 0, 100, 10));
        let (out, issues, g) = run(cell);
        assert!(issues.is_empty(), "{issues:?}");
        let arcs: Vec<_> = out.arcs().collect();
        assert_eq!(arcs.len(), 1);
        let arc = arcs[0].1;
        assert_eq!(arc.layer, ExampleTech::MET1);
        assert_eq!(arc.width, 10);
        // Both ends are freshly created pins.
        assert_eq!(
            out.count_nodes(|n| matches!(n.kind, NodeKind::Pin(_))),
            2
        );
        // The realized footprint empties the working merge.
        assert_eq!(g.working.area(ExampleTech::MET1), 0);
    }

    #[test]
    fn narrow_sliver_is_reported_not_wired() {
        let mut cell = SourceCell::new("c");
        // Width 3 is below the metal 1 minimum of 6.
        cell.shapes.push(rect_shape(ExampleTech::MET1, 0, 0, 100, 3));
        let (out, issues, g) = run(cell);
        assert_eq!(out.arcs().count(), 0);
        assert_eq!(issues.len(), 1);
        // The sliver survives for leftover conversion.
        assert_eq!(g.working.area(ExampleTech::MET1), 300);
    }

    #[test]
    fn ell_shares_a_junction_pin() {
        let mut cell = SourceCell::new("c");
        cell.shapes.push(rect_shape(ExampleTech::MET1, 0, 0, 100, 10));
        cell.shapes.push(rect_shape(ExampleTech::MET1, 0, 0, 10, 80));
        let (out, issues, g) = run(cell);
        assert!(issues.is_empty(), "{issues:?}");
        assert_eq!(out.arcs().count(), 2);
        // Two free ends plus one shared junction pin.
        assert_eq!(
            out.count_nodes(|n| matches!(n.kind, NodeKind::Pin(_))),
            3
        );
        assert_eq!(g.working.area(ExampleTech::MET1), 0);
    }

    #[test]
    fn existing_node_is_preferred_over_new_pin() {
        let tech = ExampleTech::new();
        let mut lib = Library::new();
        let mut cell = SourceCell::new("c");
        cell.shapes.push(rect_shape(ExampleTech::MET1, 0, 0, 60, 10));
        let key = lib.add_cell(cell);
        let cfg = ExtractionConfig::default();
        let mut g: Gathered<PolySet> = gather(&lib, key, &tech, &cfg).unwrap();
        let mut out = Cell::new("c");
        // A pre-existing contact node overlapping the wire's right end.
        let contact = out.add_node(Node {
            kind: NodeKind::Contact(crate::tech::ContactProtoId(2)),
            bbox: Rect::from_sides(54, 0, 66, 12),
            orient: Orient::R0,
            outline: None,
            holes: Vec::new(),
        });
        let mut issues = IssueSet::new();
        let mut children = SecondaryMap::new();
        extract_wires(
            &arcstr::literal!("c"),
            &mut children,
            &mut g,
            &tech,
            &cfg,
            &mut out,
            &mut issues,
            &mut NoJob,
            (65, 85),
        )
        .unwrap();
        let (_, arc) = out.arcs().next().unwrap();
        assert!(arc.head.node == contact || arc.tail.node == contact);
    }

    #[test]
    fn width_ladder_order() {
        assert_eq!(width_ladder(10, 1), vec![10, 0]);
        assert_eq!(width_ladder(10, 4), vec![10, 8, 4, 0]);
        assert_eq!(width_ladder(8, 4), vec![8, 4, 0]);
        assert_eq!(width_ladder(3, 4), vec![3, 0]);
    }
}
