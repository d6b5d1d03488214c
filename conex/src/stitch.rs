//! Connectivity stitching around the main wire pass.
//!
//! Three cleanup stages: stick-out extension wires up stubs adjacent to
//! exactly one port, bridge extension connects leftover geometry adjacent
//! to exactly two ports, and leftover conversion turns whatever remains
//! into pure-layer nodes so no input geometry is dropped. Export placement
//! resolves the source cell's exported points against the final elements.

use arcstr::ArcStr;
use diagnostics::IssueSet;
use geometry::point::Point;
use geometry::rect::Rect;
use slotmap::SecondaryMap;
use tracing::{debug, trace};

use crate::cell::{
    node_connects_to, ArcEnd, ArcInst, Cell, CellKey, Element, ElementKey, Export, Node, NodeKind,
    Orient,
};
use crate::error::{ExtractionError, Result};
use crate::gather::Gathered;
use crate::issue::ExtractionIssue;
use crate::job::Job;
use crate::merge::PolygonEngine;
use crate::skeleton::Centerline;
use crate::tech::{LayerId, Technology};
use crate::wires::{ensure_child_export, find_port};
use crate::Extracted;

/// Ports (connectable nodes and instances) adjacent to a region.
fn adjacent_ports<T: Technology + ?Sized, E: PolygonEngine>(
    region_engine: &E,
    out: &Cell,
    tech: &T,
    layer: LayerId,
) -> Vec<(ElementKey, Rect)> {
    let mut ports: Vec<(ElementKey, Rect)> = out
        .nodes()
        .filter(|(_, n)| node_connects_to(tech, n.kind, layer))
        // Abutting counts: footprints were subtracted flush with node edges.
        .filter(|(_, n)| region_engine.intersects_rect(n.bbox.expand_all(1)))
        .map(|(k, n)| (k, n.bbox))
        .collect();
    ports.extend(
        out.instances()
            .filter(|(_, i)| region_engine.intersects_rect(i.bbox.expand_all(1)))
            .map(|(k, i)| (k, i.bbox)),
    );
    ports
}

/// The point of `bbox` nearest to `p`.
fn clamp_to(bbox: Rect, p: Point) -> Point {
    Point::new(
        p.x.clamp(bbox.left(), bbox.right()),
        p.y.clamp(bbox.bot(), bbox.top()),
    )
}

/// When an arc end lands on a sub-cell instance, guarantees the extracted
/// child exports a port at the corresponding child-local point.
fn sync_instance_port<T: Technology + ?Sized>(
    out: &Cell,
    children: &mut SecondaryMap<CellKey, Extracted>,
    tech: &T,
    port: ElementKey,
    layer: LayerId,
    p: Point,
) {
    if let Some(Element::Instance(inst)) = out.elements.get(port) {
        let local = inst.orient.inverse().apply(p - inst.loc);
        ensure_child_export(children, tech, inst.cell, local, layer);
    }
}

/// Connects rectangular stubs that abut exactly one port, even when they
/// are below the layer's minimum wire width.
pub(crate) fn extend_stickouts<T: Technology + ?Sized, E: PolygonEngine>(
    cell_name: &ArcStr,
    children: &mut SecondaryMap<CellKey, Extracted>,
    g: &mut Gathered<E>,
    tech: &T,
    out: &mut Cell,
    job: &mut dyn Job,
    progress: (u8, u8),
) -> Result<()> {
    let mut stitched = 0usize;
    for layer in connectable_layers(g, tech) {
        if job.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }
        let regions = match g.working.layer(layer) {
            Some(e) => e.merged_polygons(),
            None => continue,
        };
        let Some(original) = g.original.layer(layer) else {
            continue;
        };
        let original = original.clone();
        for region in regions {
            let Some(stub) = region.as_rect() else {
                continue;
            };
            let mut re = E::default();
            re.insert_rect(stub);
            let ports = adjacent_ports(&re, out, tech, layer);
            let [(port, port_bbox)] = ports[..] else {
                continue;
            };
            // The stub's long axis carries the wire; the near end faces the
            // port.
            let width = stub.width().min(stub.height());
            let (mut near, mut far) = if stub.width() >= stub.height() {
                (
                    Point::new(stub.left(), stub.vspan().center()),
                    Point::new(stub.right(), stub.vspan().center()),
                )
            } else {
                (
                    Point::new(stub.hspan().center(), stub.bot()),
                    Point::new(stub.hspan().center(), stub.top()),
                )
            };
            if near.manhattan_dist(port_bbox.center()) > far.manhattan_dist(port_bbox.center()) {
                std::mem::swap(&mut near, &mut far);
            }
            let Some(ext) = original.wire_fits(near, far, width) else {
                continue;
            };
            trace!(?layer, ?stub, "stick-out wired to port");
            let pin = out.add_node(Node {
                kind: NodeKind::Pin(layer),
                bbox: Rect::from_point(far),
                orient: Orient::R0,
                outline: None,
                holes: Vec::new(),
            });
            out.add_arc(ArcInst {
                layer,
                width,
                head: ArcEnd {
                    node: port,
                    loc: near,
                    extended: ext.0,
                },
                tail: ArcEnd {
                    node: pin,
                    loc: far,
                    extended: ext.1,
                },
            });
            sync_instance_port(out, children, tech, port, layer, near);
            g.working.subtract_rect(layer, stub);
            stitched += 1;
        }
    }
    debug!(cell = %cell_name, stitched, "stick-out extension complete");
    job.set_progress(progress.1);
    Ok(())
}

/// Connects leftover geometry that abuts exactly two ports, falling back to
/// a connectivity-only zero-width arc when no drawn wire fits.
pub(crate) fn bridge_regions<T: Technology + ?Sized, E: PolygonEngine>(
    cell_name: &ArcStr,
    children: &mut SecondaryMap<CellKey, Extracted>,
    g: &mut Gathered<E>,
    tech: &T,
    out: &mut Cell,
    job: &mut dyn Job,
    progress: (u8, u8),
) -> Result<()> {
    let mut bridged = 0usize;
    for layer in connectable_layers(g, tech) {
        if job.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }
        let regions = match g.working.layer(layer) {
            Some(e) => e.merged_polygons(),
            None => continue,
        };
        let Some(original) = g.original.layer(layer) else {
            continue;
        };
        let original = original.clone();
        for region in regions {
            let Some(bbox) = region.bbox() else {
                continue;
            };
            let mut re = E::default();
            re.insert_polygon(&region);
            let ports = adjacent_ports(&re, out, tech, layer);
            let [(a, a_bbox), (b, b_bbox)] = ports[..] else {
                continue;
            };
            let pa = clamp_to(bbox, a_bbox.center());
            let pb = clamp_to(bbox, b_bbox.center());
            let mut width = 0;
            let mut ext = (false, false);
            for w in [bbox.width().min(bbox.height()), tech.min_wire_width(layer)] {
                if w <= 0 {
                    continue;
                }
                if let Some(flags) = original.wire_fits(pa, pb, w) {
                    width = w;
                    ext = flags;
                    break;
                }
            }
            trace!(?layer, ?bbox, width, "bridged region between two ports");
            out.add_arc(ArcInst {
                layer,
                width,
                head: ArcEnd {
                    node: a,
                    loc: pa,
                    extended: ext.0,
                },
                tail: ArcEnd {
                    node: b,
                    loc: pb,
                    extended: ext.1,
                },
            });
            sync_instance_port(out, children, tech, a, layer, pa);
            sync_instance_port(out, children, tech, b, layer, pb);
            if width > 0 {
                let line = Centerline::new(pa, pb, width);
                g.working.subtract_polygon(layer, &line.footprint_polygon());
            }
            bridged += 1;
        }
    }
    debug!(cell = %cell_name, bridged, "bridge extension complete");
    job.set_progress(progress.1);
    Ok(())
}

/// Converts every remaining working-merge region into a pure-layer node,
/// leaving the working merge empty.
pub(crate) fn convert_leftovers<E: PolygonEngine>(
    cell_name: &ArcStr,
    g: &mut Gathered<E>,
    out: &mut Cell,
    job: &mut dyn Job,
    progress: (u8, u8),
) -> Result<()> {
    let mut leftovers = 0usize;
    for layer in g.working.layer_ids() {
        if job.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }
        let regions = match g.working.layer(layer) {
            Some(e) => e.merged_regions(),
            None => continue,
        };
        for (outer, holes) in regions {
            let Some(bbox) = outer.bbox() else {
                continue;
            };
            // A plain rectangle needs no outline trace; anything else,
            // including a rectangle with holes, carries its boundary. The
            // hole area was never in the set, so subtracting the full outer
            // region consumes exactly this component.
            let plain = outer.as_rect().is_some() && holes.is_empty();
            g.working.subtract_polygon(layer, &outer);
            out.add_node(Node {
                kind: NodeKind::PureLayer(layer),
                bbox,
                orient: Orient::R0,
                outline: (!plain).then(|| outer.clone()),
                holes,
            });
            leftovers += 1;
        }
    }
    debug_assert!(g.working.is_empty());
    debug!(cell = %cell_name, leftovers, "leftover conversion complete");
    job.set_progress(progress.1);
    Ok(())
}

/// Places the source cell's exports onto the final elements, creating an
/// exported pin where nothing connectable sits at the exported point.
pub(crate) fn place_exports<T: Technology + ?Sized, E: PolygonEngine>(
    cell_name: &ArcStr,
    g: &Gathered<E>,
    tech: &T,
    out: &mut Cell,
    issues: &mut IssueSet<ExtractionIssue>,
    job: &mut dyn Job,
    progress: (u8, u8),
) -> Result<()> {
    for export in &g.exports {
        if job.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }
        // Search before mutating: the fallback pin below needs `out` free.
        let existing = find_port(out, tech, export.layer, export.loc).or_else(|| {
            out.arcs().find_map(|(_, a)| {
                (a.layer == export.layer
                    && (a.head.loc == export.loc || a.tail.loc == export.loc))
                    .then_some(if a.head.loc == export.loc {
                        a.head.node
                    } else {
                        a.tail.node
                    })
            })
        });
        let at = match existing {
            Some(k) => k,
            None => {
                issues.add(
                    ExtractionIssue::warn(
                        cell_name.clone(),
                        export.loc,
                        format!(
                            "export {} placed on a new pin; nothing connectable found",
                            export.name
                        ),
                    )
                    .with_layers([tech.layer_name(export.layer)]),
                );
                out.add_node(Node {
                    kind: NodeKind::Pin(export.layer),
                    bbox: Rect::from_point(export.loc),
                    orient: Orient::R0,
                    outline: None,
                    holes: Vec::new(),
                })
            }
        };
        out.exports.push(Export {
            name: export.name.clone(),
            at,
            loc: export.loc,
            layer: export.layer,
        });
    }
    job.set_progress(progress.1);
    Ok(())
}

fn connectable_layers<T: Technology + ?Sized, E: PolygonEngine>(
    g: &Gathered<E>,
    tech: &T,
) -> Vec<LayerId> {
    g.working
        .layer_ids()
        .into_iter()
        .filter(|&l| tech.function(l).is_connectable())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Instance, Library, PureShape, Shape, SourceCell, SourceExport};
    use crate::config::ExtractionConfig;
    use crate::gather::gather;
    use crate::job::NoJob;
    use crate::tech::{example::ExampleTech, ContactProtoId};
    use polyset::PolySet;

    fn rect_shape(layer: LayerId, l: i64, b: i64, r: i64, t: i64) -> PureShape {
        PureShape {
            layer,
            shape: Shape::Rect(Rect::from_sides(l, b, r, t)),
        }
    }

    fn gathered(shapes: Vec<PureShape>) -> Gathered<PolySet> {
        let tech = ExampleTech::new();
        let mut lib = Library::new();
        let mut cell = SourceCell::new("c");
        cell.shapes = shapes;
        let key = lib.add_cell(cell);
        gather(&lib, key, &tech, &ExtractionConfig::default()).unwrap()
    }

    fn contact_node(out: &mut Cell, bbox: Rect) -> ElementKey {
        out.add_node(Node {
            kind: NodeKind::Contact(ContactProtoId(2)),
            bbox,
            orient: Orient::R0,
            outline: None,
            holes: Vec::new(),
        })
    }

    #[test]
    fn stickout_wires_substandard_stub_to_port() {
        let tech = ExampleTech::new();
        // A contact pad plus a 4-wide stub: below the metal 1 minimum, but
        // adjacent to exactly one port.
        let mut g = gathered(vec![
            rect_shape(ExampleTech::MET1, 0, 0, 12, 12),
            rect_shape(ExampleTech::MET1, 12, 4, 20, 8),
        ]);
        let mut out = Cell::new("c");
        let port = contact_node(&mut out, Rect::from_sides(0, 0, 12, 12));
        // Simulate contact recognition consuming the pad.
        g.working.subtract_rect(ExampleTech::MET1, Rect::from_sides(0, 0, 12, 12));

        extend_stickouts(
            &arcstr::literal!("c"),
            &mut SecondaryMap::new(),
            &mut g,
            &tech,
            &mut out,
            &mut NoJob,
            (60, 65),
        )
        .unwrap();
        let arcs: Vec<_> = out.arcs().collect();
        assert_eq!(arcs.len(), 1);
        let arc = arcs[0].1;
        assert_eq!(arc.width, 4);
        assert_eq!(arc.head.node, port);
        assert_eq!(g.working.area(ExampleTech::MET1), 0);
    }

    #[test]
    fn stickout_onto_instance_synthesizes_child_export() {
        let tech = ExampleTech::new();
        let mut lib = Library::new();
        let child_key = lib.add_cell(SourceCell::new("bar"));
        let mut children: SecondaryMap<CellKey, Extracted> = SecondaryMap::new();
        children.insert(
            child_key,
            Extracted {
                cell: Cell::new("bar"),
                issues: IssueSet::new(),
                stats: Default::default(),
            },
        );
        // A stub hanging off the right edge of a sub-cell instance.
        let mut g = gathered(vec![rect_shape(ExampleTech::MET1, 60, 0, 70, 10)]);
        let mut out = Cell::new("c");
        let inst = out.add_instance(Instance {
            cell: child_key,
            name: "x0".into(),
            loc: Point::new(0, 0),
            orient: Orient::R0,
            bbox: Rect::from_sides(0, 0, 60, 10),
        });

        extend_stickouts(
            &arcstr::literal!("c"),
            &mut children,
            &mut g,
            &tech,
            &mut out,
            &mut NoJob,
            (60, 65),
        )
        .unwrap();
        let (_, arc) = out.arcs().next().unwrap();
        assert_eq!(arc.head.node, inst);
        // The connection point is reflected as an export of the child.
        let child = &children[child_key].cell;
        assert_eq!(child.exports.len(), 1);
        assert_eq!(child.exports[0].loc, Point::new(60, 5));
        assert_eq!(child.exports[0].layer, ExampleTech::MET1);
    }

    #[test]
    fn bridge_connects_two_ports() {
        let tech = ExampleTech::new();
        let mut g = gathered(vec![
            rect_shape(ExampleTech::MET1, 0, 0, 12, 12),
            rect_shape(ExampleTech::MET1, 12, 4, 20, 8),
            rect_shape(ExampleTech::MET1, 20, 0, 32, 12),
        ]);
        let mut out = Cell::new("c");
        let a = contact_node(&mut out, Rect::from_sides(0, 0, 12, 12));
        let b = contact_node(&mut out, Rect::from_sides(20, 0, 32, 12));
        g.working.subtract_rect(ExampleTech::MET1, Rect::from_sides(0, 0, 12, 12));
        g.working.subtract_rect(ExampleTech::MET1, Rect::from_sides(20, 0, 32, 12));

        bridge_regions(
            &arcstr::literal!("c"),
            &mut SecondaryMap::new(),
            &mut g,
            &tech,
            &mut out,
            &mut NoJob,
            (85, 90),
        )
        .unwrap();
        let arcs: Vec<_> = out.arcs().collect();
        assert_eq!(arcs.len(), 1);
        let arc = arcs[0].1;
        assert!(arc.width > 0);
        let ends = [arc.head.node, arc.tail.node];
        assert!(ends.contains(&a) && ends.contains(&b));
        assert_eq!(g.working.area(ExampleTech::MET1), 0);
    }

    #[test]
    fn leftovers_preserve_all_geometry() {
        let mut g = gathered(vec![
            rect_shape(ExampleTech::MET1, 0, 0, 100, 3),
            rect_shape(ExampleTech::NSELECT, 0, 0, 40, 40),
        ]);
        let mut out = Cell::new("c");
        convert_leftovers(&arcstr::literal!("c"), &mut g, &mut out, &mut NoJob, (90, 95))
            .unwrap();
        assert!(g.working.is_empty());
        assert_eq!(
            out.count_nodes(|n| matches!(n.kind, NodeKind::PureLayer(_))),
            2
        );
        let (_, sliver) = out
            .nodes()
            .find(|(_, n)| n.kind == NodeKind::PureLayer(ExampleTech::MET1))
            .unwrap();
        assert_eq!(sliver.bbox, Rect::from_sides(0, 0, 100, 3));
        // Rectangular leftovers carry no outline trace.
        assert!(sliver.outline.is_none());
    }

    #[test]
    fn holed_leftover_keeps_its_hole() {
        let mut g = gathered(vec![rect_shape(ExampleTech::NSELECT, 0, 0, 30, 30)]);
        // Consume the middle, leaving a square ring.
        g.working
            .subtract_rect(ExampleTech::NSELECT, Rect::from_sides(10, 10, 20, 20));
        let mut out = Cell::new("c");
        convert_leftovers(&arcstr::literal!("c"), &mut g, &mut out, &mut NoJob, (90, 95))
            .unwrap();
        assert!(g.working.is_empty());
        let (_, ring) = out
            .nodes()
            .find(|(_, n)| n.kind == NodeKind::PureLayer(ExampleTech::NSELECT))
            .unwrap();
        assert_eq!(ring.bbox, Rect::from_sides(0, 0, 30, 30));
        // The enclosed area is excluded, not covered over.
        assert!(ring.outline.is_some());
        assert_eq!(ring.holes.len(), 1);
        assert_eq!(ring.holes[0].area(), 100);
    }

    #[test]
    fn exports_land_on_ports_or_new_pins() {
        let tech = ExampleTech::new();
        let mut lib = Library::new();
        let mut cell = SourceCell::new("c");
        cell.shapes.push(rect_shape(ExampleTech::MET1, 0, 0, 12, 12));
        cell.exports.push(SourceExport {
            name: "a".into(),
            layer: ExampleTech::MET1,
            loc: Point::new(6, 6),
        });
        cell.exports.push(SourceExport {
            name: "b".into(),
            layer: ExampleTech::MET2,
            loc: Point::new(50, 50),
        });
        let key = lib.add_cell(cell);
        let g: Gathered<PolySet> =
            gather(&lib, key, &tech, &ExtractionConfig::default()).unwrap();
        let mut out = Cell::new("c");
        let port = contact_node(&mut out, Rect::from_sides(0, 0, 12, 12));
        let mut issues = IssueSet::new();
        place_exports(
            &arcstr::literal!("c"),
            &g,
            &tech,
            &mut out,
            &mut issues,
            &mut NoJob,
            (95, 100),
        )
        .unwrap();
        assert_eq!(out.exports.len(), 2);
        assert_eq!(out.exports[0].at, port);
        // The floating export got a fresh pin and a diagnostic.
        assert_eq!(issues.len(), 1);
        let (_, pin) = out
            .nodes()
            .find(|(_, n)| n.kind == NodeKind::Pin(ExampleTech::MET2))
            .unwrap();
        assert_eq!(pin.bbox, Rect::from_point(Point::new(50, 50)));
    }
}
