use arcstr::literal;
use conex::cell::{
    ArcInst, Library, NodeKind, PureShape, Shape, SourceCell, SourceExport, SourceInstance,
};
use conex::tech::example::ExampleTech;
use conex::tech::LayerId;
use conex::{
    ExtractionConfig, ExtractionError, Extractor, HalfWidthMode, NoJob, ScriptedJob,
};
use geometry::point::Point;
use geometry::rect::Rect;
use geometry::span::Span;
use polyset::PolySet;
use test_log::test;

fn rect_shape(layer: LayerId, l: i64, b: i64, r: i64, t: i64) -> PureShape {
    PureShape {
        layer,
        shape: Shape::Rect(Rect::from_sides(l, b, r, t)),
    }
}

fn extractor() -> Extractor<ExampleTech> {
    Extractor::new(ExampleTech::new(), ExtractionConfig::default())
}

/// A transistor with a contacted gate: one poly contact, one device, wires
/// joining them, and only the select ring left over.
#[test]
fn contacted_transistor_extracts_cleanly() {
    let mut lib = Library::new();
    let mut cell = SourceCell::new("inv");
    // Gate: horizontal poly bar over a vertical n-diffusion strip.
    cell.shapes.push(rect_shape(ExampleTech::POLY, 0, 10, 30, 16));
    cell.shapes.push(rect_shape(ExampleTech::NDIFF, 10, 0, 16, 26));
    cell.shapes
        .push(rect_shape(ExampleTech::NSELECT, 0, -2, 26, 28));
    // Poly contact pad at the left end of the bar.
    cell.shapes.push(rect_shape(ExampleTech::POLY, -12, 6, 0, 18));
    cell.shapes.push(rect_shape(ExampleTech::MET1, -10, 8, -2, 16));
    cell.shapes.push(rect_shape(ExampleTech::POLYC, -8, 10, -4, 14));
    let top = lib.add_cell(cell);

    let extracted = extractor().extract_library(&lib, top, &mut NoJob).unwrap();
    let result = &extracted.cells[top];
    assert!(result.issues.is_empty(), "{:?}", result.issues);
    assert_eq!(result.stats.contacts, 1);
    assert_eq!(result.stats.transistors, 1);
    // Poly: contact-to-gate and gate-to-free-end; diffusion: two
    // source/drain stubs stitched to the device.
    assert_eq!(result.stats.arcs, 4);
    // Only the select ring outside the device survives as a leftover.
    assert_eq!(result.stats.leftovers, 1);
    let (_, ring) = result
        .cell
        .nodes()
        .find(|(_, n)| matches!(n.kind, NodeKind::PureLayer(_)))
        .unwrap();
    assert_eq!(ring.kind, NodeKind::PureLayer(ExampleTech::NSELECT));
    assert!(ring.outline.is_some());
}

/// A 3x3 cut array collapses into a single multi-cut contact node.
#[test]
fn cut_array_becomes_one_contact() {
    let mut lib = Library::new();
    let mut cell = SourceCell::new("array");
    cell.shapes.push(rect_shape(ExampleTech::POLY, 0, 0, 28, 28));
    cell.shapes.push(rect_shape(ExampleTech::MET1, 2, 2, 26, 26));
    for row in 0..3 {
        for col in 0..3 {
            let x = 4 + 8 * col;
            let y = 4 + 8 * row;
            cell.shapes
                .push(rect_shape(ExampleTech::POLYC, x, y, x + 4, y + 4));
        }
    }
    let top = lib.add_cell(cell);

    let extracted = extractor().extract_library(&lib, top, &mut NoJob).unwrap();
    let result = &extracted.cells[top];
    assert!(result.issues.is_empty(), "{:?}", result.issues);
    assert_eq!(result.stats.contacts, 1);
    assert_eq!(result.stats.arcs, 0);
    assert_eq!(result.stats.leftovers, 0);
}

/// A cut whose poly pad is missing is reported, names the missing layer,
/// and survives as pure-layer geometry.
#[test]
fn unmatched_cut_is_reported_and_preserved() {
    let mut lib = Library::new();
    let mut cell = SourceCell::new("badcut");
    cell.shapes.push(rect_shape(ExampleTech::MET1, 6, 6, 14, 14));
    cell.shapes.push(rect_shape(ExampleTech::POLYC, 8, 8, 12, 12));
    let top = lib.add_cell(cell);

    let extracted = extractor().extract_library(&lib, top, &mut NoJob).unwrap();
    let result = &extracted.cells[top];
    assert_eq!(result.stats.contacts, 0);
    let issue = result.issues.iter().next().expect("one diagnostic");
    assert!(issue.layers.contains(&literal!("poly")), "{issue}");
    assert_eq!(
        result
            .cell
            .count_nodes(|n| n.kind == NodeKind::PureLayer(ExampleTech::POLYC)),
        1
    );
}

/// Too-narrow geometry is never wired; it is reported and kept.
#[test]
fn narrow_sliver_survives_as_leftover() {
    let mut lib = Library::new();
    let mut cell = SourceCell::new("sliver");
    cell.shapes.push(rect_shape(ExampleTech::MET1, 0, 0, 100, 3));
    let top = lib.add_cell(cell);

    let extracted = extractor().extract_library(&lib, top, &mut NoJob).unwrap();
    let result = &extracted.cells[top];
    assert_eq!(result.stats.arcs, 0);
    assert_eq!(result.stats.leftovers, 1);
    assert_eq!(result.issues.len(), 1);
    let (_, node) = result.cell.nodes().next().unwrap();
    assert_eq!(node.bbox, Rect::from_sides(0, 0, 100, 3));
}

/// A T of metal wires: the through line is split at the junction and all
/// three arcs share the junction pin.
#[test]
fn t_junction_splits_and_shares_a_pin() {
    let mut lib = Library::new();
    let mut cell = SourceCell::new("tee");
    cell.shapes.push(rect_shape(ExampleTech::MET1, 0, 0, 100, 10));
    cell.shapes.push(rect_shape(ExampleTech::MET1, 45, 0, 55, 50));
    let top = lib.add_cell(cell);

    let extracted = extractor().extract_library(&lib, top, &mut NoJob).unwrap();
    let result = &extracted.cells[top];
    assert!(result.issues.is_empty(), "{:?}", result.issues);
    assert_eq!(result.stats.arcs, 3);
    assert_eq!(result.stats.pins, 4);
    assert_eq!(result.stats.leftovers, 0);
    // Exactly three arc ends meet at the junction, all on one pin.
    let junction = Point::new(50, 5);
    let ends: Vec<_> = result
        .cell
        .arcs()
        .flat_map(|(_, a)| [a.head, a.tail])
        .filter(|e| e.loc == junction)
        .collect();
    assert_eq!(ends.len(), 3);
    assert!(ends.iter().all(|e| e.node == ends[0].node));
}

/// Parent wires landing on a child instance synthesize (or reuse) an export
/// on the extracted child.
#[test]
fn instance_connection_synthesizes_child_export() {
    let mut lib = Library::new();
    let mut child = SourceCell::new("bar");
    child.shapes.push(rect_shape(ExampleTech::MET1, 0, 0, 60, 10));
    let child_key = lib.add_cell(child);

    let mut top = SourceCell::new("top");
    top.instances.push(SourceInstance {
        cell: child_key,
        name: "x0".into(),
        loc: Point::new(100, 0),
        orient: Default::default(),
    });
    top.shapes.push(rect_shape(ExampleTech::MET1, 160, 0, 220, 10));
    let top_key = lib.add_cell(top);

    let extracted = extractor()
        .extract_library(&lib, top_key, &mut NoJob)
        .unwrap();
    let child_out = &extracted.cells[child_key];
    assert_eq!(child_out.cell.exports.len(), 1);
    let export = &child_out.cell.exports[0];
    assert_eq!(export.name, literal!("__port0"));
    assert_eq!(export.loc, Point::new(60, 5));
    assert_eq!(export.layer, ExampleTech::MET1);

    let top_out = &extracted.cells[top_key];
    assert_eq!(top_out.stats.arcs, 1);
    let (_, arc) = top_out.cell.arcs().next().unwrap();
    let (inst_key, _) = top_out.cell.instances().next().unwrap();
    assert!(arc.head.node == inst_key || arc.tail.node == inst_key);
}

/// A child export at the connection point is reused instead of synthesizing
/// a second one.
#[test]
fn existing_child_export_is_reused() {
    let mut lib = Library::new();
    let mut child = SourceCell::new("bar");
    child.shapes.push(rect_shape(ExampleTech::MET1, 0, 0, 60, 10));
    child.exports.push(SourceExport {
        name: "out".into(),
        layer: ExampleTech::MET1,
        loc: Point::new(60, 5),
    });
    let child_key = lib.add_cell(child);

    let mut top = SourceCell::new("top");
    top.instances.push(SourceInstance {
        cell: child_key,
        name: "x0".into(),
        loc: Point::new(100, 0),
        orient: Default::default(),
    });
    top.shapes.push(rect_shape(ExampleTech::MET1, 160, 0, 220, 10));
    let top_key = lib.add_cell(top);

    let extracted = extractor()
        .extract_library(&lib, top_key, &mut NoJob)
        .unwrap();
    let child_out = &extracted.cells[child_key];
    assert_eq!(child_out.cell.exports.len(), 1);
    assert_eq!(child_out.cell.exports[0].name, literal!("out"));
}

/// Recursive flattening folds child geometry into the parent; the child is
/// not separately extracted.
#[test]
fn recursive_flatten_merges_child_geometry() {
    let mut lib = Library::new();
    let mut child = SourceCell::new("bar");
    child.shapes.push(rect_shape(ExampleTech::MET1, 0, 0, 60, 10));
    let child_key = lib.add_cell(child);

    let mut top = SourceCell::new("top");
    top.instances.push(SourceInstance {
        cell: child_key,
        name: "x0".into(),
        loc: Point::new(60, 0),
        orient: Default::default(),
    });
    top.shapes.push(rect_shape(ExampleTech::MET1, 0, 0, 60, 10));
    let top_key = lib.add_cell(top);

    let cfg = ExtractionConfig {
        flatten: conex::FlattenPolicy::Recursive,
        ..Default::default()
    };
    let extracted = Extractor::new(ExampleTech::new(), cfg)
        .extract_library(&lib, top_key, &mut NoJob)
        .unwrap();
    assert!(!extracted.cells.contains_key(child_key));
    let result = &extracted.cells[top_key];
    // The two abutting bars merge into one 120-long wire.
    assert_eq!(result.stats.arcs, 1);
    let (_, arc) = result.cell.arcs().next().unwrap();
    assert_eq!(arc.head.loc.manhattan_dist(arc.tail.loc), 120);
}

/// Cancellation at a stage checkpoint aborts with the dedicated error.
#[test]
fn cancellation_aborts_between_stages() {
    let mut lib = Library::new();
    let mut cell = SourceCell::new("c");
    cell.shapes.push(rect_shape(ExampleTech::MET1, 0, 0, 100, 10));
    let top = lib.add_cell(cell);

    let mut job = ScriptedJob::cancel_at(0);
    let err = extractor().extract_library(&lib, top, &mut job).unwrap_err();
    assert_eq!(err, ExtractionError::Cancelled);

    // A never-cancelling scripted host records the full stage trace.
    let mut job = ScriptedJob::default();
    extractor().extract_library(&lib, top, &mut job).unwrap();
    assert!(job.statuses.iter().any(|s| s.contains("making wires")));
    assert_eq!(job.progress.last(), Some(&100));
}

/// Both half-width grid policies produce a wired result on off-grid input.
#[test]
fn half_width_modes_both_wire_offgrid_input() {
    for mode in [HalfWidthMode::Ignore, HalfWidthMode::Compensate] {
        let mut lib = Library::new();
        let mut cell = SourceCell::new("c");
        cell.shapes.push(rect_shape(ExampleTech::MET1, 0, 1, 101, 11));
        let top = lib.add_cell(cell);
        let cfg = ExtractionConfig {
            routing_grid: 5,
            half_width: mode,
            ..Default::default()
        };
        let extracted = Extractor::new(ExampleTech::new(), cfg)
            .extract_library(&lib, top, &mut NoJob)
            .unwrap();
        let result = &extracted.cells[top];
        assert_eq!(result.stats.arcs, 1, "{mode:?}");
        let (_, arc) = result.cell.arcs().next().unwrap();
        assert!(arc.width > 0, "{mode:?}");
    }
}

/// Two runs over the same input produce the same nodes and arcs.
#[test]
fn extraction_is_deterministic() {
    let snapshot = || {
        let mut lib = Library::new();
        let mut cell = SourceCell::new("inv");
        cell.shapes.push(rect_shape(ExampleTech::POLY, 0, 10, 30, 16));
        cell.shapes.push(rect_shape(ExampleTech::NDIFF, 10, 0, 16, 26));
        cell.shapes
            .push(rect_shape(ExampleTech::NSELECT, 0, -2, 26, 28));
        cell.shapes.push(rect_shape(ExampleTech::POLY, -12, 6, 0, 18));
        cell.shapes.push(rect_shape(ExampleTech::MET1, -10, 8, -2, 16));
        cell.shapes.push(rect_shape(ExampleTech::POLYC, -8, 10, -4, 14));
        let top = lib.add_cell(cell);
        let extracted = extractor().extract_library(&lib, top, &mut NoJob).unwrap();
        let result = &extracted.cells[top];
        let mut nodes: Vec<String> = result
            .cell
            .nodes()
            .map(|(_, n)| format!("{:?} {:?}", n.kind, n.bbox))
            .collect();
        nodes.sort();
        let mut arcs: Vec<String> = result
            .cell
            .arcs()
            .map(|(_, a)| format!("{:?}->{:?} w{}", a.head.loc, a.tail.loc, a.width))
            .collect();
        arcs.sort();
        (result.stats, nodes, arcs)
    };
    assert_eq!(snapshot(), snapshot());
}

/// The drawn rectangle of an axis-aligned arc, with half-width end
/// extensions where flagged.
fn arc_rect(arc: &ArcInst) -> Rect {
    let (p1, p2, w) = (arc.head.loc, arc.tail.loc, arc.width);
    assert!(p1.x == p2.x || p1.y == p2.y, "expected an axis-aligned arc");
    let horiz = p1.y == p2.y;
    let (a1, a2) = if horiz { (p1.x, p2.x) } else { (p1.y, p2.y) };
    let mut lo = a1.min(a2);
    let mut hi = a1.max(a2);
    for end in [&arc.head, &arc.tail] {
        let at = if horiz { end.loc.x } else { end.loc.y };
        if end.extended && at == lo {
            lo -= w / 2;
        } else if end.extended && at == hi {
            hi += w / 2;
        }
    }
    let across = Span::from_center_and_length(if horiz { p1.y } else { p1.x }, w);
    if horiz {
        Rect::from_spans(Span::new(lo, hi), across)
    } else {
        Rect::from_spans(across, Span::new(lo, hi))
    }
}

/// Every unit of input area reappears in the output and nothing beyond it:
/// realized arc footprints plus leftover nodes tile the input exactly.
#[test]
fn output_footprints_tile_the_input() {
    let shapes = [
        Rect::from_sides(0, 0, 100, 10),
        Rect::from_sides(45, 0, 55, 50),
        // A disjoint sliver too narrow to wire.
        Rect::from_sides(0, 40, 30, 43),
    ];
    let mut lib = Library::new();
    let mut cell = SourceCell::new("mix");
    for r in shapes {
        cell.shapes.push(PureShape {
            layer: ExampleTech::MET1,
            shape: Shape::Rect(r),
        });
    }
    let top = lib.add_cell(cell);
    let extracted = extractor().extract_library(&lib, top, &mut NoJob).unwrap();
    let result = &extracted.cells[top];
    assert!(result.stats.arcs > 0);
    assert!(result.stats.leftovers > 0);

    let mut input = PolySet::new();
    for r in shapes {
        input.insert_rect(r);
    }
    let mut covered = PolySet::new();
    for (_, arc) in result.cell.arcs() {
        assert_eq!(arc.layer, ExampleTech::MET1);
        if arc.width > 0 {
            covered.insert_rect(arc_rect(arc));
        }
    }
    for (_, node) in result.cell.nodes() {
        if let NodeKind::PureLayer(layer) = node.kind {
            assert_eq!(layer, ExampleTech::MET1);
            match &node.outline {
                Some(outline) => {
                    covered.insert_polygon(outline);
                    for hole in &node.holes {
                        covered.subtract_polygon(hole);
                    }
                }
                None => covered.insert_rect(node.bbox),
            }
        }
    }

    let mut missing = input.clone();
    for &r in covered.rects() {
        missing.subtract_rect(r);
    }
    assert!(missing.is_empty(), "input area not covered: {missing:?}");
    let mut excess = covered;
    for &r in input.rects() {
        excess.subtract_rect(r);
    }
    assert!(excess.is_empty(), "output exceeds the input: {excess:?}");
}

/// Exported points land on the elements extraction created.
#[test]
fn source_exports_resolve_to_ports() {
    let mut lib = Library::new();
    let mut cell = SourceCell::new("c");
    cell.shapes.push(rect_shape(ExampleTech::MET1, 0, 0, 100, 10));
    cell.exports.push(SourceExport {
        name: "a".into(),
        layer: ExampleTech::MET1,
        loc: Point::new(0, 5),
    });
    let top = lib.add_cell(cell);

    let extracted = extractor().extract_library(&lib, top, &mut NoJob).unwrap();
    let result = &extracted.cells[top];
    assert!(result.issues.is_empty(), "{:?}", result.issues);
    assert_eq!(result.cell.exports.len(), 1);
    let export = &result.cell.exports[0];
    // The export rides the pin at the wire's left end.
    let (_, arc) = result.cell.arcs().next().unwrap();
    assert!(export.at == arc.head.node || export.at == arc.tail.node);
}
