//! Geometry gathering: populating the merges and cut buckets from a cell.
//!
//! Walks a cell's shapes (recursively when flattening), scales coordinates
//! onto the fixed-point grid, canonicalizes layers, and routes everything to
//! its home: connectable/implant/well geometry into the merge, contact cuts
//! into per-layer spatial buckets. Cuts are numerous and cheap to keep as
//! discrete rectangles; merging them would buy nothing.

use geometry::point::Point;
use geometry::polygon::Polygon;
use geometry::rect::Rect;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::cell::{CellKey, Instance, Library, Orient, Shape, SourceExport};
use crate::config::{ExtractionConfig, FlattenPolicy};
use crate::error::{ExtractionError, Result};
use crate::merge::{Merge, PolygonEngine};
use crate::spatial::{EntryId, RectArena};
use crate::tech::{LayerId, Technology};

/// All contact cuts found on one canonical cut layer.
#[derive(Debug, Default)]
pub(crate) struct CutBucket {
    /// The cuts, indexed for range queries.
    pub arena: RectArena,
    /// Processing order: descending y, then descending x of the cut center.
    pub order: Vec<EntryId>,
}

/// Everything the pipeline stages consume, produced once per cell.
///
/// This is explicit state threaded through the stages; nothing is shared
/// across cells.
#[derive(Debug)]
pub(crate) struct Gathered<E: PolygonEngine> {
    /// The working merge, progressively emptied by later stages.
    pub working: Merge<E>,
    /// The original merge, never mutated after gathering.
    pub original: Merge<E>,
    /// Cut buckets by canonical cut layer, in first-seen order.
    pub cuts: IndexMap<LayerId, CutBucket>,
    /// The cell's exports, scaled and canonicalized. Placement is deferred
    /// until after wiring, since connectivity depends on realized geometry.
    pub exports: Vec<SourceExport>,
    /// Sub-cell instances carried into the output (empty when flattening).
    pub instances: Vec<Instance>,
    /// Whether any well-function geometry exists in the scanned hierarchy.
    /// When false, the process is presumed well-less and well layers are
    /// not required of templates.
    pub has_well: bool,
}

/// A placement transform: rotate, then translate. Composable for nested
/// instances.
#[derive(Debug, Clone, Copy)]
struct Xform {
    loc: Point,
    orient: Orient,
}

impl Xform {
    const IDENTITY: Xform = Xform {
        loc: Point::zero(),
        orient: Orient::R0,
    };

    fn apply(&self, p: Point) -> Point {
        self.orient.apply(p) + self.loc
    }

    fn apply_rect(&self, r: Rect) -> Rect {
        self.orient.apply_rect(r).translate(self.loc)
    }

    fn apply_polygon(&self, p: &Polygon) -> Polygon {
        self.orient.apply_polygon(p).translate(self.loc)
    }

    /// The transform equivalent to `inner`, then `self`.
    fn compose(&self, inner: Xform) -> Xform {
        Xform {
            loc: self.apply(inner.loc),
            orient: inner.orient.then(self.orient),
        }
    }
}

fn scale_rect(r: Rect, s: i64) -> Rect {
    Rect::from_sides(r.left() * s, r.bot() * s, r.right() * s, r.top() * s)
}

fn scale_polygon(p: &Polygon, s: i64) -> Polygon {
    Polygon::from_verts(
        p.points()
            .iter()
            .map(|&v| Point::new(v.x * s, v.y * s))
            .collect(),
    )
}

/// Gathers one cell's geometry into merges and cut buckets.
pub(crate) fn gather<T: Technology + ?Sized, E: PolygonEngine>(
    lib: &Library,
    key: CellKey,
    tech: &T,
    cfg: &ExtractionConfig,
) -> Result<Gathered<E>> {
    let cell = lib.cells.get(key).ok_or(ExtractionError::UnknownCell)?;
    let s = cfg.grid_scale;

    let mut out = Gathered {
        working: Merge::new(),
        original: Merge::new(),
        cuts: IndexMap::new(),
        exports: Vec::new(),
        instances: Vec::new(),
        has_well: false,
    };

    walk(lib, key, tech, cfg, Xform::IDENTITY, 0, &mut out)?;

    // Presumed-well pre-pass: scan the hierarchy (even unexpanded sub-cells)
    // for any explicit well geometry.
    out.has_well = out.has_well
        || well_scan(
            lib,
            key,
            tech,
            if cfg.recursive_well_scan { usize::MAX } else { 0 },
        );

    for export in &cell.exports {
        out.exports.push(SourceExport {
            name: export.name.clone(),
            layer: tech.canonical(export.layer),
            loc: Point::new(export.loc.x * s, export.loc.y * s),
        });
    }

    // Deterministic cut order: descending y, then descending x.
    for bucket in out.cuts.values_mut() {
        bucket.arena.build_index();
        let mut order: Vec<EntryId> = bucket.arena.iter().map(|(id, _)| id).collect();
        order.sort_by_key(|&id| {
            let c = bucket.arena.get(id).expect("freshly inserted cut").center();
            (std::cmp::Reverse(c.y), std::cmp::Reverse(c.x))
        });
        bucket.order = order;
    }

    debug!(
        cell = %cell.name,
        layers = out.original.layer_ids().len(),
        cut_layers = out.cuts.len(),
        "gathered geometry"
    );
    Ok(out)
}

fn walk<T: Technology + ?Sized, E: PolygonEngine>(
    lib: &Library,
    key: CellKey,
    tech: &T,
    cfg: &ExtractionConfig,
    xform: Xform,
    depth: usize,
    out: &mut Gathered<E>,
) -> Result<()> {
    let cell = lib.cells.get(key).ok_or(ExtractionError::UnknownCell)?;
    let s = cfg.grid_scale;

    for shape in &cell.shapes {
        let layer = tech.canonical(shape.layer);
        let function = tech.function(layer);
        if function.is_well() {
            out.has_well = true;
        }
        if function.is_cut() {
            let rect = match &shape.shape {
                Shape::Rect(r) => xform.apply_rect(scale_rect(*r, s)),
                // Cuts are rectangles in practice; a polygon cut is reduced
                // to its bounding box.
                Shape::Polygon(p) => match scale_polygon(p, s).bbox() {
                    Some(b) => xform.apply_rect(b),
                    None => continue,
                },
            };
            let bucket = out.cuts.entry(layer).or_default();
            bucket.arena.insert(rect);
            continue;
        }
        match &shape.shape {
            Shape::Rect(r) => {
                let r = xform.apply_rect(scale_rect(*r, s));
                out.working.insert_rect(layer, r);
                out.original.insert_rect(layer, r);
            }
            Shape::Polygon(p) => {
                let p = xform.apply_polygon(&scale_polygon(p, s));
                out.working.insert_polygon(layer, &p);
                out.original.insert_polygon(layer, &p);
            }
        }
    }

    for inst in &cell.instances {
        let inst_xform = xform.compose(Xform {
            loc: Point::new(inst.loc.x * s, inst.loc.y * s),
            orient: inst.orient,
        });
        match cfg.flatten {
            FlattenPolicy::Recursive => {
                walk(lib, inst.cell, tech, cfg, inst_xform, depth + 1, out)?;
            }
            FlattenPolicy::TopOnly => {
                if depth == 0 {
                    let bbox = cell_bbox(lib, inst.cell, &mut FxHashMap::default())
                        .map(|b| inst_xform.apply_rect(scale_rect(b, s)))
                        .unwrap_or_else(|| Rect::from_point(inst_xform.loc));
                    out.instances.push(Instance {
                        cell: inst.cell,
                        name: inst.name.clone(),
                        loc: inst_xform.loc,
                        orient: inst_xform.orient,
                        bbox,
                    });
                }
            }
        }
    }
    Ok(())
}

/// The recursive bounding box of a source cell, in its own (unscaled)
/// coordinates.
fn cell_bbox(
    lib: &Library,
    key: CellKey,
    memo: &mut FxHashMap<CellKey, Option<Rect>>,
) -> Option<Rect> {
    if let Some(&cached) = memo.get(&key) {
        return cached;
    }
    let cell = lib.cells.get(key)?;
    let mut acc: Option<Rect> = None;
    for shape in &cell.shapes {
        if let Some(b) = shape.shape.bbox() {
            acc = Some(acc.map_or(b, |a| a.union(b)));
        }
    }
    for inst in &cell.instances {
        if let Some(b) = cell_bbox(lib, inst.cell, memo) {
            let b = inst.orient.apply_rect(b).translate(inst.loc);
            acc = Some(acc.map_or(b, |a| a.union(b)));
        }
    }
    memo.insert(key, acc);
    acc
}

/// Whether any well-function geometry exists within `max_depth` levels.
fn well_scan<T: Technology + ?Sized>(
    lib: &Library,
    key: CellKey,
    tech: &T,
    max_depth: usize,
) -> bool {
    let Some(cell) = lib.cells.get(key) else {
        return false;
    };
    if cell
        .shapes
        .iter()
        .any(|s| tech.function(tech.canonical(s.layer)).is_well())
    {
        return true;
    }
    if max_depth == 0 {
        return false;
    }
    cell.instances
        .iter()
        .any(|i| well_scan(lib, i.cell, tech, max_depth - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{PureShape, SourceCell, SourceInstance};
    use crate::tech::example::ExampleTech;
    use polyset::PolySet;

    fn rect_shape(layer: LayerId, l: i64, b: i64, r: i64, t: i64) -> PureShape {
        PureShape {
            layer,
            shape: Shape::Rect(Rect::from_sides(l, b, r, t)),
        }
    }

    #[test]
    fn gathers_shapes_by_canonical_layer() {
        let tech = ExampleTech::new();
        let mut lib = Library::new();
        let mut cell = SourceCell::new("top");
        cell.shapes
            .push(rect_shape(ExampleTech::MET1, 0, 0, 10, 10));
        // The pin alias lands on the same canonical layer.
        cell.shapes
            .push(rect_shape(ExampleTech::MET1_PIN, 10, 0, 20, 10));
        let key = lib.add_cell(cell);

        let g: Gathered<PolySet> =
            gather(&lib, key, &tech, &ExtractionConfig::default()).unwrap();
        assert_eq!(g.original.area(ExampleTech::MET1), 200);
        assert_eq!(g.working.area(ExampleTech::MET1), 200);
        assert!(!g.has_well);
    }

    #[test]
    fn cuts_are_bucketed_not_merged() {
        let tech = ExampleTech::new();
        let mut lib = Library::new();
        let mut cell = SourceCell::new("top");
        cell.shapes.push(rect_shape(ExampleTech::VIA1, 0, 0, 4, 4));
        cell.shapes
            .push(rect_shape(ExampleTech::VIA1, 10, 10, 14, 14));
        let key = lib.add_cell(cell);

        let g: Gathered<PolySet> =
            gather(&lib, key, &tech, &ExtractionConfig::default()).unwrap();
        assert_eq!(g.original.area(ExampleTech::VIA1), 0);
        let bucket = &g.cuts[&ExampleTech::VIA1];
        assert_eq!(bucket.order.len(), 2);
        // Descending y first.
        let first = bucket.arena.get(bucket.order[0]).unwrap();
        assert_eq!(first, Rect::from_sides(10, 10, 14, 14));
    }

    #[test]
    fn recursive_flatten_transforms_geometry() {
        let tech = ExampleTech::new();
        let mut lib = Library::new();
        let mut child = SourceCell::new("child");
        child.shapes.push(rect_shape(ExampleTech::POLY, 0, 0, 4, 2));
        let child_key = lib.add_cell(child);
        let mut top = SourceCell::new("top");
        top.instances.push(SourceInstance {
            cell: child_key,
            name: "x0".into(),
            loc: Point::new(100, 0),
            orient: Orient::R90,
        });
        let key = lib.add_cell(top);

        let cfg = ExtractionConfig {
            flatten: FlattenPolicy::Recursive,
            ..Default::default()
        };
        let g: Gathered<PolySet> = gather(&lib, key, &tech, &cfg).unwrap();
        assert!(g
            .original
            .contains_rect(ExampleTech::POLY, Rect::from_sides(98, 0, 100, 4)));
    }

    #[test]
    fn well_scan_descends_into_instances() {
        let tech = ExampleTech::new();
        let mut lib = Library::new();
        let mut child = SourceCell::new("welltap");
        child
            .shapes
            .push(rect_shape(ExampleTech::NWELL, 0, 0, 20, 20));
        let child_key = lib.add_cell(child);
        let mut top = SourceCell::new("top");
        top.instances.push(SourceInstance {
            cell: child_key,
            name: "w0".into(),
            loc: Point::zero(),
            orient: Orient::R0,
        });
        let key = lib.add_cell(top);

        let g: Gathered<PolySet> =
            gather(&lib, key, &tech, &ExtractionConfig::default()).unwrap();
        assert!(g.has_well);

        let cfg = ExtractionConfig {
            recursive_well_scan: false,
            ..Default::default()
        };
        let g: Gathered<PolySet> = gather(&lib, key, &tech, &cfg).unwrap();
        assert!(!g.has_well);
    }
}
