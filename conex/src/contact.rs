//! Contact and via recognition.
//!
//! Each cut rectangle is explained by instantiating a contact prototype over
//! it. Prototypes with asymmetric footprints contribute a rotated template
//! variant. A multi-cut prototype absorbs neighboring cuts within reach as
//! long as the combined footprint still fits the original geometry; a seed
//! whose aggregate cannot be placed falls back to a single-cut node. The node
//! box is then grown to the largest rectangle whose full footprint still
//! fits. Footprint subtraction from the working merge is deferred to the end
//! of the stage so earlier placements cannot perturb later matching.

use arcstr::ArcStr;
use diagnostics::IssueSet;
use geometry::rect::Rect;
use geometry::side::{Side, Sides};
use tracing::{debug, trace};

use crate::cell::{Cell, Node, NodeKind, Orient};
use crate::config::ExtractionConfig;
use crate::error::{ExtractionError, Result};
use crate::gather::Gathered;
use crate::issue::ExtractionIssue;
use crate::job::Job;
use crate::merge::{Merge, PolygonEngine};
use crate::spatial::{EntryId, RectArena};
use crate::tech::{ContactProtoId, FootprintLayer, Technology};

/// One orientation variant of a contact prototype.
#[derive(Debug, Clone)]
struct Template {
    proto: ContactProtoId,
    orient: Orient,
    cut_spacing: i64,
    cut_size: i64,
    multi_cut: bool,
    min_width: i64,
    min_height: i64,
    footprint: Vec<FootprintLayer>,
}

impl Template {
    fn from_proto<T: Technology + ?Sized>(tech: &T, id: ContactProtoId) -> Self {
        let p = &tech.contact_protos()[id.0];
        Template {
            proto: id,
            orient: Orient::R0,
            cut_spacing: p.cut_spacing,
            cut_size: p.cut_size,
            multi_cut: p.multi_cut,
            min_width: p.min_width,
            min_height: p.min_height,
            footprint: p.footprint.clone(),
        }
    }

    /// The variant rotated 90 degrees counter-clockwise.
    fn rotated(&self) -> Template {
        Template {
            orient: self.orient.then(Orient::R90),
            min_width: self.min_height,
            min_height: self.min_width,
            footprint: self
                .footprint
                .iter()
                .map(|f| FootprintLayer {
                    layer: f.layer,
                    // Under a quarter turn, the old top lands on the left,
                    // left on the bottom, bottom on the right, right on top.
                    shrinks: Sides::new(
                        f.shrinks[Side::Top],
                        f.shrinks[Side::Left],
                        f.shrinks[Side::Bot],
                        f.shrinks[Side::Right],
                    ),
                })
                .collect(),
            ..self.clone()
        }
    }

    fn same_shape(&self, other: &Template) -> bool {
        self.min_width == other.min_width
            && self.min_height == other.min_height
            && self
                .footprint
                .iter()
                .zip(&other.footprint)
                .all(|(a, b)| a.layer == b.layer && a.shrinks == b.shrinks)
    }

    fn cut_borders(&self) -> (i64, i64) {
        (
            (self.min_width - self.cut_size) / 2,
            (self.min_height - self.cut_size) / 2,
        )
    }

    /// The drawn rectangle of one footprint layer for the given node box.
    fn footprint_rect(node: Rect, f: &FootprintLayer) -> Rect {
        node.expand_sides(f.shrinks.map(|_, s| -s))
    }
}

/// All templates that can explain cuts on one cut layer, widest catalog
/// entries first. Catalog-order ties keep their relative order.
fn build_templates<T: Technology + ?Sized>(
    tech: &T,
    cut_layer: crate::tech::LayerId,
) -> Vec<Template> {
    let mut templates = Vec::new();
    for (i, proto) in tech.contact_protos().iter().enumerate() {
        if proto.cut_layer != cut_layer {
            continue;
        }
        let base = Template::from_proto(tech, ContactProtoId(i));
        let rot = base.rotated();
        let symmetric = base.same_shape(&rot);
        templates.push(base);
        if !symmetric {
            templates.push(rot);
        }
    }
    templates.sort_by_key(|t| std::cmp::Reverse(t.min_width * t.min_height));
    templates
}

/// Whether the full footprint of `node` fits the original geometry.
fn footprint_fits<T: Technology + ?Sized, E: PolygonEngine>(
    node: Rect,
    tmpl: &Template,
    original: &Merge<E>,
    tech: &T,
    has_well: bool,
) -> bool {
    tmpl.footprint.iter().all(|f| {
        if !has_well && tech.function(f.layer).is_well() {
            // Well-less process: well footprint layers are not required.
            return true;
        }
        original.contains_rect(f.layer, Template::footprint_rect(node, f))
    })
}

/// Grows `node` on one side to the largest extension that still fits.
fn grow_side<T: Technology + ?Sized, E: PolygonEngine>(
    node: Rect,
    side: Side,
    tmpl: &Template,
    original: &Merge<E>,
    tech: &T,
    has_well: bool,
) -> Rect {
    let fits = |e: i64| footprint_fits(node.expand_side(side, e), tmpl, original, tech, has_well);
    if !fits(1) {
        return node;
    }
    let mut lo = 1;
    let mut hi = 2;
    while fits(hi) {
        lo = hi;
        hi *= 2;
    }
    // Largest fitting extension is in [lo, hi).
    while lo + 1 < hi {
        let mid = lo + (hi - lo) / 2;
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    node.expand_side(side, lo)
}

/// Absorbs every transitively-reachable cut within multi-cut range of the
/// seed, returning the combined cut region. A neighbor is only absorbed if
/// the base node box of the grown region still has a fitting footprint, so
/// unrelated cuts that happen to be within reach do not poison the match.
fn aggregate_cuts<T: Technology + ?Sized, E: PolygonEngine>(
    arena: &RectArena,
    seed_id: EntryId,
    seed: Rect,
    tmpl: &Template,
    original: &Merge<E>,
    tech: &T,
    has_well: bool,
) -> (Rect, Vec<EntryId>) {
    let mut region = seed;
    let mut absorbed = vec![seed_id];
    let reach = tmpl.cut_spacing + tmpl.cut_size;
    loop {
        let mut grew = false;
        for id in arena.query(region.expand_all(reach)) {
            if absorbed.contains(&id) {
                continue;
            }
            if let Some(r) = arena.get(id) {
                let candidate = region.union(r);
                if !footprint_fits(base_node_box(candidate, tmpl), tmpl, original, tech, has_well)
                {
                    continue;
                }
                region = candidate;
                absorbed.push(id);
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }
    absorbed.sort();
    (region, absorbed)
}

/// The minimal node box for a cut region: the region plus the template's
/// cut-to-edge borders.
fn base_node_box(region: Rect, tmpl: &Template) -> Rect {
    let (bx, by) = tmpl.cut_borders();
    Rect::from_sides(
        region.left() - bx,
        region.bot() - by,
        region.right() + bx,
        region.top() + by,
    )
}

/// Candidate anchor offsets for the base node box, centered first, then
/// biased toward each side and corner within the cut borders.
fn anchor_offsets(tmpl: &Template) -> Vec<(i64, i64)> {
    let (bx, by) = tmpl.cut_borders();
    let mut out = Vec::with_capacity(9);
    for &dy in &[0, -by, by] {
        for &dx in &[0, -bx, bx] {
            if !out.contains(&(dx, dy)) {
                out.push((dx, dy));
            }
        }
    }
    out
}

struct Placement {
    proto: ContactProtoId,
    orient: Orient,
    bbox: Rect,
    footprint: Vec<FootprintLayer>,
}

/// Recognizes contacts and vias from the cut buckets.
///
/// Consumes every cut: matched cuts become contact nodes, unmatched cuts are
/// reported and their geometry is preserved in the working merge so leftover
/// conversion keeps it.
#[allow(clippy::too_many_arguments)]
pub(crate) fn extract_contacts<T: Technology + ?Sized, E: PolygonEngine>(
    cell_name: &ArcStr,
    g: &mut Gathered<E>,
    tech: &T,
    cfg: &ExtractionConfig,
    out: &mut Cell,
    issues: &mut IssueSet<ExtractionIssue>,
    job: &mut dyn Job,
    progress: (u8, u8),
) -> Result<()> {
    let cuts = std::mem::take(&mut g.cuts);
    let total: usize = cuts.values().map(|b| b.order.len()).sum();
    let mut done = 0usize;
    let mut placements: Vec<Placement> = Vec::new();

    for (cut_layer, mut bucket) in cuts {
        let templates = build_templates(tech, cut_layer);
        if templates.is_empty() {
            // No prototype explains this cut layer at all.
            for &id in &bucket.order {
                if let Some(cut) = bucket.arena.get(id) {
                    issues.add(
                        ExtractionIssue::warn(
                            cell_name.clone(),
                            cut.center(),
                            format!("no contact prototype for cut layer {}", tech.layer_name(cut_layer)),
                        )
                        .with_layers([tech.layer_name(cut_layer)]),
                    );
                    g.working.insert_rect(cut_layer, cut);
                }
            }
            done += bucket.order.len();
            continue;
        }

        for &id in &bucket.order.clone() {
            done += 1;
            if done % 32 == 0 {
                job.set_progress(stage_progress(progress, done, total));
                if job.is_cancelled() {
                    return Err(ExtractionError::Cancelled);
                }
            }
            // Already absorbed into an earlier multi-cut node.
            let Some(cut) = bucket.arena.get(id) else {
                continue;
            };
            let center = cut.center();

            let mut matched = false;
            for tmpl in &templates {
                // Present-layer screen: every required footprint layer must
                // cover the cut center in the original geometry.
                let present = tmpl.footprint.iter().all(|f| {
                    (!g.has_well && tech.function(f.layer).is_well())
                        || g.original.contains_point(f.layer, center)
                });
                if !present {
                    continue;
                }

                let (region, absorbed) = if tmpl.multi_cut {
                    aggregate_cuts(&bucket.arena, id, cut, tmpl, &g.original, tech, g.has_well)
                } else {
                    (cut, vec![id])
                };

                // Place the aggregate; if that fails, retry with the seed cut
                // alone before giving up on this template.
                let placed = {
                    let try_place = |region: Rect, absorbed: Vec<EntryId>| {
                        let node = place_node(region, tmpl, &g.original, tech, g.has_well)?;
                        if cfg.strict_cut_match {
                            // Every cut under the node box must belong to
                            // this node.
                            let covered = bucket.arena.query(node);
                            if covered.iter().any(|c| !absorbed.contains(c)) {
                                return None;
                            }
                        }
                        Some((node, absorbed))
                    };
                    let aggregated = region != cut;
                    try_place(region, absorbed)
                        .or_else(|| aggregated.then(|| try_place(cut, vec![id])).flatten())
                };
                let Some((node, absorbed)) = placed else {
                    continue;
                };

                trace!(
                    proto = %tech.contact_protos()[tmpl.proto.0].name,
                    cuts = absorbed.len(),
                    bbox = ?node,
                    "placed contact"
                );
                for &a in &absorbed {
                    bucket.arena.remove(a);
                }
                placements.push(Placement {
                    proto: tmpl.proto,
                    orient: tmpl.orient,
                    bbox: node,
                    footprint: tmpl.footprint.clone(),
                });
                matched = true;
                break;
            }

            if !matched {
                let missing = missing_layers(&templates, center, g, tech);
                let message = if missing.is_empty() {
                    // Every footprint layer covers the cut center; the match
                    // failed on fit, not presence.
                    format!(
                        "unmatched {} cut; no prototype footprint fits the surrounding geometry",
                        tech.layer_name(cut_layer)
                    )
                } else {
                    format!("unmatched {} cut", tech.layer_name(cut_layer))
                };
                issues.add(
                    ExtractionIssue::warn(cell_name.clone(), center, message).with_layers(missing),
                );
                // Preserve the cut geometry so no input area is lost.
                g.working.insert_rect(cut_layer, cut);
                bucket.arena.remove(id);
            }
        }
    }

    // Deferred footprint subtraction, then node creation.
    for p in &placements {
        for f in &p.footprint {
            if !g.has_well && tech.function(f.layer).is_well() {
                continue;
            }
            g.working.subtract_rect(f.layer, Template::footprint_rect(p.bbox, f));
        }
    }
    for p in placements {
        out.add_node(Node {
            kind: NodeKind::Contact(p.proto),
            bbox: p.bbox,
            orient: p.orient,
            outline: None,
            holes: Vec::new(),
        });
    }

    debug!(
        cell = %cell_name,
        contacts = out.count_nodes(|n| matches!(n.kind, NodeKind::Contact(_))),
        "contact recognition complete"
    );
    job.set_progress(progress.1);
    Ok(())
}

/// Finds a node box for the cut region: the base box at the best anchor,
/// grown per side to the largest fitting rectangle.
fn place_node<T: Technology + ?Sized, E: PolygonEngine>(
    region: Rect,
    tmpl: &Template,
    original: &Merge<E>,
    tech: &T,
    has_well: bool,
) -> Option<Rect> {
    for (dx, dy) in anchor_offsets(tmpl) {
        let base = base_node_box(region, tmpl).translate(geometry::point::Point::new(dx, dy));
        // Shifted boxes must still cover the cut region.
        if !base.contains_rect(region) {
            continue;
        }
        if !footprint_fits(base, tmpl, original, tech, has_well) {
            continue;
        }
        let mut node = base;
        for side in Side::ALL {
            node = grow_side(node, side, tmpl, original, tech, has_well);
        }
        return Some(node);
    }
    None
}

/// The union of footprint layers not covering `center`, across every
/// template, for the unmatched-cut diagnostic.
fn missing_layers<T: Technology + ?Sized, E: PolygonEngine>(
    templates: &[Template],
    center: geometry::point::Point,
    g: &Gathered<E>,
    tech: &T,
) -> Vec<ArcStr> {
    let mut out: Vec<ArcStr> = Vec::new();
    for tmpl in templates {
        for f in &tmpl.footprint {
            if !g.has_well && tech.function(f.layer).is_well() {
                continue;
            }
            if !g.original.contains_point(f.layer, center) {
                let name = tech.layer_name(f.layer);
                if !out.contains(&name) {
                    out.push(name);
                }
            }
        }
    }
    out
}

fn stage_progress(range: (u8, u8), done: usize, total: usize) -> u8 {
    if total == 0 {
        return range.1;
    }
    let span = (range.1 - range.0) as usize;
    range.0 + (span * done.min(total) / total) as u8
}
