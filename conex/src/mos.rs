//! Transistor recognition.
//!
//! A transistor exists wherever gate poly crosses diffusion. Each connected
//! component of the poly/active intersection becomes one device: rectangular
//! components are matched directly against the prototype catalog, and
//! non-rectangular components (bent or serpentine gates) are reduced to a
//! gate centerline chain first.

use arcstr::ArcStr;
use diagnostics::IssueSet;
use geometry::point::Point;
use geometry::polygon::Polygon;
use geometry::rect::Rect;
use tracing::{debug, trace};

use crate::cell::{Cell, Node, NodeKind, Orient};
use crate::config::ExtractionConfig;
use crate::error::{ExtractionError, Result};
use crate::gather::Gathered;
use crate::issue::ExtractionIssue;
use crate::job::Job;
use crate::merge::PolygonEngine;
use crate::skeleton::{skeletonize, Centerline};
use crate::tech::{LayerId, MosProto, MosProtoId, Technology};

/// Recognizes transistors at every gate/diffusion crossing.
#[allow(clippy::too_many_arguments)]
pub(crate) fn extract_mos<T: Technology + ?Sized, E: PolygonEngine>(
    cell_name: &ArcStr,
    g: &mut Gathered<E>,
    tech: &T,
    cfg: &ExtractionConfig,
    out: &mut Cell,
    issues: &mut IssueSet<ExtractionIssue>,
    job: &mut dyn Job,
    progress: (u8, u8),
) -> Result<()> {
    let mut pairs: Vec<(LayerId, LayerId)> = Vec::new();
    for proto in tech.mos_protos() {
        if !pairs.contains(&(proto.gate, proto.active)) {
            pairs.push((proto.gate, proto.active));
        }
    }

    for (gate, active) in pairs {
        let scratch = match (g.working.layer(gate), g.working.layer(active)) {
            (Some(p), Some(a)) => p.intersection(a),
            _ => continue,
        };
        if scratch.is_empty() {
            continue;
        }
        let orig_scratch = match (g.original.layer(gate), g.original.layer(active)) {
            (Some(p), Some(a)) => p.intersection(a),
            _ => continue,
        };
        let candidates: Vec<(MosProtoId, &MosProto)> = tech
            .mos_protos()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.gate == gate && p.active == active)
            .map(|(i, p)| (MosProtoId(i), p))
            .collect();

        for region in scratch.merged_polygons() {
            if job.is_cancelled() {
                return Err(ExtractionError::Cancelled);
            }
            let placed = match region.as_rect() {
                Some(r) => rect_mos(r, &candidates, g, out),
                None => serpentine_mos(
                    cell_name,
                    &region,
                    &candidates,
                    g,
                    tech,
                    cfg,
                    &orig_scratch,
                    out,
                    issues,
                ),
            };
            if !placed {
                let loc = region.bbox().map(|b| b.center()).unwrap_or_default();
                issues.add(
                    ExtractionIssue::warn(
                        cell_name.clone(),
                        loc,
                        "gate/diffusion crossing matches no transistor prototype",
                    )
                    .with_layers([tech.layer_name(gate), tech.layer_name(active)]),
                );
            }
        }
    }

    debug!(
        cell = %cell_name,
        transistors = out.count_nodes(|n| matches!(n.kind, NodeKind::Mos(_))),
        "transistor recognition complete"
    );
    job.set_progress(progress.1);
    Ok(())
}

/// The direction the gate poly runs through a rectangular crossing, probed
/// one unit outside each edge midpoint in the original geometry.
fn poly_direction<E: PolygonEngine>(
    region: Rect,
    gate: LayerId,
    active: LayerId,
    g: &Gathered<E>,
) -> bool {
    let c = region.center();
    let probe = |layer: LayerId, p: Point| g.original.contains_point(layer, p);
    let poly_horiz = probe(gate, Point::new(region.left() - 1, c.y))
        || probe(gate, Point::new(region.right() + 1, c.y));
    let poly_vert = probe(gate, Point::new(c.x, region.bot() - 1))
        || probe(gate, Point::new(c.x, region.top() + 1));
    if poly_horiz != poly_vert {
        return poly_horiz;
    }
    // Ambiguous poly: let the diffusion break the tie.
    let active_vert = probe(active, Point::new(c.x, region.bot() - 1))
        || probe(active, Point::new(c.x, region.top() + 1));
    active_vert
}

/// Matches a rectangular crossing against the candidate prototypes,
/// consuming the matched footprint.
fn rect_mos<E: PolygonEngine>(
    region: Rect,
    candidates: &[(MosProtoId, &MosProto)],
    g: &mut Gathered<E>,
    out: &mut Cell,
) -> bool {
    let horiz = poly_direction(region, candidates[0].1.gate, candidates[0].1.active, g);

    for &(id, proto) in candidates {
        let (poly_rect, active_rect) = if horiz {
            (
                Rect::from_sides(
                    region.left() - proto.gate_extension,
                    region.bot(),
                    region.right() + proto.gate_extension,
                    region.top(),
                ),
                Rect::from_sides(
                    region.left(),
                    region.bot() - proto.sd_extension,
                    region.right(),
                    region.top() + proto.sd_extension,
                ),
            )
        } else {
            (
                Rect::from_sides(
                    region.left(),
                    region.bot() - proto.gate_extension,
                    region.right(),
                    region.top() + proto.gate_extension,
                ),
                Rect::from_sides(
                    region.left() - proto.sd_extension,
                    region.bot(),
                    region.right() + proto.sd_extension,
                    region.top(),
                ),
            )
        };
        if !g.original.contains_rect(proto.gate, poly_rect)
            || !g.original.contains_rect(proto.active, active_rect)
        {
            continue;
        }
        let union = poly_rect.union(active_rect);
        let select_rect = union.expand_all(proto.select_surround);
        if !proto
            .selects
            .iter()
            .all(|&s| g.original.contains_rect(s, select_rect))
        {
            continue;
        }
        let well_rect = union.expand_all(proto.well_surround);
        if g.has_well {
            if let Some(well) = proto.well {
                if !g.original.contains_rect(well, well_rect) {
                    continue;
                }
            }
        }

        trace!(proto = %proto.name, bbox = ?union, "placed transistor");
        g.working.subtract_rect(proto.gate, poly_rect);
        g.working.subtract_rect(proto.active, active_rect);
        for &s in &proto.selects {
            g.working.subtract_rect(s, select_rect);
        }
        if g.has_well {
            if let Some(well) = proto.well {
                g.working.subtract_rect(well, well_rect);
            }
        }
        out.add_node(Node {
            kind: NodeKind::Mos(id),
            bbox: union,
            orient: if horiz { Orient::R0 } else { Orient::R90 },
            outline: None,
            holes: Vec::new(),
        });
        return true;
    }
    false
}

/// Reduces a bent or serpentine crossing to a gate centerline chain and
/// places one device over the whole region.
#[allow(clippy::too_many_arguments)]
fn serpentine_mos<T: Technology + ?Sized, E: PolygonEngine>(
    cell_name: &ArcStr,
    region: &Polygon,
    candidates: &[(MosProtoId, &MosProto)],
    g: &mut Gathered<E>,
    tech: &T,
    cfg: &ExtractionConfig,
    orig_scratch: &E,
    out: &mut Cell,
    issues: &mut IssueSet<ExtractionIssue>,
) -> bool {
    let Some(bbox) = region.bbox() else {
        return false;
    };
    let lines = skeletonize(region, 1, orig_scratch, cfg);
    if lines.is_empty() {
        return false;
    }
    let Some(chain) = chain_polyline(&lines) else {
        issues.add(
            ExtractionIssue::warn(
                cell_name.clone(),
                bbox.center(),
                "gate region has a branching centerline; cannot form one device",
            )
            .with_layers([tech.layer_name(candidates[0].1.gate)]),
        );
        return true;
    };

    // Prototype choice for irregular gates checks layer presence at the
    // region center rather than exact footprint fit.
    let center = bbox.center();
    let chosen = candidates.iter().find(|(_, p)| {
        p.selects
            .iter()
            .all(|&s| g.original.contains_point(s, center))
            && (!g.has_well
                || p.well
                    .is_none_or(|w| g.original.contains_point(w, center)))
    });
    let Some(&(id, proto)) = chosen else {
        return false;
    };

    // The device is the chained gate centerline; its vertices are the
    // outline trace and its extent is the node box.
    let outline = Polygon::from_verts(chain);
    let Some(trace_bbox) = outline.bbox() else {
        return false;
    };
    trace!(proto = %proto.name, bbox = ?trace_bbox, "placed serpentine transistor");
    g.working.subtract_polygon(proto.gate, region);
    g.working.subtract_polygon(proto.active, region);
    out.add_node(Node {
        kind: NodeKind::Mos(id),
        bbox: trace_bbox,
        orient: Orient::R0,
        outline: Some(outline),
        holes: Vec::new(),
    });
    true
}

/// Orders centerlines into a single head-to-tail polyline, or fails on
/// branches and disconnected pieces.
fn chain_polyline(lines: &[Centerline]) -> Option<Vec<Point>> {
    let mut segs: Vec<(Point, Point)> = lines.iter().map(|l| (l.start, l.end)).collect();
    let (mut front, mut back) = segs.swap_remove(0);
    let mut chain = vec![front, back];
    while !segs.is_empty() {
        let mut found = None;
        for (i, &(a, b)) in segs.iter().enumerate() {
            if a == back {
                found = Some((i, b, true));
            } else if b == back {
                found = Some((i, a, true));
            } else if a == front {
                found = Some((i, b, false));
            } else if b == front {
                found = Some((i, a, false));
            }
            if found.is_some() {
                break;
            }
        }
        let (i, p, at_back) = found?;
        segs.swap_remove(i);
        if at_back {
            chain.push(p);
            back = p;
        } else {
            chain.insert(0, p);
            front = p;
        }
    }
    Some(chain)
}
