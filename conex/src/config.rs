//! Extraction configuration.

use serde::{Deserialize, Serialize};

/// How instances of sub-cells are treated during gathering.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlattenPolicy {
    /// Only the top cell's own geometry is gathered; sub-cell instances are
    /// carried into the output unchanged and connected through their ports.
    #[default]
    TopOnly,
    /// Sub-cell geometry is flattened into the top cell before extraction.
    Recursive,
}

/// Policy for half-width compensation when snapping centerline endpoints to
/// the routing grid.
///
/// With [`HalfWidthMode::Ignore`], the endpoint itself is snapped. With
/// [`HalfWidthMode::Compensate`], the wire *edge* (endpoint minus half the
/// wire width) is snapped and the endpoint recomputed from it. Neither is
/// universally correct; both are supported and tested.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HalfWidthMode {
    /// Snap centerline endpoints directly.
    #[default]
    Ignore,
    /// Snap wire edges, then recompute endpoints.
    Compensate,
}

/// Configuration for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Multiplier applied to all input coordinates when scaling onto the
    /// internal fixed-point grid. Technology dimensions are expressed in
    /// grid units directly.
    pub grid_scale: i64,
    /// The routing grid pitch, in grid units. Realized wire endpoints are
    /// kept snap-compatible with this pitch.
    pub routing_grid: i64,
    /// Sub-cell expansion policy.
    pub flatten: FlattenPolicy,
    /// When set, a multi-cut contact match is only accepted if the sized
    /// node covers exactly the set of cuts it absorbed.
    pub strict_cut_match: bool,
    /// Endpoint grid-alignment policy for extracted centerlines.
    pub half_width: HalfWidthMode,
    /// Scan sub-cells recursively when inferring the presumed well process.
    pub recursive_well_scan: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            grid_scale: 1,
            routing_grid: 1,
            flatten: FlattenPolicy::TopOnly,
            strict_cut_match: false,
            half_width: HalfWidthMode::Ignore,
            recursive_well_scan: true,
        }
    }
}
