//! Cell models: pure-layout input cells and structured output cells.

use arcstr::ArcStr;
use geometry::point::Point;
use geometry::polygon::Polygon;
use geometry::rect::Rect;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::tech::{ContactProtoId, LayerId, MosProtoId, Technology};

new_key_type! {
    /// Keys for cells in a [`Library`].
    pub struct CellKey;
    /// Keys for elements in an output [`Cell`].
    pub struct ElementKey;
}

/// A library of pure-layout source cells.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Library {
    /// The cells, keyed for instance references.
    pub cells: SlotMap<CellKey, SourceCell>,
}

impl Library {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cell, returning its key.
    pub fn add_cell(&mut self, cell: SourceCell) -> CellKey {
        self.cells.insert(cell)
    }
}

/// A rotation applied to an instance or a generated node.
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum Orient {
    /// No rotation.
    #[default]
    R0,
    /// 90 degrees counter-clockwise.
    R90,
    /// 180 degrees.
    R180,
    /// 270 degrees counter-clockwise.
    R270,
}

impl Orient {
    /// Rotates a point about the origin.
    pub const fn apply(&self, p: Point) -> Point {
        match self {
            Orient::R0 => p,
            Orient::R90 => Point::new(-p.y, p.x),
            Orient::R180 => Point::new(-p.x, -p.y),
            Orient::R270 => Point::new(p.y, -p.x),
        }
    }

    /// The rotation equivalent to applying `self`, then `outer`.
    pub const fn then(&self, outer: Orient) -> Orient {
        const ALL: [Orient; 4] = [Orient::R0, Orient::R90, Orient::R180, Orient::R270];
        let a = *self as usize;
        let b = outer as usize;
        ALL[(a + b) % 4]
    }

    /// The rotation undoing `self`.
    pub const fn inverse(&self) -> Orient {
        match self {
            Orient::R0 => Orient::R0,
            Orient::R90 => Orient::R270,
            Orient::R180 => Orient::R180,
            Orient::R270 => Orient::R90,
        }
    }

    /// Rotates a rectangle about the origin.
    pub fn apply_rect(&self, r: Rect) -> Rect {
        Rect::from_corners(self.apply(r.p0()), self.apply(r.p1()))
    }

    /// Rotates a polygon about the origin.
    pub fn apply_polygon(&self, p: &Polygon) -> Polygon {
        Polygon::from_verts(p.points().iter().map(|&v| self.apply(v)).collect())
    }
}

/// One raw input shape: a material layer tag and geometry, nothing more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PureShape {
    /// The material layer (pre-canonicalization).
    pub layer: LayerId,
    /// The shape geometry.
    pub shape: Shape,
}

/// Rectangle or polygon geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Shape {
    /// An axis-aligned rectangle.
    Rect(Rect),
    /// A general polygon.
    Polygon(Polygon),
}

impl Shape {
    /// The bounding box of this shape, if non-empty.
    pub fn bbox(&self) -> Option<Rect> {
        match self {
            Shape::Rect(r) => Some(*r),
            Shape::Polygon(p) => p.bbox(),
        }
    }
}

/// A placed instance of another cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInstance {
    /// The instantiated cell.
    pub cell: CellKey,
    /// The instance name.
    pub name: ArcStr,
    /// Placement: the child origin in parent coordinates.
    pub loc: Point,
    /// Placement rotation, applied before translation.
    pub orient: Orient,
}

/// An exported connection point of a source cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceExport {
    /// The export (network) name.
    pub name: ArcStr,
    /// The layer the export connects on (pre-canonicalization).
    pub layer: LayerId,
    /// The export location in cell coordinates.
    pub loc: Point,
}

/// A cell containing only raw geometric shapes, sub-cell instances, and
/// exported points.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SourceCell {
    /// The cell name.
    pub name: ArcStr,
    /// The raw shapes.
    pub shapes: Vec<PureShape>,
    /// Sub-cell instances.
    pub instances: Vec<SourceInstance>,
    /// Exported connection points.
    pub exports: Vec<SourceExport>,
}

impl SourceCell {
    /// Creates an empty cell with the given name.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// The device/contact/pin kind of a generated node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A contact or via instance of the given prototype.
    Contact(ContactProtoId),
    /// A transistor instance of the given prototype.
    Mos(MosProtoId),
    /// A connection pin on the given (canonical) layer.
    Pin(LayerId),
    /// Leftover pure-layer geometry, preserved so no input area is lost.
    PureLayer(LayerId),
}

/// A generated node: a device, contact, pin, or leftover shape.
///
/// Once created, a node belongs to the output cell and is never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// What this node is.
    pub kind: NodeKind,
    /// The node bounding box.
    pub bbox: Rect,
    /// The node orientation.
    pub orient: Orient,
    /// An explicit outline trace for non-Manhattan nodes (serpentine
    /// transistors, leftover polygons).
    pub outline: Option<Polygon>,
    /// Hole boundaries cut out of `outline`, for leftover regions that
    /// enclose area they do not cover.
    pub holes: Vec<Polygon>,
}

impl Node {
    /// The node's anchor point (bounding box center).
    pub fn center(&self) -> Point {
        self.bbox.center()
    }
}

/// One end of a generated arc.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArcEnd {
    /// The element this end connects to.
    pub node: ElementKey,
    /// The connection location.
    pub loc: Point,
    /// Whether the wire extends half its width past `loc`.
    pub extended: bool,
}

/// A generated routed wire between two ports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcInst {
    /// The (canonical) layer the wire runs on.
    pub layer: LayerId,
    /// The wire width. Zero-width arcs carry connectivity only.
    pub width: i64,
    /// The head end.
    pub head: ArcEnd,
    /// The tail end.
    pub tail: ArcEnd,
}

/// A placed sub-cell instance carried into the output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// The instantiated cell.
    pub cell: CellKey,
    /// The instance name.
    pub name: ArcStr,
    /// Placement translation.
    pub loc: Point,
    /// Placement rotation.
    pub orient: Orient,
    /// The instance bounding box in parent coordinates.
    pub bbox: Rect,
}

/// An element of an output cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Element {
    /// A generated node.
    Node(Node),
    /// A generated arc.
    Arc(ArcInst),
    /// A sub-cell instance.
    Instance(Instance),
}

/// An export on an output cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Export {
    /// The export name.
    pub name: ArcStr,
    /// The exported element.
    pub at: ElementKey,
    /// The export location.
    pub loc: Point,
    /// The (canonical) layer the export connects on.
    pub layer: LayerId,
}

/// A structured output cell.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// The cell name.
    pub name: ArcStr,
    /// All elements, keyed.
    pub elements: SlotMap<ElementKey, Element>,
    /// Exports.
    pub exports: Vec<Export>,
}

impl Cell {
    /// Creates an empty output cell.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds a node, returning its key.
    pub fn add_node(&mut self, node: Node) -> ElementKey {
        self.elements.insert(Element::Node(node))
    }

    /// Adds an arc, returning its key.
    pub fn add_arc(&mut self, arc: ArcInst) -> ElementKey {
        self.elements.insert(Element::Arc(arc))
    }

    /// Adds a sub-cell instance, returning its key.
    pub fn add_instance(&mut self, inst: Instance) -> ElementKey {
        self.elements.insert(Element::Instance(inst))
    }

    /// Iterates over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = (ElementKey, &Node)> {
        self.elements.iter().filter_map(|(k, e)| match e {
            Element::Node(n) => Some((k, n)),
            _ => None,
        })
    }

    /// Iterates over all arcs.
    pub fn arcs(&self) -> impl Iterator<Item = (ElementKey, &ArcInst)> {
        self.elements.iter().filter_map(|(k, e)| match e {
            Element::Arc(a) => Some((k, a)),
            _ => None,
        })
    }

    /// Iterates over all sub-cell instances.
    pub fn instances(&self) -> impl Iterator<Item = (ElementKey, &Instance)> {
        self.elements.iter().filter_map(|(k, e)| match e {
            Element::Instance(i) => Some((k, i)),
            _ => None,
        })
    }

    /// The number of nodes of each kind matching `pred`.
    pub fn count_nodes(&self, pred: impl Fn(&Node) -> bool) -> usize {
        self.nodes().filter(|(_, n)| pred(n)).count()
    }
}

/// Whether a node of the given kind offers a port on `layer`.
pub fn node_connects_to<T: Technology + ?Sized>(tech: &T, kind: NodeKind, layer: LayerId) -> bool {
    match kind {
        NodeKind::Pin(l) => l == layer,
        NodeKind::PureLayer(l) => l == layer,
        NodeKind::Contact(id) => {
            let proto = &tech.contact_protos()[id.0];
            proto
                .footprint
                .iter()
                .any(|f| f.layer == layer && tech.function(f.layer).is_connectable())
        }
        NodeKind::Mos(id) => {
            let proto = &tech.mos_protos()[id.0];
            proto.gate == layer || proto.active == layer
        }
    }
}
