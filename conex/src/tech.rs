//! The technology model contract.
//!
//! A [`Technology`] describes, per material layer, its functional role, and
//! enumerates the device/contact prototypes the extractor may instantiate.
//! All dimensions are in internal grid units.

use arcstr::ArcStr;
use geometry::side::Sides;
use serde::{Deserialize, Serialize};

pub mod example;

/// A technology-wide unique identifier for a layer.
///
/// Ids are dense indices into [`Technology::layers`].
#[derive(
    Debug, Default, Copy, Clone, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct LayerId(pub u32);

impl LayerId {
    /// This id as a slice index.
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// The flavor of an active (diffusion) layer or of a select/well layer.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum Polarity {
    /// N-type.
    N,
    /// P-type.
    P,
}

/// The functional role of a layer.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum LayerFunction {
    /// Gate polysilicon.
    Poly,
    /// Diffusion of the given flavor.
    Active(Polarity),
    /// Metal level `N` (1-based).
    Metal(u8),
    /// A contact/via cut joining two conductive layers.
    Cut {
        /// The conductive layer below the cut.
        below: LayerId,
        /// The conductive layer above the cut.
        above: LayerId,
    },
    /// A well of the given flavor.
    Well(Polarity),
    /// A select/implant of the given flavor.
    Select(Polarity),
    /// Any layer the extractor does not interpret.
    Other,
}

impl LayerFunction {
    /// Whether this is a contact/via cut layer.
    pub const fn is_cut(&self) -> bool {
        matches!(self, LayerFunction::Cut { .. })
    }

    /// Whether this is a well layer.
    pub const fn is_well(&self) -> bool {
        matches!(self, LayerFunction::Well(_))
    }

    /// Whether geometry on this layer carries signals that wires can route.
    pub const fn is_connectable(&self) -> bool {
        matches!(
            self,
            LayerFunction::Poly | LayerFunction::Active(_) | LayerFunction::Metal(_)
        )
    }
}

/// General information for one technology layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerInfo {
    /// The layer's id; equal to its index in [`Technology::layers`].
    pub id: LayerId,
    /// The layer name.
    pub name: ArcStr,
    /// The layer's functional role.
    pub function: LayerFunction,
}

/// One non-cut layer of a contact prototype's footprint.
///
/// The layer's drawn rectangle is the node bounding box shrunk by the
/// per-side amounts (negative values extend past the node box).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootprintLayer {
    /// The (canonical) layer drawn.
    pub layer: LayerId,
    /// Per-side inset from the node bounding box.
    pub shrinks: Sides<i64>,
}

/// An index into [`Technology::contact_protos`].
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ContactProtoId(pub usize);

/// A contact/via prototype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactProto {
    /// The prototype name.
    pub name: ArcStr,
    /// The cut layer this prototype explains.
    pub cut_layer: LayerId,
    /// The drawn size of a single cut.
    pub cut_size: i64,
    /// Minimum cut-to-cut spacing inside a multi-cut node.
    pub cut_spacing: i64,
    /// Whether this prototype may absorb multiple cuts into one node.
    pub multi_cut: bool,
    /// Minimum node width.
    pub min_width: i64,
    /// Minimum node height.
    pub min_height: i64,
    /// Non-cut layers drawn by this prototype.
    pub footprint: Vec<FootprintLayer>,
}

/// An index into [`Technology::mos_protos`].
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct MosProtoId(pub usize);

/// A transistor prototype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MosProto {
    /// The prototype name.
    pub name: ArcStr,
    /// The gate layer (polysilicon).
    pub gate: LayerId,
    /// The diffusion flavor this transistor is built in.
    pub active: LayerId,
    /// Select/implant layers that must surround the device.
    pub selects: Vec<LayerId>,
    /// The well the device sits in, if the process draws one.
    pub well: Option<LayerId>,
    /// How far poly extends past active at both gate ends.
    pub gate_extension: i64,
    /// How far active extends past poly at both source/drain ends.
    pub sd_extension: i64,
    /// Select surround beyond the poly/active union.
    pub select_surround: i64,
    /// Well surround beyond the poly/active union.
    pub well_surround: i64,
}

/// The wire type carried by a connectable layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireKind {
    /// The wire type name.
    pub name: ArcStr,
    /// The layer the wire is drawn on.
    pub layer: LayerId,
    /// The minimum legal wire width.
    pub min_width: i64,
}

/// The technology model consumed by the extractor.
pub trait Technology {
    /// All layers, indexed by [`LayerId`].
    fn layers(&self) -> &[LayerInfo];

    /// Maps a layer to the canonical representative of its functional role.
    ///
    /// Merge and search operations only see canonical layers, so all
    /// variants of a role (e.g. every gate-poly alias) must map to one id.
    fn canonical(&self, layer: LayerId) -> LayerId;

    /// All contact/via prototypes.
    fn contact_protos(&self) -> &[ContactProto];

    /// All transistor prototypes.
    fn mos_protos(&self) -> &[MosProto];

    /// The wire type preferred for the given (canonical) layer, if the
    /// layer is routable.
    fn wire_for_layer(&self, layer: LayerId) -> Option<&WireKind>;

    /// Information for one layer.
    fn info(&self, layer: LayerId) -> &LayerInfo {
        &self.layers()[layer.index()]
    }

    /// The functional role of one layer.
    fn function(&self, layer: LayerId) -> LayerFunction {
        self.info(layer).function
    }

    /// The name of one layer.
    fn layer_name(&self, layer: LayerId) -> ArcStr {
        self.info(layer).name.clone()
    }

    /// The minimum wire width on the given layer, or zero if unrouted.
    fn min_wire_width(&self, layer: LayerId) -> i64 {
        self.wire_for_layer(layer).map(|w| w.min_width).unwrap_or(0)
    }
}
