//! An example technology for documentation and tests.
//!
//! A small two-metal CMOS-like process: poly, n/p diffusion, selects, a
//! single n-well, and cuts joining diffusion/poly to metal 1 and metal 1 to
//! metal 2. Dimensions are round numbers, not any real process.

use arcstr::{literal, ArcStr};
use geometry::side::Sides;

use super::{
    ContactProto, FootprintLayer, LayerFunction, LayerId, LayerInfo, MosProto, Polarity,
    Technology, WireKind,
};

/// The example technology.
#[derive(Debug, Clone)]
pub struct ExampleTech {
    layers: Vec<LayerInfo>,
    canonical: Vec<LayerId>,
    contacts: Vec<ContactProto>,
    mos: Vec<MosProto>,
    wires: Vec<WireKind>,
}

impl ExampleTech {
    /// Gate polysilicon.
    pub const POLY: LayerId = LayerId(0);
    /// N diffusion.
    pub const NDIFF: LayerId = LayerId(1);
    /// P diffusion.
    pub const PDIFF: LayerId = LayerId(2);
    /// N select.
    pub const NSELECT: LayerId = LayerId(3);
    /// P select.
    pub const PSELECT: LayerId = LayerId(4);
    /// N well.
    pub const NWELL: LayerId = LayerId(5);
    /// Metal 1.
    pub const MET1: LayerId = LayerId(6);
    /// Metal 2.
    pub const MET2: LayerId = LayerId(7);
    /// N diffusion contact cut.
    pub const NDIFFC: LayerId = LayerId(8);
    /// P diffusion contact cut.
    pub const PDIFFC: LayerId = LayerId(9);
    /// Poly contact cut.
    pub const POLYC: LayerId = LayerId(10);
    /// Metal 1 to metal 2 cut.
    pub const VIA1: LayerId = LayerId(11);
    /// A metal 1 pin alias; canonicalizes to [`Self::MET1`].
    pub const MET1_PIN: LayerId = LayerId(12);

    /// The drawn size of every cut in this technology.
    pub const CUT_SIZE: i64 = 4;
    /// The cut-to-cut spacing inside multi-cut contacts.
    pub const CUT_SPACING: i64 = 4;
    /// The minimum contact node size.
    pub const CONTACT_SIZE: i64 = 12;

    /// Creates the example technology.
    pub fn new() -> Self {
        let layer = |id: LayerId, name: ArcStr, function: LayerFunction| LayerInfo {
            id,
            name,
            function,
        };
        let layers = vec![
            layer(Self::POLY, literal!("poly"), LayerFunction::Poly),
            layer(
                Self::NDIFF,
                literal!("ndiff"),
                LayerFunction::Active(Polarity::N),
            ),
            layer(
                Self::PDIFF,
                literal!("pdiff"),
                LayerFunction::Active(Polarity::P),
            ),
            layer(
                Self::NSELECT,
                literal!("nselect"),
                LayerFunction::Select(Polarity::N),
            ),
            layer(
                Self::PSELECT,
                literal!("pselect"),
                LayerFunction::Select(Polarity::P),
            ),
            layer(
                Self::NWELL,
                literal!("nwell"),
                LayerFunction::Well(Polarity::N),
            ),
            layer(Self::MET1, literal!("met1"), LayerFunction::Metal(1)),
            layer(Self::MET2, literal!("met2"), LayerFunction::Metal(2)),
            layer(
                Self::NDIFFC,
                literal!("ndiffc"),
                LayerFunction::Cut {
                    below: Self::NDIFF,
                    above: Self::MET1,
                },
            ),
            layer(
                Self::PDIFFC,
                literal!("pdiffc"),
                LayerFunction::Cut {
                    below: Self::PDIFF,
                    above: Self::MET1,
                },
            ),
            layer(
                Self::POLYC,
                literal!("polyc"),
                LayerFunction::Cut {
                    below: Self::POLY,
                    above: Self::MET1,
                },
            ),
            layer(
                Self::VIA1,
                literal!("via1"),
                LayerFunction::Cut {
                    below: Self::MET1,
                    above: Self::MET2,
                },
            ),
            layer(Self::MET1_PIN, literal!("met1.pin"), LayerFunction::Metal(1)),
        ];

        let mut canonical: Vec<LayerId> = layers.iter().map(|l| l.id).collect();
        canonical[Self::MET1_PIN.index()] = Self::MET1;

        let fp = |layer: LayerId, shrink: i64| FootprintLayer {
            layer,
            shrinks: Sides::uniform(shrink),
        };
        let contacts = vec![
            ContactProto {
                name: literal!("ndc"),
                cut_layer: Self::NDIFFC,
                cut_size: Self::CUT_SIZE,
                cut_spacing: Self::CUT_SPACING,
                multi_cut: true,
                min_width: Self::CONTACT_SIZE,
                min_height: Self::CONTACT_SIZE,
                footprint: vec![
                    fp(Self::NDIFF, 0),
                    fp(Self::MET1, 2),
                    fp(Self::NSELECT, -2),
                ],
            },
            ContactProto {
                name: literal!("pdc"),
                cut_layer: Self::PDIFFC,
                cut_size: Self::CUT_SIZE,
                cut_spacing: Self::CUT_SPACING,
                multi_cut: true,
                min_width: Self::CONTACT_SIZE,
                min_height: Self::CONTACT_SIZE,
                footprint: vec![
                    fp(Self::PDIFF, 0),
                    fp(Self::MET1, 2),
                    fp(Self::PSELECT, -2),
                    fp(Self::NWELL, -4),
                ],
            },
            ContactProto {
                name: literal!("pc"),
                cut_layer: Self::POLYC,
                cut_size: Self::CUT_SIZE,
                cut_spacing: Self::CUT_SPACING,
                multi_cut: true,
                min_width: Self::CONTACT_SIZE,
                min_height: Self::CONTACT_SIZE,
                footprint: vec![fp(Self::POLY, 0), fp(Self::MET1, 2)],
            },
            // The via footprint is asymmetric: metal 1 extends horizontally,
            // metal 2 vertically. This gives the extractor a rotated
            // template variant to try.
            ContactProto {
                name: literal!("via1"),
                cut_layer: Self::VIA1,
                cut_size: Self::CUT_SIZE,
                cut_spacing: Self::CUT_SPACING,
                multi_cut: true,
                min_width: Self::CONTACT_SIZE,
                min_height: Self::CONTACT_SIZE,
                footprint: vec![
                    FootprintLayer {
                        layer: Self::MET1,
                        shrinks: Sides::new(0, 2, 0, 2),
                    },
                    FootprintLayer {
                        layer: Self::MET2,
                        shrinks: Sides::new(2, 0, 2, 0),
                    },
                ],
            },
        ];

        let mos = vec![
            MosProto {
                name: literal!("nmos"),
                gate: Self::POLY,
                active: Self::NDIFF,
                selects: vec![Self::NSELECT],
                well: None,
                gate_extension: 4,
                sd_extension: 6,
                select_surround: 4,
                well_surround: 0,
            },
            MosProto {
                name: literal!("pmos"),
                gate: Self::POLY,
                active: Self::PDIFF,
                selects: vec![Self::PSELECT],
                well: Some(Self::NWELL),
                gate_extension: 4,
                sd_extension: 6,
                select_surround: 4,
                well_surround: 8,
            },
        ];

        let wire = |name: ArcStr, layer: LayerId, min_width: i64| WireKind {
            name,
            layer,
            min_width,
        };
        let wires = vec![
            wire(literal!("poly"), Self::POLY, 4),
            wire(literal!("ndiff"), Self::NDIFF, 6),
            wire(literal!("pdiff"), Self::PDIFF, 6),
            wire(literal!("met1"), Self::MET1, 6),
            wire(literal!("met2"), Self::MET2, 8),
        ];

        Self {
            layers,
            canonical,
            contacts,
            mos,
            wires,
        }
    }
}

impl Default for ExampleTech {
    fn default() -> Self {
        Self::new()
    }
}

impl Technology for ExampleTech {
    fn layers(&self) -> &[LayerInfo] {
        &self.layers
    }

    fn canonical(&self, layer: LayerId) -> LayerId {
        self.canonical[layer.index()]
    }

    fn contact_protos(&self) -> &[ContactProto] {
        &self.contacts
    }

    fn mos_protos(&self) -> &[MosProto] {
        &self.mos
    }

    fn wire_for_layer(&self, layer: LayerId) -> Option<&WireKind> {
        self.wires.iter().find(|w| w.layer == layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalization() {
        let tech = ExampleTech::new();
        assert_eq!(tech.canonical(ExampleTech::MET1_PIN), ExampleTech::MET1);
        assert_eq!(tech.canonical(ExampleTech::POLY), ExampleTech::POLY);
    }

    #[test]
    fn layer_roles() {
        let tech = ExampleTech::new();
        assert!(tech.function(ExampleTech::VIA1).is_cut());
        assert!(tech.function(ExampleTech::NWELL).is_well());
        assert!(tech.function(ExampleTech::MET1).is_connectable());
        assert!(!tech.function(ExampleTech::NSELECT).is_connectable());
        assert_eq!(tech.min_wire_width(ExampleTech::MET2), 8);
        assert_eq!(tech.min_wire_width(ExampleTech::NWELL), 0);
    }
}
