//! Layout connectivity extraction.
//!
//! Reconstructs structured circuit cells (transistors, contacts/vias, routed
//! wires, exports) from pure-layout polygon data. Extraction runs as a
//! per-cell pipeline over two per-layer merged views of the geometry: a
//! working merge that recognized features progressively empty, and an
//! original merge kept for fit tests. Every stage is best-effort; geometry
//! nothing can explain survives as pure-layer nodes, and problems surface as
//! diagnostics rather than failures.
//!
//! ```
//! use conex::{Extractor, ExtractionConfig, NoJob};
//! use conex::cell::{Library, PureShape, Shape, SourceCell};
//! use conex::tech::example::ExampleTech;
//! use geometry::rect::Rect;
//!
//! let mut lib = Library::new();
//! let mut cell = SourceCell::new("top");
//! cell.shapes.push(PureShape {
//!     layer: ExampleTech::MET1,
//!     shape: Shape::Rect(Rect::from_sides(0, 0, 100, 10)),
//! });
//! let top = lib.add_cell(cell);
//!
//! let extractor = Extractor::new(ExampleTech::new(), ExtractionConfig::default());
//! let extracted = extractor.extract_library(&lib, top, &mut NoJob).unwrap();
//! assert_eq!(extracted.cells[top].stats.arcs, 1);
//! ```

#![warn(missing_docs)]

pub mod cell;
pub mod config;
pub mod error;
pub mod issue;
pub mod job;
pub mod merge;
pub mod spatial;
pub mod tech;

mod contact;
mod gather;
mod mos;
mod skeleton;
mod stitch;
mod wires;

use arcstr::ArcStr;
use diagnostics::IssueSet;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use tracing::{info, instrument};

pub use config::{ExtractionConfig, FlattenPolicy, HalfWidthMode};
pub use error::{ExtractionError, Result};
pub use issue::ExtractionIssue;
pub use job::{Job, NoJob, ScriptedJob};
pub use skeleton::Centerline;

use cell::{Cell, CellKey, Element, Library, NodeKind};
use gather::Gathered;
use polyset::PolySet;
use tech::Technology;

/// Element tallies for one extracted cell.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractStats {
    /// Recognized contact/via nodes.
    pub contacts: usize,
    /// Recognized transistor nodes.
    pub transistors: usize,
    /// Realized arcs (including zero-width connectivity arcs).
    pub arcs: usize,
    /// Pin nodes created at wire ends and junctions.
    pub pins: usize,
    /// Pure-layer leftover nodes.
    pub leftovers: usize,
}

/// The result of extracting one cell.
#[derive(Debug, Clone)]
pub struct Extracted {
    /// The structured output cell.
    pub cell: Cell,
    /// Diagnostics produced while extracting this cell.
    pub issues: IssueSet<ExtractionIssue>,
    /// Element tallies.
    pub stats: ExtractStats,
}

/// The extracted cells of a library, keyed like the source library.
#[derive(Debug, Clone)]
pub struct ExtractedLibrary {
    /// Extraction results per cell.
    pub cells: SecondaryMap<CellKey, Extracted>,
    /// The top cell the extraction was rooted at.
    pub top: CellKey,
}

/// A connectivity extractor for one technology and configuration.
#[derive(Debug, Clone)]
pub struct Extractor<T> {
    tech: T,
    cfg: ExtractionConfig,
}

impl<T: Technology> Extractor<T> {
    /// Creates an extractor.
    pub fn new(tech: T, cfg: ExtractionConfig) -> Self {
        Self { tech, cfg }
    }

    /// The active configuration.
    pub fn config(&self) -> &ExtractionConfig {
        &self.cfg
    }

    /// The technology model.
    pub fn tech(&self) -> &T {
        &self.tech
    }

    /// Extracts `top` and, when instances are carried through, every cell
    /// below it, children first.
    pub fn extract_library(
        &self,
        lib: &Library,
        top: CellKey,
        job: &mut dyn Job,
    ) -> Result<ExtractedLibrary> {
        let mut cells = SecondaryMap::new();
        let mut in_progress = FxHashSet::default();
        self.extract_recursive(lib, top, &mut cells, &mut in_progress, job)?;
        Ok(ExtractedLibrary { cells, top })
    }

    fn extract_recursive(
        &self,
        lib: &Library,
        key: CellKey,
        cells: &mut SecondaryMap<CellKey, Extracted>,
        in_progress: &mut FxHashSet<CellKey>,
        job: &mut dyn Job,
    ) -> Result<()> {
        if cells.contains_key(key) {
            return Ok(());
        }
        if !in_progress.insert(key) {
            return Err(ExtractionError::Internal(
                "cell instance hierarchy contains a cycle".to_string(),
            ));
        }
        if self.cfg.flatten == FlattenPolicy::TopOnly {
            let cell = lib.cells.get(key).ok_or(ExtractionError::UnknownCell)?;
            for inst in &cell.instances {
                self.extract_recursive(lib, inst.cell, cells, in_progress, job)?;
            }
        }
        let extracted = self.extract_cell(lib, key, cells, job)?;
        in_progress.remove(&key);
        cells.insert(key, extracted);
        Ok(())
    }

    /// Runs the per-cell pipeline. `children` must already hold every cell
    /// this one instantiates.
    #[instrument(skip_all, fields(cell))]
    fn extract_cell(
        &self,
        lib: &Library,
        key: CellKey,
        children: &mut SecondaryMap<CellKey, Extracted>,
        job: &mut dyn Job,
    ) -> Result<Extracted> {
        let source = lib.cells.get(key).ok_or(ExtractionError::UnknownCell)?;
        let name: ArcStr = source.name.clone();
        tracing::Span::current().record("cell", name.as_str());

        let mut out = Cell::new(name.clone());
        let mut issues = IssueSet::new();

        job.set_status(&format!("gathering {name}"));
        job.set_progress(0);
        checkpoint(job)?;
        let mut g: Gathered<PolySet> = gather::gather(lib, key, &self.tech, &self.cfg)?;
        for inst in std::mem::take(&mut g.instances) {
            out.add_instance(inst);
        }
        job.set_progress(20);

        job.set_status(&format!("recognizing vias in {name}"));
        checkpoint(job)?;
        contact::extract_contacts(
            &name, &mut g, &self.tech, &self.cfg, &mut out, &mut issues, job, (20, 45),
        )?;

        job.set_status(&format!("recognizing transistors in {name}"));
        checkpoint(job)?;
        mos::extract_mos(
            &name, &mut g, &self.tech, &self.cfg, &mut out, &mut issues, job, (45, 60),
        )?;

        job.set_status(&format!("extending geometry in {name}"));
        checkpoint(job)?;
        stitch::extend_stickouts(&name, children, &mut g, &self.tech, &mut out, job, (60, 65))?;

        job.set_status(&format!("making wires in {name}"));
        checkpoint(job)?;
        wires::extract_wires(
            &name, children, &mut g, &self.tech, &self.cfg, &mut out, &mut issues, job, (65, 85),
        )?;

        job.set_status(&format!("bridging geometry in {name}"));
        checkpoint(job)?;
        stitch::bridge_regions(&name, children, &mut g, &self.tech, &mut out, job, (85, 90))?;

        job.set_status(&format!("converting leftovers in {name}"));
        checkpoint(job)?;
        stitch::convert_leftovers(&name, &mut g, &mut out, job, (90, 95))?;

        job.set_status(&format!("placing exports in {name}"));
        checkpoint(job)?;
        stitch::place_exports(&name, &g, &self.tech, &mut out, &mut issues, job, (95, 100))?;
        job.set_progress(100);

        let stats = tally(&out);
        issues.log_all();
        info!(
            cell = %name,
            contacts = stats.contacts,
            transistors = stats.transistors,
            arcs = stats.arcs,
            pins = stats.pins,
            leftovers = stats.leftovers,
            issues = issues.len(),
            "extracted cell"
        );
        Ok(Extracted {
            cell: out,
            issues,
            stats,
        })
    }
}

fn checkpoint(job: &mut dyn Job) -> Result<()> {
    if job.is_cancelled() {
        return Err(ExtractionError::Cancelled);
    }
    Ok(())
}

fn tally(cell: &Cell) -> ExtractStats {
    let mut stats = ExtractStats::default();
    for (_, e) in cell.elements.iter() {
        match e {
            Element::Node(n) => match n.kind {
                NodeKind::Contact(_) => stats.contacts += 1,
                NodeKind::Mos(_) => stats.transistors += 1,
                NodeKind::Pin(_) => stats.pins += 1,
                NodeKind::PureLayer(_) => stats.leftovers += 1,
            },
            Element::Arc(_) => stats.arcs += 1,
            Element::Instance(_) => {}
        }
    }
    stats
}
