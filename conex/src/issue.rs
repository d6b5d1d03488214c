//! Structured extraction diagnostics.
//!
//! Unmatched geometry and structural inconsistencies accumulate here rather
//! than aborting the run; a cell with issues still produces a best-effort
//! output cell.

use std::fmt::Display;

use arcstr::ArcStr;
use diagnostics::{Diagnostic, Severity};
use geometry::point::Point;
use serde::{Deserialize, Serialize};

/// One diagnostic produced during extraction, keyed by cell and location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionIssue {
    /// The cell being extracted when the issue arose.
    pub cell: ArcStr,
    /// The grid location the issue refers to.
    pub loc: Point,
    /// The layer names involved, if any.
    pub layers: Vec<ArcStr>,
    /// A human-readable description.
    pub message: String,
    /// The issue severity. Extraction issues are recoverable; none are fatal
    /// to the cell.
    pub severity: Severity,
}

impl ExtractionIssue {
    /// Creates a warning-severity issue.
    pub fn warn(cell: ArcStr, loc: Point, message: impl Into<String>) -> Self {
        Self {
            cell,
            loc,
            layers: Vec::new(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    /// Attaches the names of the layers involved.
    pub fn with_layers(mut self, layers: impl IntoIterator<Item = ArcStr>) -> Self {
        self.layers = layers.into_iter().collect();
        self
    }
}

impl Display for ExtractionIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cell {}: ({}, {}): {}",
            self.cell, self.loc.x, self.loc.y, self.message
        )?;
        if !self.layers.is_empty() {
            write!(f, " [layers: ")?;
            for (i, l) in self.layers.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{l}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl Diagnostic for ExtractionIssue {
    fn severity(&self) -> Severity {
        self.severity
    }
}
