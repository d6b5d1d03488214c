//! Error types and error handling utilities.
//!
//! Only host-level failures are errors: cancellation and output-cell
//! creation. Everything geometric that "doesn't fit" or "isn't found" is a
//! diagnostic issue, not an error.

use arcstr::ArcStr;

/// A result type returning extraction errors.
pub type Result<T, E = ExtractionError> = std::result::Result<T, E>;

/// The error type for extraction.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The host requested cancellation; extraction of the current cell was
    /// aborted. Output for the current cell must not be used.
    #[error("extraction cancelled by host")]
    Cancelled,
    /// The output cell could not be created.
    #[error("failed to create output cell `{0}`")]
    CellCreation(ArcStr),
    /// A referenced cell does not exist in the library.
    #[error("unknown cell key")]
    UnknownCell,
    /// An internal invariant was violated; indicates a bug.
    #[error("internal error: {0}")]
    Internal(String),
}
