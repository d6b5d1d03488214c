//! 2-D geometric primitives on a fixed-point integer grid.
//!
//! All coordinates are `i64` database units. Callers that start from real
//! units are expected to scale into the grid once, up front, and round there;
//! nothing in this crate touches floating point except where explicitly noted
//! (angled-edge projections in consumers).
#![warn(missing_docs)]

pub mod bbox;
pub mod dir;
pub mod point;
pub mod polygon;
pub mod prelude;
pub mod rect;
pub mod side;
pub mod sign;
pub mod snap;
pub mod span;
