//! A prelude re-exporting the most commonly used items.

pub use crate::bbox::Bbox;
pub use crate::dir::Dir;
pub use crate::point::Point;
pub use crate::polygon::Polygon;
pub use crate::rect::Rect;
pub use crate::side::{Side, Sides};
pub use crate::sign::Sign;
pub use crate::snap::{snap_to_grid, snap_to_grid_down, snap_to_grid_up};
pub use crate::span::Span;
