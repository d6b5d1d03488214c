//! The sides of an axis-aligned rectangle.

use crate::dir::Dir;
use crate::sign::Sign;
use array_map::{ArrayMap, Indexable};
use serde::{Deserialize, Serialize};

/// An enumeration of the sides of an axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[repr(u8)]
#[derive(Indexable)]
pub enum Side {
    /// The left side.
    Left,
    /// The bottom side.
    Bot,
    /// The right side.
    Right,
    /// The top side.
    Top,
}

impl Side {
    /// The direction of the coordinate corresponding to this side.
    ///
    /// Top and bottom edges are y-coordinates, so they are on the vertical
    /// axis; left and right edges are on the horizontal axis.
    pub const fn coord_dir(&self) -> Dir {
        match self {
            Side::Top | Side::Bot => Dir::Vert,
            Side::Left | Side::Right => Dir::Horiz,
        }
    }

    /// The direction of the edge corresponding to this side.
    ///
    /// Top and bottom edges are horizontal segments; left and right edges
    /// are vertical segments.
    pub const fn edge_dir(&self) -> Dir {
        match self {
            Side::Top | Side::Bot => Dir::Horiz,
            Side::Left | Side::Right => Dir::Vert,
        }
    }

    /// Returns the opposite side.
    pub const fn other(&self) -> Self {
        match self {
            Side::Top => Side::Bot,
            Side::Right => Side::Left,
            Side::Bot => Side::Top,
            Side::Left => Side::Right,
        }
    }

    /// The sign along this side's coordinate direction.
    ///
    /// Top and right are [`Sign::Pos`]; bottom and left are [`Sign::Neg`].
    pub const fn sign(&self) -> Sign {
        match self {
            Side::Top | Side::Right => Sign::Pos,
            Side::Bot | Side::Left => Sign::Neg,
        }
    }

    /// The side corresponding to the given direction and sign.
    pub const fn with_dir_and_sign(dir: Dir, sign: Sign) -> Self {
        match (dir, sign) {
            (Dir::Horiz, Sign::Pos) => Side::Right,
            (Dir::Horiz, Sign::Neg) => Side::Left,
            (Dir::Vert, Sign::Pos) => Side::Top,
            (Dir::Vert, Sign::Neg) => Side::Bot,
        }
    }

    /// All four sides, in [`Indexable`] order.
    pub const ALL: [Side; 4] = [Side::Left, Side::Bot, Side::Right, Side::Top];
}

/// An association of a value with type `T` to each of the four [`Side`]s.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Sides<T> {
    inner: ArrayMap<Side, T, 4>,
}

impl<T> Sides<T>
where
    T: Clone,
{
    /// Creates a new [`Sides`] with `value` associated with all sides.
    pub fn uniform(value: T) -> Self {
        Self {
            inner: ArrayMap::from_value(value),
        }
    }
}

impl<T> Sides<T> {
    /// Creates a new [`Sides`] with the provided values for each side.
    pub fn new(left: T, bot: T, right: T, top: T) -> Self {
        // Note that the ordering of array elements here must match
        // the ordering of the `Side` enum variants.
        Self {
            inner: ArrayMap::new([left, bot, right, top]),
        }
    }

    /// Maps a function over the provided [`Sides`], returning a new [`Sides`].
    pub fn map<B>(self, f: impl FnMut(&Side, T) -> B) -> Sides<B> {
        Sides {
            inner: self.inner.map(f),
        }
    }
}

impl<T> Default for Sides<T>
where
    T: Default + Clone,
{
    fn default() -> Self {
        Self::uniform(T::default())
    }
}

impl<T> std::ops::Index<Side> for Sides<T> {
    type Output = T;
    fn index(&self, index: Side) -> &Self::Output {
        &self.inner[index]
    }
}

impl<T> std::ops::IndexMut<Side> for Sides<T> {
    fn index_mut(&mut self, index: Side) -> &mut Self::Output {
        &mut self.inner[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_orientation() {
        assert_eq!(Side::Top.coord_dir(), Dir::Vert);
        assert_eq!(Side::Left.edge_dir(), Dir::Vert);
        assert_eq!(Side::Bot.other(), Side::Top);
        assert_eq!(Side::with_dir_and_sign(Dir::Horiz, Sign::Neg), Side::Left);
    }

    #[test]
    fn sides_indexing() {
        let mut s = Sides::new(1, 2, 3, 4);
        assert_eq!(s[Side::Left], 1);
        assert_eq!(s[Side::Top], 4);
        s[Side::Top] = 7;
        assert_eq!(s[Side::Top], 7);
        let doubled = s.map(|_, v| v * 2);
        assert_eq!(doubled[Side::Bot], 4);
    }
}
