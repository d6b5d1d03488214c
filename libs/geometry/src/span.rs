//! A one-dimensional span.
//!
//! A span represents the closed interval `[start, stop]`.

use serde::{Deserialize, Serialize};

use crate::sign::Sign;
use crate::snap::snap_to_grid;

/// A closed interval of coordinates in one dimension.
#[derive(
    Debug, Default, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize, PartialEq, Eq,
)]
pub struct Span {
    start: i64,
    stop: i64,
}

impl Span {
    /// Creates a new [`Span`] between two integers, in either order.
    pub fn new(start: i64, stop: i64) -> Self {
        Self {
            start: start.min(stop),
            stop: start.max(stop),
        }
    }

    /// Creates a span of zero length encompassing the given point.
    pub const fn from_point(x: i64) -> Self {
        Self { start: x, stop: x }
    }

    /// Creates a span of the given length starting from `start`.
    pub const fn with_start_and_length(start: i64, length: i64) -> Self {
        Self {
            start,
            stop: start + length,
        }
    }

    /// Creates a span of length `length` centered (rounding down) at `center`.
    pub const fn from_center_and_length(center: i64, length: i64) -> Self {
        Self {
            start: center - length / 2,
            stop: center - length / 2 + length,
        }
    }

    /// The lower coordinate of this span.
    #[inline]
    pub const fn start(&self) -> i64 {
        self.start
    }

    /// The upper coordinate of this span.
    #[inline]
    pub const fn stop(&self) -> i64 {
        self.stop
    }

    /// Gets the starting ([`Sign::Neg`]) or stopping ([`Sign::Pos`]) endpoint.
    #[inline]
    pub const fn endpoint(&self, sign: Sign) -> i64 {
        match sign {
            Sign::Neg => self.start,
            Sign::Pos => self.stop,
        }
    }

    /// The length of this span.
    #[inline]
    pub const fn length(&self) -> i64 {
        self.stop - self.start
    }

    /// The center of this span, rounded down.
    #[inline]
    pub const fn center(&self) -> i64 {
        (self.start + self.stop) / 2
    }

    /// Creates a new [`Span`] expanded by `amount` in the direction
    /// indicated by `sign`.
    pub const fn expand(mut self, sign: Sign, amount: i64) -> Self {
        match sign {
            Sign::Pos => self.stop += amount,
            Sign::Neg => self.start -= amount,
        }
        self
    }

    /// Creates a new [`Span`] expanded by `amount` in both directions.
    pub const fn expand_all(mut self, amount: i64) -> Self {
        self.start -= amount;
        self.stop += amount;
        self
    }

    /// Whether this span contains the coordinate `x` (endpoints included).
    #[inline]
    pub const fn contains(&self, x: i64) -> bool {
        self.start <= x && x <= self.stop
    }

    /// Whether this span contains all of `other`.
    #[inline]
    pub const fn contains_span(&self, other: Span) -> bool {
        self.start <= other.start && other.stop <= self.stop
    }

    /// Whether this span intersects `other` (shared endpoints count).
    #[inline]
    pub const fn intersects(&self, other: Span) -> bool {
        self.start <= other.stop && other.start <= self.stop
    }

    /// The intersection of this span with `other`, if non-empty.
    pub fn intersection(&self, other: Span) -> Option<Span> {
        if !self.intersects(other) {
            return None;
        }
        Some(Span {
            start: self.start.max(other.start),
            stop: self.stop.min(other.stop),
        })
    }

    /// The smallest span containing both this span and `other`.
    pub fn union(&self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            stop: self.stop.max(other.stop),
        }
    }

    /// The shortest distance between this span and a point.
    pub const fn dist_to(&self, x: i64) -> i64 {
        if x < self.start {
            self.start - x
        } else if x > self.stop {
            x - self.stop
        } else {
            0
        }
    }

    /// Snaps both endpoints to the nearest multiple of `grid`.
    ///
    /// The result may be shorter or longer than the input; a span shorter
    /// than `grid` may collapse to a point.
    pub const fn snap_to_grid(&self, grid: i64) -> Span {
        let a = snap_to_grid(self.start, grid);
        let b = snap_to_grid(self.stop, grid);
        if a <= b {
            Span { start: a, stop: b }
        } else {
            Span { start: b, stop: a }
        }
    }
}
