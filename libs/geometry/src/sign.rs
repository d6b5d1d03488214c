//! Positive or negative along an axis.

use serde::{Deserialize, Serialize};

/// Enumeration over positive or negative.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum Sign {
    /// Positive.
    Pos,
    /// Negative.
    Neg,
}

impl Sign {
    /// Returns the opposite sign.
    pub const fn other(&self) -> Self {
        match *self {
            Self::Pos => Self::Neg,
            Self::Neg => Self::Pos,
        }
    }

    /// Converts this sign to `+1` or `-1`.
    pub const fn as_int(&self) -> i64 {
        match *self {
            Self::Pos => 1,
            Self::Neg => -1,
        }
    }
}

impl std::ops::Not for Sign {
    type Output = Self;
    fn not(self) -> Self::Output {
        self.other()
    }
}
