//! Integer grid cells for the square spiral.

use std::ops::{Add, Mul};

/// A cell on the integer grid.
///
/// Screen convention: x grows to the right, y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridCoord {
    pub x: i64,
    pub y: i64,
}

impl GridCoord {
    /// Center of the grid.
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    /// Arm directions in walk order: right, up, left, down.
    pub const ARM_DIRECTIONS: [Self; 4] = [
        Self { x: 1, y: 0 },
        Self { x: 0, y: -1 },
        Self { x: -1, y: 0 },
        Self { x: 0, y: 1 },
    ];

    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance from the origin, i.e. which square ring the cell sits on.
    pub fn ring(&self) -> u64 {
        self.x.unsigned_abs().max(self.y.unsigned_abs())
    }
}

impl Add for GridCoord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Mul<i64> for GridCoord {
    type Output = Self;

    fn mul(self, k: i64) -> Self {
        Self::new(self.x * k, self.y * k)
    }
}
