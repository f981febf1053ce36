//! Layout selection: slot index to screen offset.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::{fermat_spiral, square_spiral, SlotIndex};

/// A point on the plane, relative to the forest center.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// How slots are laid out on the plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Placement {
    /// Rectangular-expanding square spiral on a grid of `spacing` cells.
    #[default]
    SquareSpiral,
    /// Golden-angle Fermat spiral.
    Phyllotaxis,
}

impl Placement {
    /// Offset of `slot` from the forest center.
    pub fn position(&self, slot: SlotIndex, spacing: f64) -> Point {
        match self {
            Placement::SquareSpiral => {
                let cell = square_spiral(slot);
                Point::new(cell.x as f64 * spacing, cell.y as f64 * spacing)
            }
            Placement::Phyllotaxis => fermat_spiral(slot, spacing),
        }
    }
}

/// Unknown placement name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown placement {0:?} (expected \"square\" or \"phyllotaxis\")")]
pub struct PlacementError(pub String);

impl FromStr for Placement {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "square" | "square_spiral" | "grid" => Ok(Placement::SquareSpiral),
            "phyllotaxis" | "fermat" | "golden" => Ok(Placement::Phyllotaxis),
            other => Err(PlacementError(other.to_string())),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::SquareSpiral => f.write_str("square"),
            Placement::Phyllotaxis => f.write_str("phyllotaxis"),
        }
    }
}
