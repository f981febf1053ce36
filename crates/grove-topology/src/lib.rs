//! Grove Placement Topology
//!
//! Deterministic placement of forest slots on a 2D plane.
//!
//! # Slots
//!
//! Every tree claims the next slot in creation order. A slot index is turned
//! into a position by a pure function, so the same insertion order always
//! lays out the same forest regardless of which identities occupy it.
//!
//! Two layouts are available:
//!
//! - **Square spiral**: integer grid cells walked outward from the origin in
//!   arms of length 1, 1, 2, 2, 3, 3, ... (right, up, left, down).
//! - **Phyllotaxis**: golden-angle Fermat spiral with radius proportional
//!   to the square root of the index.
//!
//! Screen space is y-down, so "up" decreases y.

mod grid;
mod spiral;
mod phyllotaxis;
mod placement;

pub use grid::GridCoord;
pub use spiral::{SlotIndex, Spiral, arm_length, square_spiral};
pub use phyllotaxis::{GOLDEN_ANGLE, fermat_spiral};
pub use placement::{Placement, PlacementError, Point};

/// Default spacing between neighboring grid cells, in pixels.
pub const DEFAULT_CELL_SPACING: f64 = 14.0;
