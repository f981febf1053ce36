//! Golden-angle Fermat spiral.
//!
//! Slot n sits at angle n * golden angle and radius spacing * sqrt(n).
//! Each slot covers roughly the same area (pi * spacing^2), so the layout
//! stays evenly packed as it grows.

use crate::{Point, SlotIndex};

/// The golden angle in radians: pi * (3 - sqrt(5)).
pub const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Position of a slot on the Fermat spiral.
pub fn fermat_spiral(slot: SlotIndex, spacing: f64) -> Point {
    if slot.0 == 0 {
        return Point::ORIGIN;
    }
    let n = slot.0 as f64;
    let radius = spacing * n.sqrt();
    let theta = n * GOLDEN_ANGLE;
    Point::new(radius * theta.cos(), radius * theta.sin())
}
