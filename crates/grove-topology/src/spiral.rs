//! Square spiral enumeration of grid cells.
//!
//! The walk starts at the origin and expands rectangularly:
//!
//! ```text
//! arm:     0  1  2  3  4  5  6  7 ...
//! dir:     R  U  L  D  R  U  L  D
//! length:  1  1  2  2  3  3  4  4
//! ```
//!
//! Slot n is the cell reached after n unit steps. Every cell of the plane
//! is visited exactly once, so distinct slots never overlap.

use crate::GridCoord;

/// A slot in creation order. Slot 0 is the center of the forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotIndex(pub u64);

impl SlotIndex {
    /// Center slot.
    pub const ORIGIN: Self = Self(0);

    #[inline]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Next slot in creation order.
    #[inline]
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u64> for SlotIndex {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<SlotIndex> for u64 {
    fn from(value: SlotIndex) -> Self {
        value.0
    }
}

/// Length of arm `arm` (0-based): 1, 1, 2, 2, 3, 3, ...
#[inline]
pub const fn arm_length(arm: u64) -> u64 {
    arm / 2 + 1
}

/// Grid cell of a slot on the square spiral.
///
/// Walks whole arms instead of single steps, so the cost is O(sqrt(n)).
pub fn square_spiral(slot: SlotIndex) -> GridCoord {
    let mut remaining = slot.0;
    let mut pos = GridCoord::ORIGIN;
    let mut arm = 0u64;

    while remaining > 0 {
        let len = arm_length(arm);
        let dir = GridCoord::ARM_DIRECTIONS[(arm % 4) as usize];
        let steps = len.min(remaining);
        pos = pos + dir * steps as i64;
        remaining -= steps;
        arm += 1;
    }

    pos
}

/// Iterator over consecutive spiral cells, one unit step at a time.
pub struct Spiral {
    pos: GridCoord,
    arm: u64,
    step_in_arm: u64,
    emitted: u64,
    limit: Option<u64>,
}

impl Spiral {
    /// Infinite iterator starting at the origin.
    pub fn new() -> Self {
        Self {
            pos: GridCoord::ORIGIN,
            arm: 0,
            step_in_arm: 0,
            emitted: 0,
            limit: None,
        }
    }

    /// Iterator over the first `count` cells.
    pub fn take_slots(count: u64) -> Self {
        Self {
            limit: Some(count),
            ..Self::new()
        }
    }
}

impl Default for Spiral {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Spiral {
    type Item = GridCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(limit) = self.limit {
            if self.emitted >= limit {
                return None;
            }
        }

        let current = self.pos;
        self.emitted += 1;

        // Advance for the following call
        let dir = GridCoord::ARM_DIRECTIONS[(self.arm % 4) as usize];
        self.pos = self.pos + dir;
        self.step_in_arm += 1;
        if self.step_in_arm == arm_length(self.arm) {
            self.arm += 1;
            self.step_in_arm = 0;
        }

        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.limit {
            Some(limit) => {
                let remaining = limit.saturating_sub(self.emitted) as usize;
                (remaining, Some(remaining))
            }
            None => (usize::MAX, None),
        }
    }
}
