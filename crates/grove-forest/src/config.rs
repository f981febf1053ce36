//! Engine tuning.

use grove_topology::{Placement, DEFAULT_CELL_SPACING};
use std::time::Duration;

/// Configuration for a [`Forest`](crate::Forest) and its driver.
#[derive(Debug, Clone)]
pub struct ForestConfig {
    /// Seed for sway parameters and poll jitter
    pub seed: u64,
    pub placement: Placement,
    /// Distance between neighboring slots, in pixels
    pub cell_spacing: f64,
    /// Target draw size of a tree, in pixels
    pub tree_size: f64,
    /// Time for a new tree to rise out of the ground
    pub grow_duration: Duration,
    /// Time for a removed tree to fade out
    pub fade: Duration,
    /// Holders per milestone in the HUD
    pub milestone_threshold: usize,
    pub poll_base: Duration,
    /// Upper bound (exclusive) of the random delay added to `poll_base`
    pub poll_jitter: Duration,
    pub frame_interval: Duration,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            placement: Placement::SquareSpiral,
            cell_spacing: DEFAULT_CELL_SPACING,
            tree_size: 12.0,
            grow_duration: Duration::from_millis(400),
            fade: Duration::from_millis(400),
            milestone_threshold: 50,
            poll_base: Duration::from_secs(15),
            poll_jitter: Duration::from_secs(5),
            frame_interval: Duration::from_micros(16_667),
        }
    }
}
