//! A single tree and its animation lifecycle.
//!
//! ```text
//! Entering ──(grown, opaque)──> Steady
//!     │                           │
//!     └────────(removed)──────────┴──> Removing ──(alpha <= 0.02)──> Gone
//! ```
//!
//! A tree never leaves `Removing` except by becoming `Gone`.

use grove_topology::{Point, SlotIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::time::Duration;

/// Size never decays below this while fading.
pub const MIN_SIZE: f64 = 2.0;

/// Opacity at or below which a fading tree is gone.
pub const GONE_ALPHA: f64 = 0.02;

/// Animation phase of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Entering,
    Steady,
    Removing,
    Gone,
}

/// Per-tree horizontal oscillation, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sway {
    pub amplitude: f64,
    /// Angular speed in rad/s
    pub speed: f64,
    pub phase: f64,
}

impl Sway {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            amplitude: rng.gen_range(0.4..1.2),
            speed: rng.gen_range(0.8..1.6),
            phase: rng.gen_range(0.0..TAU),
        }
    }

    /// Horizontal offset at `now` seconds.
    pub fn offset(&self, now: f64) -> f64 {
        self.amplitude * (now * self.speed + self.phase).sin()
    }
}

/// Cubic ease-out on `[0, 1]`.
pub fn ease_out(p: f64) -> f64 {
    1.0 - (1.0 - p).powi(3)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub id: String,
    pub slot: SlotIndex,
    /// Resting position relative to the forest center
    pub origin: Point,
    pub size: f64,
    pub current_size: f64,
    pub alpha: f64,
    /// Emergence progress in `[0, 1]`
    pub grow: f64,
    pub sway: Sway,
    phase: Phase,
    removing_since: Option<Duration>,
}

impl Tree {
    pub fn new(id: String, slot: SlotIndex, origin: Point, size: f64, sway: Sway) -> Self {
        Self {
            id,
            slot,
            origin,
            size,
            current_size: MIN_SIZE.max(size * 0.4),
            alpha: 0.0,
            grow: 0.0,
            sway,
            phase: Phase::Entering,
            removing_since: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_removing(&self) -> bool {
        matches!(self.phase, Phase::Removing | Phase::Gone)
    }

    /// Start fading out. Calling this on a fading tree keeps the first start time.
    pub fn begin_removal(&mut self, now: Duration) {
        if !self.is_removing() {
            self.phase = Phase::Removing;
            self.removing_since = Some(now);
        }
    }

    /// Advance one frame and return the resulting phase.
    pub fn advance(&mut self, now: Duration, dt: Duration, grow_duration: Duration, fade: Duration) -> Phase {
        let dt = dt.as_secs_f64();
        match self.phase {
            Phase::Entering | Phase::Steady => {
                self.current_size += (self.size - self.current_size) * (0.08 + dt * 0.35).min(0.25);
                self.alpha += (1.0 - self.alpha) * 0.12;
                self.grow = if grow_duration.is_zero() {
                    1.0
                } else {
                    (self.grow + dt / grow_duration.as_secs_f64()).min(1.0)
                };
                if self.grow >= 1.0 && self.alpha > 0.99 {
                    self.phase = Phase::Steady;
                }
            }
            Phase::Removing => {
                let since = self.removing_since.unwrap_or(now);
                let elapsed = now.saturating_sub(since).as_secs_f64();
                self.alpha = if fade.is_zero() {
                    0.0
                } else {
                    (1.0 - elapsed / fade.as_secs_f64()).max(0.0)
                };
                self.current_size = MIN_SIZE.max(self.current_size * 0.96);
                if self.alpha <= GONE_ALPHA {
                    self.phase = Phase::Gone;
                }
            }
            Phase::Gone => {}
        }
        self.phase
    }

    /// Final draw parameters at `now`.
    pub fn render(&self, now: Duration) -> RenderedTree {
        let eased = ease_out(self.grow);
        let emergence = (1.0 - eased) * self.size * 0.6;
        RenderedTree {
            id: self.id.clone(),
            slot: self.slot.value(),
            x: self.origin.x + self.sway.offset(now.as_secs_f64()),
            y: self.origin.y + emergence,
            size: self.current_size * (0.85 + 0.15 * eased),
            alpha: self.alpha,
            phase: self.phase,
        }
    }
}

/// A tree as it should be drawn this frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedTree {
    pub id: String,
    pub slot: u64,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub alpha: f64,
    pub phase: Phase,
}
