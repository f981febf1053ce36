//! Grove Arena
//!
//! Deterministic elimination rounds over a participant list.
//!
//! # Determinism
//!
//! A round is a pure function of `(participants, seed)`. The seed string is
//! hashed to 32 bits and expanded by a Mulberry32 stream; every duel draws
//! from that stream in a fixed order, so identical inputs always produce the
//! identical winner and log on every platform.
//!
//! # Duel
//!
//! 1. Draw two indices uniformly; if they collide, shift the second by one
//!    (mod the alive count).
//! 2. A coin flip (`draw < 0.5`) picks the first as winner, else the second.
//! 3. The loser leaves the alive list and one log line is recorded.
//!
//! Fewer than two participants is a valid degenerate round with no winner.

mod rng;
mod battle;

pub use rng::{Mulberry32, hash_seed};
pub use battle::{BattleOutcome, NOT_ENOUGH_PARTICIPANTS, short_id, simulate};
