//! The elimination loop.

use serde::{Deserialize, Serialize};

use crate::rng::Mulberry32;

/// Log entry recorded when a round cannot be fought.
pub const NOT_ENOUGH_PARTICIPANTS: &str = "Not enough participants";

/// Result of one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleOutcome {
    /// Last participant standing, or `None` for a degenerate round.
    pub winner: Option<String>,
    /// One line per elimination, in order.
    pub log: Vec<String>,
}

/// Run a deterministic elimination round.
///
/// `participants` is read in the given order and never mutated.
pub fn simulate(participants: &[String], seed: &str) -> BattleOutcome {
    if participants.len() < 2 {
        return BattleOutcome {
            winner: None,
            log: vec![NOT_ENOUGH_PARTICIPANTS.to_string()],
        };
    }

    let mut rng = Mulberry32::from_seed_str(seed);
    let mut alive: Vec<&str> = participants.iter().map(String::as_str).collect();
    let mut log = Vec::with_capacity(alive.len() - 1);

    while alive.len() > 1 {
        let len = alive.len();
        let i = rng.index(len);
        let mut j = rng.index(len);
        if j == i {
            j = (j + 1) % len;
        }

        let (a, b) = (alive[i], alive[j]);
        let (winner, loser) = if rng.next_f64() < 0.5 { (a, b) } else { (b, a) };

        // First occurrence, so duplicated identities resolve the same way everywhere
        if let Some(idx) = alive.iter().position(|p| *p == loser) {
            alive.remove(idx);
        }
        log.push(format!("⚔️ {} defeated {}", short_id(winner), short_id(loser)));
    }

    BattleOutcome {
        winner: alive.first().map(|w| w.to_string()),
        log,
    }
}

/// Abbreviate an identity as its first 6 and last 4 characters.
///
/// Short identities overlap with themselves (`"abc"` becomes `"abc…abc"`).
pub fn short_id(id: &str) -> String {
    if id.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = id.chars().collect();
    let head: String = chars.iter().take(6).collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("{}…{}", head, tail)
}
