//! Round records.

use chrono::{DateTime, Utc};
use grove_arena::BattleOutcome;
use serde::{Deserialize, Serialize};

/// A persisted round. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    /// Monotonic round number assigned by the store
    pub id: u64,
    pub started_at: DateTime<Utc>,
    pub seed: String,
    /// Participants in simulation input order
    pub participants: Vec<String>,
    pub winner: Option<String>,
    pub log: Vec<String>,
}

/// A round that has been simulated but not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRound {
    pub started_at: DateTime<Utc>,
    pub seed: String,
    pub participants: Vec<String>,
    pub winner: Option<String>,
    pub log: Vec<String>,
}

impl NewRound {
    pub fn from_outcome(seed: impl Into<String>, participants: Vec<String>, outcome: BattleOutcome) -> Self {
        Self {
            started_at: Utc::now(),
            seed: seed.into(),
            participants,
            winner: outcome.winner,
            log: outcome.log,
        }
    }

    pub(crate) fn into_record(self, id: u64) -> RoundRecord {
        RoundRecord {
            id,
            started_at: self.started_at,
            seed: self.seed,
            participants: self.participants,
            winner: self.winner,
            log: self.log,
        }
    }
}
