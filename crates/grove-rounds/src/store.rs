//! Append-only round storage.
//!
//! Rounds are keyed `round:{id:020}` so lexical key order matches id order.
//! The last assigned id lives under `meta:last_round_id`.

use crate::error::Result;
use crate::record::{NewRound, RoundRecord};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

const ROUND_PREFIX: &str = "round:";
const LAST_ID_KEY: &[u8] = b"meta:last_round_id";

/// Read/write boundary for round records.
///
/// Records are never updated or deleted after `append`.
pub trait RoundStore: Send + Sync {
    /// Assign the next id and persist the round.
    fn append(&self, round: NewRound) -> Result<RoundRecord>;

    /// The most recently appended round, if any.
    fn latest(&self) -> Result<Option<RoundRecord>>;

    /// Up to `limit` rounds, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<RoundRecord>>;
}

fn round_key(id: u64) -> String {
    format!("{}{:020}", ROUND_PREFIX, id)
}

/// RocksDB-backed round store.
pub struct RocksRoundStore {
    db: DB,
    // Serializes id allocation across concurrent appends.
    append_lock: Mutex<()>,
}

impl RocksRoundStore {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self {
            db,
            append_lock: Mutex::new(()),
        })
    }

    fn last_id(&self) -> Result<Option<u64>> {
        match self.db.get(LAST_ID_KEY)? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }
}

impl RoundStore for RocksRoundStore {
    fn append(&self, round: NewRound) -> Result<RoundRecord> {
        let _guard = self.append_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let id = self.last_id()?.map_or(1, |last| last + 1);
        let record = round.into_record(id);

        let mut batch = WriteBatch::default();
        batch.put(round_key(id).as_bytes(), serde_json::to_vec(&record)?);
        batch.put(LAST_ID_KEY, serde_json::to_vec(&id)?);
        self.db.write(batch)?;

        tracing::debug!(round = id, "Stored round");
        Ok(record)
    }

    fn latest(&self) -> Result<Option<RoundRecord>> {
        let Some(id) = self.last_id()? else {
            return Ok(None);
        };
        match self.db.get(round_key(id).as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn recent(&self, limit: usize) -> Result<Vec<RoundRecord>> {
        let prefix = ROUND_PREFIX.as_bytes();
        // ';' sorts right after ':', so this starts past the highest round key.
        let iter = self.db.iterator(IteratorMode::From(b"round;", Direction::Reverse));

        let mut rounds = Vec::new();
        for item in iter {
            if rounds.len() >= limit {
                break;
            }
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            rounds.push(serde_json::from_slice(&value)?);
        }
        Ok(rounds)
    }
}

/// In-memory round store for tests and ephemeral nodes.
#[derive(Default)]
pub struct MemoryRoundStore {
    rounds: Mutex<Vec<RoundRecord>>,
}

impl MemoryRoundStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoundStore for MemoryRoundStore {
    fn append(&self, round: NewRound) -> Result<RoundRecord> {
        let mut rounds = self.rounds.lock().unwrap_or_else(PoisonError::into_inner);
        let id = rounds.last().map_or(1, |r| r.id + 1);
        let record = round.into_record(id);
        rounds.push(record.clone());
        Ok(record)
    }

    fn latest(&self) -> Result<Option<RoundRecord>> {
        let rounds = self.rounds.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(rounds.last().cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<RoundRecord>> {
        let rounds = self.rounds.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(rounds.iter().rev().take(limit).cloned().collect())
    }
}
