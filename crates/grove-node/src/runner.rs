//! Battle round trigger and periodic scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use grove_holders::{FetchError, HolderCache, SeedSource};
use grove_rounds::{NewRound, RoundRecord, RoundStore, WinnerLine, WinnerSink};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Result of a trigger attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Another round is running
    Busy,
    Completed {
        round: RoundRecord,
        winner_logged: bool,
    },
}

#[derive(Debug, Error)]
pub enum RoundError {
    #[error("seed unavailable: {0}")]
    Seed(#[source] FetchError),

    /// The round was simulated but could not be stored
    #[error("failed to store round: {source}")]
    Store {
        #[source]
        source: grove_rounds::Error,
        winner: Option<String>,
    },

    /// The round task panicked or was cancelled by runtime shutdown
    #[error("round task aborted: {0}")]
    Aborted(String),
}

impl RoundError {
    /// Winner computed before the failure, if any.
    pub fn winner(&self) -> Option<&str> {
        match self {
            RoundError::Store { winner, .. } => winner.as_deref(),
            RoundError::Seed(_) | RoundError::Aborted(_) => None,
        }
    }
}

/// Runs one round at a time: participants from the holder cache, seed from
/// the chain, outcome into the round store and the winner log.
pub struct RoundRunner {
    holders: HolderCache,
    seeds: Arc<dyn SeedSource>,
    store: Arc<dyn RoundStore>,
    winners: Arc<dyn WinnerSink>,
    busy: AtomicBool,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RoundRunner {
    pub fn new(
        holders: HolderCache,
        seeds: Arc<dyn SeedSource>,
        store: Arc<dyn RoundStore>,
        winners: Arc<dyn WinnerSink>,
    ) -> Self {
        Self {
            holders,
            seeds,
            store,
            winners,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run one round on its own task and wait for it.
    ///
    /// Dropping the returned future does not stop the round: it is still
    /// stored and its winner logged.
    pub async fn trigger_detached(self: Arc<Self>) -> Result<TriggerOutcome, RoundError> {
        tokio::spawn(async move { self.trigger().await })
            .await
            .map_err(|e| RoundError::Aborted(e.to_string()))?
    }

    /// Run one round unless one is already in progress.
    ///
    /// The round stops wherever it was if this future is dropped; callers
    /// that may go away should use [`RoundRunner::trigger_detached`].
    pub async fn trigger(&self) -> Result<TriggerOutcome, RoundError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!("Round trigger rejected, a round is already running");
            return Ok(TriggerOutcome::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        let participants = match self.holders.current_holders().await {
            Ok(snapshot) => snapshot.ids,
            Err(e) => {
                tracing::warn!(error = %e, "No holders for round, running with none");
                Vec::new()
            }
        };
        let seed = self.seeds.seed().await.map_err(RoundError::Seed)?;

        let outcome = grove_arena::simulate(&participants, &seed);
        let winner = outcome.winner.clone();
        let round = self
            .store
            .append(NewRound::from_outcome(seed, participants, outcome))
            .map_err(|source| RoundError::Store {
                source,
                winner: winner.clone(),
            })?;

        tracing::info!(
            round = round.id,
            participants = round.participants.len(),
            winner = round.winner.as_deref().unwrap_or("none"),
            "Round complete"
        );

        let winner_logged = match &round.winner {
            Some(winner) => {
                let line = WinnerLine::new(Some(round.id.to_string()), winner.clone(), Some(round.seed.clone()));
                match self.winners.record(&line).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(round = round.id, error = %e, "Failed to log winner");
                        false
                    }
                }
            }
            None => false,
        };

        Ok(TriggerOutcome::Completed { round, winner_logged })
    }

    /// Trigger a round now and then every `period` until `stop` flips to true.
    pub fn spawn_schedule(self: Arc<Self>, period: Duration, mut stop: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop.changed() => break,
                }
                if let Err(e) = self.trigger().await {
                    tracing::error!(error = %e, "Scheduled round failed");
                }
            }
            tracing::debug!("Round scheduler stopped");
        })
    }
}
