//! In-process identity feed for the forest engine.

use std::sync::Arc;

use async_trait::async_trait;
use grove_forest::{FeedSource, IdentityFeed, MembershipUpdate};
use grove_holders::HolderCache;
use grove_rounds::RoundStore;

/// Reads the holder cache and the latest round directly, skipping HTTP.
pub struct LocalFeed {
    holders: HolderCache,
    rounds: Arc<dyn RoundStore>,
}

impl LocalFeed {
    pub fn new(holders: HolderCache, rounds: Arc<dyn RoundStore>) -> Self {
        Self { holders, rounds }
    }
}

#[async_trait]
impl IdentityFeed for LocalFeed {
    async fn poll(&self) -> MembershipUpdate {
        let authoritative = match self.holders.current_holders().await {
            Ok(snapshot) => snapshot.ids,
            Err(e) => {
                tracing::debug!(error = %e, "Local feed has no holders");
                Vec::new()
            }
        };
        let enrichment = match self.rounds.latest() {
            Ok(round) => round.map(|r| r.participants).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read latest round for forest");
                Vec::new()
            }
        };
        let source = (!authoritative.is_empty()).then_some(FeedSource::Local);

        MembershipUpdate {
            authoritative,
            enrichment,
            source,
        }
    }
}
