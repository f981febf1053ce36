//! Identity feeds polled by the driver.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::forest::MembershipUpdate;

/// Where the authoritative set of a poll came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSource {
    /// Cached holder set
    WalletsCurrent,
    /// Uncached upstream read
    DebugHolders,
    /// In-process holder cache
    Local,
}

impl FeedSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedSource::WalletsCurrent => "wallets_current",
            FeedSource::DebugHolders => "debug_holders",
            FeedSource::Local => "local",
        }
    }
}

/// A source of identities for the forest.
///
/// Implementations never fail: an unreachable source yields empty lists.
#[async_trait]
pub trait IdentityFeed: Send + Sync {
    async fn poll(&self) -> MembershipUpdate;
}

#[derive(Deserialize)]
struct IdsBody {
    #[serde(default)]
    ids: Vec<String>,
}

#[derive(Deserialize)]
struct LatestRoundBody {
    round: Option<RoundParticipants>,
}

#[derive(Deserialize)]
struct RoundParticipants {
    #[serde(default)]
    participants: Vec<String>,
}

/// Polls a remote grove node over HTTP.
pub struct HttpFeed {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFeed {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Option<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::debug!(%url, status = %r.status(), "Feed endpoint returned error status");
                return None;
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "Feed endpoint unreachable");
                return None;
            }
        };
        match response.json().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::debug!(%url, error = %e, "Feed endpoint returned unexpected body");
                None
            }
        }
    }

    async fn ids(&self, path: &str) -> Vec<String> {
        self.get::<IdsBody>(path).await.map(|b| b.ids).unwrap_or_default()
    }
}

#[async_trait]
impl IdentityFeed for HttpFeed {
    async fn poll(&self) -> MembershipUpdate {
        let mut source = Some(FeedSource::WalletsCurrent);
        let mut authoritative = self.ids("/api/wallets/current").await;
        if authoritative.is_empty() {
            authoritative = self.ids("/api/debug/holders").await;
            source = Some(FeedSource::DebugHolders);
        }
        if authoritative.is_empty() {
            source = None;
        }

        let enrichment = self
            .get::<LatestRoundBody>("/api/rounds/latest")
            .await
            .and_then(|b| b.round)
            .map(|r| r.participants)
            .unwrap_or_default();

        MembershipUpdate {
            authoritative,
            enrichment,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_labels() {
        assert_eq!(FeedSource::WalletsCurrent.as_str(), "wallets_current");
        assert_eq!(
            serde_json::to_string(&FeedSource::DebugHolders).unwrap(),
            "\"debug_holders\""
        );
    }

    #[test]
    fn bodies_tolerate_missing_fields() {
        let ids: IdsBody = serde_json::from_str(r#"{"ok":false,"error":"x"}"#).unwrap();
        assert!(ids.ids.is_empty());
        let latest: LatestRoundBody = serde_json::from_str(r#"{"ok":true,"round":null}"#).unwrap();
        assert!(latest.round.is_none());
    }

    #[tokio::test]
    async fn unreachable_node_yields_empty_update() {
        // Port 9 (discard) on loopback is not expected to serve HTTP.
        let feed = HttpFeed::new("http://127.0.0.1:9/", Duration::from_millis(200)).unwrap();
        let update = feed.poll().await;
        assert_eq!(update, MembershipUpdate::default());
    }
}
