//! TTL holder cache with single-flight refresh.
//!
//! # Policy
//!
//! - A fresh entry (age < TTL) is served without touching upstream.
//! - Otherwise one refresh runs at a time; concurrent callers await the same
//!   shared future and observe the same outcome.
//! - A non-empty refresh replaces the entry atomically.
//! - An empty or failed refresh never erases a good entry: the previous
//!   holders are served flagged `stale`. With no previous entry the caller
//!   gets a retryable [`HolderError`].

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{FetchError, HolderError, Result};
use crate::normalize::{normalize, Identity};
use crate::source::HolderSource;

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Asset key passed to the source
    pub asset: String,
    /// How long a successful snapshot is served without refreshing
    pub ttl: Duration,
    /// Hard deadline for one upstream refresh
    pub fetch_timeout: Duration,
}

impl CacheConfig {
    pub fn for_asset(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            ..Self::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            asset: String::new(),
            ttl: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(8),
        }
    }
}

/// Holders served to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolderSnapshot {
    pub ids: Vec<Identity>,
    /// True when served from a previous snapshot after a failed refresh
    pub stale: bool,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    ids: Arc<Vec<Identity>>,
    fetched_at: Instant,
    stale: bool,
}

impl CacheEntry {
    fn snapshot(&self) -> HolderSnapshot {
        HolderSnapshot {
            ids: self.ids.as_ref().clone(),
            stale: self.stale,
        }
    }
}

type Refresh = Shared<BoxFuture<'static, Result<HolderSnapshot>>>;

struct Inner {
    source: Arc<dyn HolderSource>,
    config: CacheConfig,
    entry: RwLock<Option<CacheEntry>>,
    in_flight: Mutex<Option<Refresh>>,
}

/// Shared holder cache. Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct HolderCache {
    inner: Arc<Inner>,
}

impl HolderCache {
    pub fn new(source: Arc<dyn HolderSource>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                config,
                entry: RwLock::new(None),
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Current holders: cached if fresh, otherwise via a (shared) refresh.
    pub async fn current_holders(&self) -> Result<HolderSnapshot> {
        if let Some(snapshot) = self.fresh() {
            debug!(count = snapshot.ids.len(), "serving holders from cache");
            return Ok(snapshot);
        }
        self.refresh().await
    }

    /// Refresh from upstream, joining the in-flight refresh if there is one.
    pub async fn refresh(&self) -> Result<HolderSnapshot> {
        let refresh = {
            let mut slot = self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(existing) => {
                    debug!("joining in-flight holder refresh");
                    existing.clone()
                }
                None => {
                    let refresh = self.clone().run_refresh().boxed().shared();
                    *slot = Some(refresh.clone());
                    refresh
                }
            }
        };
        refresh.await
    }

    /// Fetch and normalize straight from upstream, bypassing the cache.
    pub async fn inspect(&self) -> std::result::Result<Vec<Identity>, FetchError> {
        self.fetch_once().await
    }

    /// Whether a refresh is currently executing.
    pub fn is_refreshing(&self) -> bool {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn fresh(&self) -> Option<HolderSnapshot> {
        let entry = self.inner.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry
            .as_ref()
            .filter(|e| e.fetched_at.elapsed() < self.inner.config.ttl)
            .map(CacheEntry::snapshot)
    }

    async fn fetch_once(&self) -> std::result::Result<Vec<Identity>, FetchError> {
        let deadline = self.inner.config.fetch_timeout;
        let fetch = self.inner.source.fetch(&self.inner.config.asset);
        match tokio::time::timeout(deadline, fetch).await {
            Ok(Ok(value)) => Ok(normalize(&value)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(FetchError::Timeout(deadline)),
        }
    }

    async fn run_refresh(self) -> Result<HolderSnapshot> {
        let fetched = self.fetch_once().await;
        let outcome = self.settle(fetched);
        // Settled either way: the next caller starts a new refresh
        *self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner) = None;
        outcome
    }

    /// Apply a refresh result to the cache and decide what callers see.
    fn settle(&self, fetched: std::result::Result<Vec<Identity>, FetchError>) -> Result<HolderSnapshot> {
        let source = self.inner.source.name();
        let mut entry = self.inner.entry.write().unwrap_or_else(PoisonError::into_inner);

        let failure = match fetched {
            Ok(ids) if !ids.is_empty() => {
                info!(source, count = ids.len(), "holder refresh succeeded");
                let fresh = CacheEntry {
                    ids: Arc::new(ids),
                    fetched_at: Instant::now(),
                    stale: false,
                };
                let snapshot = fresh.snapshot();
                *entry = Some(fresh);
                return Ok(snapshot);
            }
            Ok(_) => HolderError::Empty,
            Err(e) => HolderError::Unavailable(e),
        };

        match entry.as_mut() {
            Some(previous) if !previous.ids.is_empty() => {
                warn!(source, error = %failure, count = previous.ids.len(), "serving stale holders");
                previous.stale = true;
                Ok(previous.snapshot())
            }
            _ => {
                warn!(source, error = %failure, "no holders available");
                Err(failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::ScriptedSource;
    use futures::future::join_all;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn cache_over(source: Arc<ScriptedSource>) -> HolderCache {
        HolderCache::new(source, CacheConfig::for_asset("mint"))
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_entry_skips_upstream() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(json!(["a", "b"]))]));
        let cache = cache_over(source.clone());

        let first = cache.current_holders().await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        let second = cache.current_holders().await.unwrap();

        assert_eq!(first, second);
        assert!(!second.stale);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_refreshes() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(json!(["a"])), Ok(json!(["a", "b"]))]));
        let cache = cache_over(source.clone());

        cache.current_holders().await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        let snapshot = cache.current_holders().await.unwrap();

        assert_eq!(snapshot.ids, ids(&["a", "b"]));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_fetch() {
        let source = Arc::new(
            ScriptedSource::new(vec![Ok(json!(["x", "y", "z"]))]).with_delay(Duration::from_millis(200)),
        );
        let cache = cache_over(source.clone());

        let results = join_all((0..16).map(|_| cache.current_holders())).await;

        assert_eq!(source.calls(), 1);
        for result in results {
            assert_eq!(result.unwrap().ids, ids(&["x", "y", "z"]));
        }
        assert!(!cache.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_failure() {
        let source = Arc::new(
            ScriptedSource::new(vec![Err(FetchError::Status(503))]).with_delay(Duration::from_millis(50)),
        );
        let cache = cache_over(source.clone());

        let results = join_all((0..8).map(|_| cache.current_holders())).await;

        assert_eq!(source.calls(), 1);
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(HolderError::Unavailable(FetchError::Status(503))))));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_serves_stale() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(json!(["a", "b"])),
            Err(FetchError::Http("connection reset".into())),
        ]));
        let cache = cache_over(source.clone());

        cache.current_holders().await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        let snapshot = cache.current_holders().await.unwrap();

        assert_eq!(snapshot.ids, ids(&["a", "b"]));
        assert!(snapshot.stale);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_refresh_keeps_previous_holders() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(json!(["a"])), Ok(json!([]))]));
        let cache = cache_over(source.clone());

        cache.current_holders().await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        let snapshot = cache.current_holders().await.unwrap();

        assert_eq!(snapshot.ids, ids(&["a"]));
        assert!(snapshot.stale);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entry_retries_upstream() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(json!(["a"])),
            Err(FetchError::Status(500)),
            Ok(json!(["a", "c"])),
        ]));
        let cache = cache_over(source.clone());

        cache.current_holders().await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cache.current_holders().await.unwrap().stale);

        // The failed refresh did not restart the TTL
        let recovered = cache.current_holders().await.unwrap();
        assert_eq!(recovered.ids, ids(&["a", "c"]));
        assert!(!recovered.stale);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn no_cache_and_failure_is_an_error() {
        let source = Arc::new(ScriptedSource::new(vec![Err(FetchError::Status(502))]));
        let cache = cache_over(source);

        let err = cache.current_holders().await.unwrap_err();
        assert!(matches!(err, HolderError::Unavailable(FetchError::Status(502))));
    }

    #[tokio::test(start_paused = true)]
    async fn no_cache_and_empty_is_an_error() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(json!([]))]));
        let cache = cache_over(source);

        assert!(matches!(cache.current_holders().await, Err(HolderError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_upstream_times_out() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(json!(["late"]))]).with_delay(Duration::from_secs(20)));
        let cache = cache_over(source);

        let err = cache.current_holders().await.unwrap_err();
        assert!(matches!(err, HolderError::Unavailable(FetchError::Timeout(_))));
        assert!(!cache.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn inspect_bypasses_cache() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(json!(["a"])), Ok(json!([{"owner": "B"}]))]));
        let cache = cache_over(source.clone());

        cache.current_holders().await.unwrap();
        assert_eq!(cache.inspect().await.unwrap(), ids(&["b"]));
        // Cached snapshot is untouched
        assert_eq!(cache.current_holders().await.unwrap().ids, ids(&["a"]));
    }

    #[derive(Debug, Clone)]
    enum Upstream {
        Holders(Vec<String>),
        Empty,
        Fail,
    }

    fn upstream() -> impl Strategy<Value = Upstream> {
        prop_oneof![
            prop::collection::vec("[a-z]{3}", 1..6).prop_map(Upstream::Holders),
            Just(Upstream::Empty),
            Just(Upstream::Fail),
        ]
    }

    proptest! {
        #[test]
        fn never_serves_less_than_last_good(steps in prop::collection::vec(upstream(), 1..20)) {
            let responses: Vec<std::result::Result<Value, FetchError>> = steps
                .iter()
                .map(|s| match s {
                    Upstream::Holders(h) => Ok(json!(h)),
                    Upstream::Empty => Ok(json!([])),
                    Upstream::Fail => Err(FetchError::Status(500)),
                })
                .collect();

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            runtime.block_on(async {
                let cache = cache_over(Arc::new(ScriptedSource::new(responses)));
                let mut last_good: Option<Vec<String>> = None;

                for step in &steps {
                    let served = cache.current_holders().await;
                    match (step, &last_good) {
                        (Upstream::Holders(_), _) => {
                            let snapshot = served.unwrap();
                            assert!(!snapshot.stale);
                            last_good = Some(snapshot.ids);
                        }
                        (_, Some(good)) => {
                            let snapshot = served.unwrap();
                            assert!(snapshot.stale);
                            assert_eq!(&snapshot.ids, good);
                        }
                        (_, None) => assert!(served.is_err()),
                    }
                    tokio::time::advance(Duration::from_secs(31)).await;
                }
            });
        }
    }
}
