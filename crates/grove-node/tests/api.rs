//! End-to-end tests against a node served on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use grove_forest::{FeedSource, ForestConfig, ForestDriver, ForestHandle, HttpFeed, IdentityFeed};
use grove_holders::{CacheConfig, FetchError, HolderCache, HolderSource, SeedSource};
use grove_node::{build_router, LocalFeed, NodeState, RoundRunner};
use grove_rounds::{FileWinnerLog, RocksRoundStore, RoundStore, WinnerSink};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

struct StaticHolders(Vec<&'static str>);

#[async_trait]
impl HolderSource for StaticHolders {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, _asset: &str) -> Result<Value, FetchError> {
        Ok(json!(self.0))
    }
}

struct DownHolders;

#[async_trait]
impl HolderSource for DownHolders {
    fn name(&self) -> &str {
        "down"
    }

    async fn fetch(&self, _asset: &str) -> Result<Value, FetchError> {
        Err(FetchError::Status(502))
    }
}

struct Seed {
    delay: Duration,
    fail: bool,
}

#[async_trait]
impl SeedSource for Seed {
    async fn seed(&self) -> Result<String, FetchError> {
        tokio::time::sleep(self.delay).await;
        if self.fail {
            Err(FetchError::Http("seed node offline".into()))
        } else {
            Ok("BLOCKHASH".to_string())
        }
    }
}

struct TestNode {
    addr: SocketAddr,
    dir: TempDir,
    client: reqwest::Client,
    forest: ForestHandle,
}

impl TestNode {
    async fn start(holders: Arc<dyn HolderSource>, seed: Seed) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let cache = HolderCache::new(holders, CacheConfig::for_asset("mint"));
        let rounds: Arc<dyn RoundStore> = Arc::new(RocksRoundStore::open(dir.path().join("rounds")).unwrap());
        let winners: Arc<dyn WinnerSink> = Arc::new(FileWinnerLog::new(dir.path().join("logs").join("winners.txt")));
        let runner = Arc::new(RoundRunner::new(cache.clone(), Arc::new(seed), rounds.clone(), winners.clone()));

        let forest_config = ForestConfig {
            poll_base: Duration::from_millis(50),
            poll_jitter: Duration::ZERO,
            ..ForestConfig::default()
        };
        let forest = ForestDriver::new(forest_config, Arc::new(LocalFeed::new(cache.clone(), rounds.clone()))).spawn();

        let state = Arc::new(NodeState {
            holders: cache,
            rounds,
            winners,
            runner,
            frames: forest.subscribe(),
            ws_interval: Duration::from_millis(100),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            dir,
            client: reqwest::Client::new(),
            forest,
        }
    }

    async fn healthy(holders: Vec<&'static str>) -> Self {
        Self::start(
            Arc::new(StaticHolders(holders)),
            Seed {
                delay: Duration::ZERO,
                fail: false,
            },
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Option<Value>) -> (u16, Value) {
        let mut request = self.client.post(self.url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

#[tokio::test]
async fn health_is_ok() {
    let node = TestNode::healthy(vec!["a"]).await;
    let body = node.client.get(node.url("/health")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "OK");
    node.forest.shutdown().await;
}

#[tokio::test]
async fn wallets_current_serves_normalized_holders() {
    let node = TestNode::healthy(vec!["Alice", "bob", "ALICE"]).await;
    let (status, body) = node.get("/api/wallets/current").await;
    assert_eq!(status, 200);
    assert_eq!(body["ok"], true);
    assert_eq!(body["ids"], json!(["alice", "bob"]));
    assert_eq!(body["stale"], false);
    node.forest.shutdown().await;
}

#[tokio::test]
async fn unavailable_upstream_without_cache() {
    let seed = Seed {
        delay: Duration::ZERO,
        fail: false,
    };
    let node = TestNode::start(Arc::new(DownHolders), seed).await;

    let (status, body) = node.get("/api/wallets/current").await;
    assert_eq!(status, 503);
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("502"));

    let (status, body) = node.get("/api/debug/holders").await;
    assert_eq!(status, 500);
    assert_eq!(body["ok"], false);
    node.forest.shutdown().await;
}

#[tokio::test]
async fn debug_holders_samples_upstream() {
    let node = TestNode::healthy(vec!["a", "b", "c", "d", "e", "f", "g"]).await;
    let (status, body) = node.get("/api/debug/holders").await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 7);
    assert_eq!(body["sample"], json!(["a", "b", "c", "d", "e"]));
    assert_eq!(body["ids"].as_array().unwrap().len(), 7);
    node.forest.shutdown().await;
}

#[tokio::test]
async fn trigger_persists_round_and_logs_winner() {
    let node = TestNode::healthy(vec!["a", "b", "c", "d"]).await;

    let (_, body) = node.get("/api/rounds/latest").await;
    assert_eq!(body, json!({ "ok": true, "round": null }));

    let (status, body) = node.post("/api/rounds/trigger", None).await;
    assert_eq!(status, 200);
    assert_eq!(body["ok"], true);
    assert_eq!(body["roundId"], 1);
    assert_eq!(body["count"], 4);
    assert_eq!(body["winnerLogged"], true);
    let winner = body["winner"].as_str().unwrap().to_string();

    let (status, body) = node.get("/api/rounds/latest").await;
    assert_eq!(status, 200);
    let round = &body["round"];
    assert_eq!(round["id"], 1);
    assert_eq!(round["seed"], "BLOCKHASH");
    assert_eq!(round["participants"], json!(["a", "b", "c", "d"]));
    assert_eq!(round["winner"], winner.as_str());
    assert_eq!(round["log"].as_array().unwrap().len(), 3);
    assert!(round["startedAt"].is_string());

    node.post("/api/rounds/trigger", None).await;
    let (_, body) = node.get("/api/rounds?limit=10").await;
    let ids: Vec<u64> = body["rounds"].as_array().unwrap().iter().map(|r| r["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![2, 1]);

    let log = std::fs::read_to_string(node.dir.path().join("logs").join("winners.txt")).unwrap();
    assert!(log.lines().next().unwrap().contains(&format!("| Round 1 | SimWinner: {winner} | seed=BLOCKHASH")));
    node.forest.shutdown().await;
}

#[tokio::test]
async fn concurrent_trigger_is_rejected() {
    let seed = Seed {
        delay: Duration::from_millis(500),
        fail: false,
    };
    let node = TestNode::start(Arc::new(StaticHolders(vec!["a", "b"])), seed).await;

    let (first, second) = tokio::join!(node.post("/api/rounds/trigger", None), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        node.post("/api/rounds/trigger", None).await
    });
    assert_eq!(first.0, 200);
    assert_eq!(second.0, 429);
    assert_eq!(second.1, json!({ "ok": false, "msg": "busy" }));
    node.forest.shutdown().await;
}

#[tokio::test]
async fn failed_seed_reports_error() {
    let seed = Seed {
        delay: Duration::ZERO,
        fail: true,
    };
    let node = TestNode::start(Arc::new(StaticHolders(vec!["a", "b"])), seed).await;
    let (status, body) = node.post("/api/rounds/trigger", None).await;
    assert_eq!(status, 500);
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("seed"));

    let (_, body) = node.get("/api/rounds/latest").await;
    assert!(body["round"].is_null());
    node.forest.shutdown().await;
}

#[tokio::test]
async fn winners_endpoint_appends_lines() {
    let node = TestNode::healthy(vec!["a"]).await;

    let (status, body) = node.post("/api/winners", Some(json!({ "seed": "x" }))).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "missing winner");

    let (status, _) = node.post("/api/winners", None).await;
    assert_eq!(status, 400);

    let (status, body) = node
        .post("/api/winners", Some(json!({ "winner": "alice", "roundId": 9, "seed": "S" })))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["ok"], true);
    let file = body["file"].as_str().unwrap().to_string();

    node.post("/api/winners", Some(json!({ "winner": "bob" }))).await;

    let contents = std::fs::read_to_string(file).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("| Round 9 | SimWinner: alice | seed=S"));
    assert!(lines[1].ends_with("| Round - | SimWinner: bob | seed="));
    node.forest.shutdown().await;
}

#[tokio::test]
async fn forest_snapshot_tracks_holders() {
    let node = TestNode::healthy(vec!["a", "b", "c"]).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let (status, body) = node.get("/api/forest").await;
    assert_eq!(status, 200);
    assert!(body["frame"].as_u64().unwrap() > 0);
    assert_eq!(body["trees"].as_array().unwrap().len(), 3);
    assert_eq!(body["hud"]["count"], 3);
    assert_eq!(body["hud"]["milestones"], 0);
    assert_eq!(body["hud"]["source"], "local");
    node.forest.shutdown().await;
}

#[tokio::test]
async fn http_feed_reads_live_node() {
    let node = TestNode::healthy(vec!["a", "b", "c"]).await;
    let feed = HttpFeed::new(format!("http://{}", node.addr), Duration::from_secs(2)).unwrap();

    let update = feed.poll().await;
    assert_eq!(update.authoritative, vec!["a", "b", "c"]);
    assert!(update.enrichment.is_empty());
    assert_eq!(update.source, Some(FeedSource::WalletsCurrent));

    node.post("/api/rounds/trigger", None).await;
    let update = feed.poll().await;
    assert_eq!(update.enrichment, vec!["a", "b", "c"]);
    node.forest.shutdown().await;
}

#[tokio::test]
async fn http_feed_falls_back_to_nothing_when_upstream_is_down() {
    let seed = Seed {
        delay: Duration::ZERO,
        fail: false,
    };
    let node = TestNode::start(Arc::new(DownHolders), seed).await;
    let feed = HttpFeed::new(format!("http://{}", node.addr), Duration::from_secs(2)).unwrap();

    let update = feed.poll().await;
    assert!(update.authoritative.is_empty());
    assert_eq!(update.source, None);
    node.forest.shutdown().await;
}
