//! Node configuration from `GROVE_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use grove_forest::ForestConfig;
use grove_holders::{IndexerConfig, RpcConfig};
use grove_topology::Placement;

use crate::error::{Error, Result};

/// Which holder adapter is asked first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimarySource {
    #[default]
    Indexer,
    Rpc,
}

impl FromStr for PrimarySource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indexer" | "solscan" => Ok(PrimarySource::Indexer),
            "rpc" => Ok(PrimarySource::Rpc),
            other => Err(format!("unknown source {other:?} (expected \"indexer\" or \"rpc\")")),
        }
    }
}

/// Configuration for a Grove node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub api_addr: SocketAddr,
    /// Directory for persistent storage
    pub data_dir: PathBuf,
    pub token_mint: String,
    pub primary_source: PrimarySource,
    pub rpc: RpcConfig,
    pub indexer: IndexerConfig,
    pub cache_ttl: Duration,
    pub fetch_timeout: Duration,
    pub forest: ForestConfig,
    /// `None` disables the periodic round trigger
    pub round_period: Option<Duration>,
    pub winner_log: PathBuf,
    pub ws_fps: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            api_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            data_dir: PathBuf::from("./grove-data"),
            token_mint: String::new(),
            primary_source: PrimarySource::Indexer,
            rpc: RpcConfig::default(),
            indexer: IndexerConfig::default(),
            cache_ttl: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(8),
            forest: ForestConfig::default(),
            round_period: Some(Duration::from_secs(180)),
            winner_log: PathBuf::from("./logs/winners.txt"),
            ws_fps: 10,
        }
    }
}

impl NodeConfig {
    /// Create config from environment variables with defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let defaults = Self::default();

        let mut rpc = defaults.rpc;
        rpc.url = env.string("GROVE_RPC_URL", rpc.url);

        let mut indexer = defaults.indexer;
        indexer.base_url = env.string("GROVE_INDEXER_URL", indexer.base_url);
        indexer.page_limit = env.parse("GROVE_INDEXER_PAGE_LIMIT", indexer.page_limit)?;
        indexer.max_pages = env.parse("GROVE_INDEXER_MAX_PAGES", indexer.max_pages)?;

        let mut forest = defaults.forest;
        forest.poll_base = env.millis("GROVE_POLL_BASE_MS", forest.poll_base)?;
        forest.poll_jitter = env.millis("GROVE_POLL_JITTER_MS", forest.poll_jitter)?;
        forest.fade = env.millis("GROVE_FADE_MS", forest.fade)?;
        forest.cell_spacing = env.parse("GROVE_CELL_SPACING", forest.cell_spacing)?;
        forest.placement = env.parse::<Placement>("GROVE_PLACEMENT", forest.placement)?;
        forest.milestone_threshold = env.parse("GROVE_MILESTONE", forest.milestone_threshold)?;
        if forest.milestone_threshold == 0 {
            return Err(invalid("GROVE_MILESTONE", "must be at least 1"));
        }

        let round_period = match env.parse::<u64>("GROVE_ROUND_PERIOD_SECS", 180)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let ws_fps = env.parse("GROVE_WS_FPS", defaults.ws_fps)?;
        if ws_fps == 0 {
            return Err(invalid("GROVE_WS_FPS", "must be at least 1"));
        }

        Ok(Self {
            api_addr: env.parse("GROVE_API_ADDR", defaults.api_addr)?,
            data_dir: env.path("GROVE_DATA_DIR", defaults.data_dir),
            token_mint: env.string("GROVE_TOKEN_MINT", defaults.token_mint),
            primary_source: env.parse("GROVE_PRIMARY_SOURCE", defaults.primary_source)?,
            rpc,
            indexer,
            cache_ttl: env.millis("GROVE_CACHE_TTL_MS", defaults.cache_ttl)?,
            fetch_timeout: env.millis("GROVE_FETCH_TIMEOUT_MS", defaults.fetch_timeout)?,
            forest,
            round_period,
            winner_log: env.path("GROVE_WINNER_LOG", defaults.winner_log),
            ws_fps,
        })
    }

    /// Interval between WebSocket snapshots.
    pub fn ws_interval(&self) -> Duration {
        Duration::from_secs(1) / self.ws_fps.max(1)
    }
}

fn invalid(key: &str, message: impl Into<String>) -> Error {
    Error::Config {
        key: key.to_string(),
        message: message.into(),
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: String) -> String {
        self.get(key).unwrap_or(default)
    }

    fn path(&self, key: &str, default: PathBuf) -> PathBuf {
        self.get(key).map(PathBuf::from).unwrap_or(default)
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw.parse().map_err(|e: T::Err| invalid(key, format!("{raw:?}: {e}"))),
            None => Ok(default),
        }
    }

    fn millis(&self, key: &str, default: Duration) -> Result<Duration> {
        let ms = self.parse(key, default.as_millis() as u64)?;
        Ok(Duration::from_millis(ms))
    }
}
