//! Node assembly: sources, cache, rounds, forest and the HTTP server.

use std::sync::Arc;

use grove_forest::{ForestDriver, ForestHandle};
use grove_holders::{CacheConfig, FallbackSource, HolderCache, HolderSource, IndexerSource, RpcSource};
use grove_rounds::{FileWinnerLog, RocksRoundStore, RoundStore, WinnerSink};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::api::{build_router, NodeState};
use crate::config::{NodeConfig, PrimarySource};
use crate::error::Result;
use crate::feed::LocalFeed;
use crate::runner::RoundRunner;

/// A Grove node instance.
pub struct GroveNode {
    config: NodeConfig,
    holders: HolderCache,
    rounds: Arc<dyn RoundStore>,
    winners: Arc<dyn WinnerSink>,
    runner: Arc<RoundRunner>,
}

impl GroveNode {
    /// Open storage and wire the holder sources.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.fetch_timeout).build()?;

        let rpc = Arc::new(RpcSource::with_client(client.clone(), config.rpc.clone()));
        let rpc_holders: Arc<dyn HolderSource> = rpc.clone();
        let indexer: Arc<dyn HolderSource> = Arc::new(IndexerSource::with_client(client, config.indexer.clone()));
        let (primary, secondary) = match config.primary_source {
            PrimarySource::Indexer => (indexer, rpc_holders),
            PrimarySource::Rpc => (rpc_holders, indexer),
        };

        if config.token_mint.is_empty() {
            tracing::warn!("GROVE_TOKEN_MINT is not set; holder lookups will return nobody");
        }
        let holders = HolderCache::new(
            Arc::new(FallbackSource::new(primary, secondary)),
            CacheConfig {
                asset: config.token_mint.clone(),
                ttl: config.cache_ttl,
                fetch_timeout: config.fetch_timeout,
            },
        );

        std::fs::create_dir_all(&config.data_dir)?;
        let rounds: Arc<dyn RoundStore> = Arc::new(RocksRoundStore::open(config.data_dir.join("rounds"))?);
        let winners: Arc<dyn WinnerSink> = Arc::new(FileWinnerLog::new(&config.winner_log));
        let runner = Arc::new(RoundRunner::new(holders.clone(), rpc, rounds.clone(), winners.clone()));

        Ok(Self {
            config,
            holders,
            rounds,
            winners,
            runner,
        })
    }

    /// Start the in-process forest engine.
    pub fn spawn_forest(&self) -> ForestHandle {
        let feed = LocalFeed::new(self.holders.clone(), self.rounds.clone());
        ForestDriver::new(self.config.forest.clone(), Arc::new(feed)).spawn()
    }

    /// Serve the API until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        tracing::info!("Grove node starting");
        tracing::info!("  API: http://{}", self.config.api_addr);
        tracing::info!("  Data: {:?}", self.config.data_dir);
        tracing::info!("  Primary source: {:?}", self.config.primary_source);
        tracing::info!("  Winner log: {}", self.winners.location());

        let forest = self.spawn_forest();

        let (stop_tx, stop_rx) = watch::channel(false);
        let scheduler = self.config.round_period.map(|period| {
            tracing::info!("  Round period: {:?}", period);
            self.runner.clone().spawn_schedule(period, stop_rx)
        });

        let state = Arc::new(NodeState {
            holders: self.holders.clone(),
            rounds: self.rounds.clone(),
            winners: self.winners.clone(),
            runner: self.runner.clone(),
            frames: forest.subscribe(),
            ws_interval: self.config.ws_interval(),
        });
        let app = build_router(state);

        let listener = TcpListener::bind(self.config.api_addr).await?;
        tracing::info!("API server listening on {}", self.config.api_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Shutting down");
        let _ = stop_tx.send(true);
        if let Some(task) = scheduler {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Round scheduler did not exit cleanly");
            }
        }
        forest.shutdown().await;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
