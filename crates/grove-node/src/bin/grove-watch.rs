//! Follows a remote node's forest over HTTP and logs the HUD.

use std::sync::Arc;
use std::time::Duration;

use grove_forest::{ForestDriver, HttpFeed};
use grove_node::NodeConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grove_watch=info,grove_forest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = NodeConfig::from_env()?;
    let node_url = std::env::var("GROVE_NODE_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());
    tracing::info!("Watching forest at {}", node_url);

    let feed = HttpFeed::new(node_url, config.fetch_timeout)?;
    let handle = ForestDriver::new(config.forest, Arc::new(feed)).spawn();
    let mut frames = handle.subscribe();

    let mut report = tokio::time::interval(Duration::from_secs(5));
    loop {
        tokio::select! {
            _ = report.tick() => {
                let snapshot = frames.borrow_and_update().clone();
                tracing::info!(
                    trees = snapshot.trees.len(),
                    count = snapshot.hud.count,
                    milestones = snapshot.hud.milestones,
                    source = snapshot.hud.source.map(|s| s.as_str()).unwrap_or("none"),
                    "Forest"
                );
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown().await;
    Ok(())
}
