//! Poll and frame tasks around a [`Forest`].
//!
//! The poll task owns the feed and sends [`MembershipUpdate`]s over a channel.
//! The frame task owns the forest, drains pending updates at the start of
//! each frame, steps, and publishes the snapshot on a watch channel.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::ForestConfig;
use crate::feed::IdentityFeed;
use crate::forest::{Forest, FrameSnapshot, MembershipUpdate};

const UPDATE_BUFFER: usize = 8;

/// Spawns the engine tasks.
pub struct ForestDriver {
    config: ForestConfig,
    feed: Arc<dyn IdentityFeed>,
}

impl ForestDriver {
    pub fn new(config: ForestConfig, feed: Arc<dyn IdentityFeed>) -> Self {
        Self { config, feed }
    }

    /// Start polling and stepping on the current runtime.
    pub fn spawn(self) -> ForestHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (frames_tx, frames_rx) = watch::channel(Arc::new(FrameSnapshot::default()));
        let (updates_tx, updates_rx) = mpsc::channel(UPDATE_BUFFER);

        let poll_task = tokio::spawn(poll_loop(
            self.feed,
            updates_tx,
            stop_rx.clone(),
            self.config.poll_base,
            self.config.poll_jitter,
            self.config.seed,
        ));
        let frame_task = tokio::spawn(frame_loop(Forest::new(self.config), updates_rx, frames_tx, stop_rx));

        ForestHandle {
            stop: stop_tx,
            frames: frames_rx,
            tasks: vec![poll_task, frame_task],
        }
    }
}

/// Running engine.
pub struct ForestHandle {
    stop: watch::Sender<bool>,
    frames: watch::Receiver<Arc<FrameSnapshot>>,
    tasks: Vec<JoinHandle<()>>,
}

impl ForestHandle {
    /// Latest published frame.
    pub fn snapshot(&self) -> Arc<FrameSnapshot> {
        self.frames.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<FrameSnapshot>> {
        self.frames.clone()
    }

    /// Stop both tasks and wait for them to exit.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Forest task did not exit cleanly");
            }
        }
    }
}

fn next_delay(rng: &mut StdRng, base: Duration, jitter: Duration) -> Duration {
    if jitter.is_zero() {
        return base;
    }
    base + Duration::from_millis(rng.gen_range(0..jitter.as_millis().max(1) as u64))
}

async fn poll_loop(
    feed: Arc<dyn IdentityFeed>,
    updates: mpsc::Sender<MembershipUpdate>,
    mut stop: watch::Receiver<bool>,
    base: Duration,
    jitter: Duration,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed.rotate_left(32));
    while !*stop.borrow() {
        let update = feed.poll().await;
        if *stop.borrow() {
            break;
        }
        if let Some(source) = update.source {
            tracing::debug!(source = source.as_str(), count = update.authoritative.len(), "Polled feed");
        }
        if updates.send(update).await.is_err() {
            break;
        }

        let delay = next_delay(&mut rng, base, jitter);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = stop.changed() => break,
        }
    }
    tracing::debug!("Poll task stopped");
}

async fn frame_loop(
    mut forest: Forest,
    mut updates: mpsc::Receiver<MembershipUpdate>,
    frames: watch::Sender<Arc<FrameSnapshot>>,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(forest.config().frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let epoch = Instant::now();
    let mut last = epoch;
    let mut source = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.changed() => break,
        }

        let now = Instant::now();
        let elapsed = now - epoch;
        let dt = now - last;
        last = now;

        while let Ok(update) = updates.try_recv() {
            forest.apply(update, elapsed);
        }

        let snapshot = forest.step(elapsed, dt);
        if snapshot.hud.source != source {
            source = snapshot.hud.source;
            tracing::info!(
                source = source.map(|s| s.as_str()).unwrap_or("none"),
                count = snapshot.hud.count,
                "Forest feed source changed"
            );
        }
        frames.send_replace(Arc::new(snapshot));
    }
    tracing::debug!("Frame task stopped");
}
