//! Identity-to-tree reconciliation and per-frame stepping.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use grove_topology::SlotIndex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::ForestConfig;
use crate::feed::FeedSource;
use crate::tree::{Phase, RenderedTree, Sway, Tree};

/// One poll's worth of identities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipUpdate {
    /// Holders that count toward the HUD
    pub authoritative: Vec<String>,
    /// Extra identities shown as trees but never counted
    pub enrichment: Vec<String>,
    /// Where `authoritative` came from
    pub source: Option<FeedSource>,
}

/// Derived statistics, presentational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hud {
    pub count: usize,
    pub milestones: usize,
    pub source: Option<FeedSource>,
}

/// `count / threshold`, zero when the threshold is zero.
pub fn milestones(count: usize, threshold: usize) -> usize {
    count.checked_div(threshold).unwrap_or(0)
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub frame: u64,
    /// Seconds since the forest started
    pub time: f64,
    /// Ordered by slot
    pub trees: Vec<RenderedTree>,
    pub hud: Hud,
}

/// Trees added and removed by one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: usize,
    pub removed: usize,
}

/// Single owner of the identity-to-tree mapping.
pub struct Forest {
    config: ForestConfig,
    trees: HashMap<String, Tree>,
    /// Last non-empty authoritative set, in arrival order
    authoritative: Vec<String>,
    /// Authoritative plus enrichment
    membership: HashSet<String>,
    source: Option<FeedSource>,
    next_slot: SlotIndex,
    frame: u64,
    rng: StdRng,
}

impl Forest {
    pub fn new(config: ForestConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            trees: HashMap::new(),
            authoritative: Vec::new(),
            membership: HashSet::new(),
            source: None,
            next_slot: SlotIndex::ORIGIN,
            frame: 0,
            rng,
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn tree(&self, id: &str) -> Option<&Tree> {
        self.trees.get(id)
    }

    /// Number of live trees, fading ones included.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn hud(&self) -> Hud {
        let count = self.authoritative.len();
        Hud {
            count,
            milestones: milestones(count, self.config.milestone_threshold),
            source: self.source,
        }
    }

    pub fn apply(&mut self, update: MembershipUpdate, now: Duration) -> ReconcileSummary {
        if !update.authoritative.is_empty() {
            self.source = update.source;
        }
        self.reconcile(&update.authoritative, &update.enrichment, now)
    }

    /// Diff the membership against live trees.
    ///
    /// An empty `authoritative` list keeps the previous authoritative set.
    /// Trees that are already fading keep fading even if their identity is back.
    pub fn reconcile(&mut self, authoritative: &[String], enrichment: &[String], now: Duration) -> ReconcileSummary {
        if !authoritative.is_empty() {
            self.authoritative = dedup(authoritative);
        }

        let ordered: Vec<String> = self
            .authoritative
            .iter()
            .chain(enrichment)
            .cloned()
            .collect();
        self.membership = ordered.iter().cloned().collect();

        let mut summary = ReconcileSummary::default();
        for id in ordered {
            if !self.trees.contains_key(&id) {
                self.plant(id);
                summary.added += 1;
            }
        }
        for tree in self.trees.values_mut() {
            if !tree.is_removing() && !self.membership.contains(&tree.id) {
                tree.begin_removal(now);
                summary.removed += 1;
            }
        }

        if summary.added > 0 || summary.removed > 0 {
            tracing::debug!(
                added = summary.added,
                removed = summary.removed,
                live = self.trees.len(),
                "Reconciled forest"
            );
        }
        summary
    }

    /// Advance every tree by one frame and report the result.
    pub fn step(&mut self, now: Duration, dt: Duration) -> FrameSnapshot {
        let grow = self.config.grow_duration;
        let fade = self.config.fade;

        let mut gone: Vec<(SlotIndex, String)> = Vec::new();
        for tree in self.trees.values_mut() {
            if tree.advance(now, dt, grow, fade) == Phase::Gone {
                gone.push((tree.slot, tree.id.clone()));
            }
        }

        gone.sort();
        for (_, id) in gone {
            self.trees.remove(&id);
            if self.membership.contains(&id) {
                self.plant(id);
            }
        }

        self.frame += 1;
        self.snapshot(now)
    }

    pub fn snapshot(&self, now: Duration) -> FrameSnapshot {
        let mut trees: Vec<RenderedTree> = self.trees.values().map(|t| t.render(now)).collect();
        trees.sort_by_key(|t| t.slot);
        FrameSnapshot {
            frame: self.frame,
            time: now.as_secs_f64(),
            trees,
            hud: self.hud(),
        }
    }

    fn plant(&mut self, id: String) {
        let slot = self.next_slot;
        self.next_slot = slot.next();
        let origin = self.config.placement.position(slot, self.config.cell_spacing);
        let sway = Sway::random(&mut self.rng);
        let tree = Tree::new(id.clone(), slot, origin, self.config.tree_size, sway);
        self.trees.insert(id, tree);
    }
}

fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().filter(|id| seen.insert(id.as_str())).cloned().collect()
}
