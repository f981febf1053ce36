//! Grove Forest
//!
//! Maps a changing set of holder identities onto animated trees.
//!
//! A [`Forest`] owns one [`Tree`] per identity. Each poll reconciles the feed
//! against the live trees; each frame advances every tree through its
//! lifecycle and yields a [`FrameSnapshot`] for the renderer.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use grove_forest::{Forest, ForestConfig, Phase};
//!
//! let mut forest = Forest::new(ForestConfig::default());
//! let holders = vec!["alice".to_string(), "bob".to_string()];
//! forest.reconcile(&holders, &[], Duration::ZERO);
//!
//! let frame = forest.step(Duration::from_millis(16), Duration::from_millis(16));
//! assert_eq!(frame.trees.len(), 2);
//! assert_eq!(frame.trees[0].phase, Phase::Entering);
//! ```

pub mod config;
pub mod driver;
pub mod feed;
pub mod forest;
pub mod tree;

pub use config::ForestConfig;
pub use driver::{ForestDriver, ForestHandle};
pub use feed::{FeedSource, HttpFeed, IdentityFeed};
pub use forest::{milestones, Forest, FrameSnapshot, Hud, MembershipUpdate, ReconcileSummary};
pub use tree::{ease_out, Phase, RenderedTree, Sway, Tree};
