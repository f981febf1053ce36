//! Grove Node
//!
//! Serves the holder set, runs battle rounds and streams the live forest.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                  Grove Node                   │
//! ├───────────────────────────────────────────────┤
//! │  HTTP API + WS  │  Round runner  │  Forest    │
//! ├───────────────────────────────────────────────┤
//! │  Holder cache (single-flight, stale-serve)    │
//! ├───────────────────────────────────────────────┤
//! │  Indexer / RPC sources  │  RocksDB rounds     │
//! └───────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod node;
pub mod runner;

pub use api::{build_router, NodeState};
pub use config::{NodeConfig, PrimarySource};
pub use error::{Error, Result};
pub use feed::LocalFeed;
pub use node::GroveNode;
pub use runner::{RoundError, RoundRunner, TriggerOutcome};
