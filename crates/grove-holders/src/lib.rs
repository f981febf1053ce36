//! Grove Holder Acquisition
//!
//! Shields callers from an unreliable, rate-limited holder source.
//!
//! # Architecture
//!
//! - **Sources**: adapters that fetch a raw holder payload for an asset key
//!   (`IndexerSource` for paginated REST listings, `RpcSource` for JSON-RPC
//!   program-account scans), combined with `FallbackSource`
//! - **Normalization**: a closed set of recognized payload shapes, anything
//!   else is an empty list
//! - **Cache**: TTL cache with single-flight refresh, a hard fetch timeout,
//!   and stale-serve when a refresh fails or comes back empty
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use grove_holders::{CacheConfig, HolderCache, IndexerConfig, IndexerSource};
//!
//! # async fn run() -> Result<(), grove_holders::HolderError> {
//! let source = Arc::new(IndexerSource::new(IndexerConfig::default()));
//! let cache = HolderCache::new(source, CacheConfig::for_asset("So11111111111111111111111111111111111111112"));
//! let snapshot = cache.current_holders().await?;
//! println!("{} holders (stale: {})", snapshot.ids.len(), snapshot.stale);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod indexer;
pub mod normalize;
pub mod rpc;
pub mod source;

#[cfg(test)]
mod test_server;

pub use cache::{CacheConfig, HolderCache, HolderSnapshot};
pub use error::{FetchError, HolderError, Result};
pub use indexer::{IndexerConfig, IndexerSource};
pub use normalize::{normalize, HolderRecord, Identity, RawHolders};
pub use rpc::{RpcConfig, RpcSource};
pub use source::{FallbackSource, HolderSource, SeedSource};
