//! Upstream source contracts.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::normalize::normalize;

/// A provider of raw holder payloads for an asset key.
///
/// Payload shape is source-specific; the cache normalizes it.
#[async_trait]
pub trait HolderSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Fetch the current holders of `asset`.
    async fn fetch(&self, asset: &str) -> Result<Value, FetchError>;
}

/// A provider of round seeds.
#[async_trait]
pub trait SeedSource: Send + Sync {
    async fn seed(&self) -> Result<String, FetchError>;
}

#[async_trait]
impl<T: HolderSource + ?Sized> HolderSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch(&self, asset: &str) -> Result<Value, FetchError> {
        (**self).fetch(asset).await
    }
}

#[async_trait]
impl<T: SeedSource + ?Sized> SeedSource for Arc<T> {
    async fn seed(&self) -> Result<String, FetchError> {
        (**self).seed().await
    }
}

/// Consults `secondary` when `primary` fails or yields nobody.
pub struct FallbackSource {
    primary: Arc<dyn HolderSource>,
    secondary: Arc<dyn HolderSource>,
    name: String,
}

impl FallbackSource {
    pub fn new(primary: Arc<dyn HolderSource>, secondary: Arc<dyn HolderSource>) -> Self {
        let name = format!("{}+{}", primary.name(), secondary.name());
        Self {
            primary,
            secondary,
            name,
        }
    }
}

#[async_trait]
impl HolderSource for FallbackSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, asset: &str) -> Result<Value, FetchError> {
        let primary = match self.primary.fetch(asset).await {
            Ok(value) if !normalize(&value).is_empty() => return Ok(value),
            Ok(value) => {
                debug!(source = self.primary.name(), "primary returned no holders, trying fallback");
                Ok(value)
            }
            Err(e) => {
                warn!(source = self.primary.name(), error = %e, "primary failed, trying fallback");
                Err(e)
            }
        };

        match self.secondary.fetch(asset).await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(source = self.secondary.name(), error = %e, "fallback failed");
                // An empty primary answer is still an answer
                primary.or(Err(e))
            }
        }
    }
}
