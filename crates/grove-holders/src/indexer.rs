//! Paginated REST indexer adapter.
//!
//! Pages through `{base}/token/holders?tokenAddress=..&offset=..&limit=..`
//! until a short page, an empty page, or the holder cap.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::FetchError;
use crate::source::HolderSource;

/// Configuration for the indexer adapter.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// API base URL, without a trailing slash
    pub base_url: String,
    /// Items requested per page
    pub page_limit: usize,
    /// Upper bound on the number of pages fetched
    pub max_pages: usize,
    /// Stop once this many holders were collected
    pub cap: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://public-api.solscan.io".to_string(),
            page_limit: 200,
            max_pages: 50,
            cap: 2000,
        }
    }
}

/// Holder listing from a token indexer.
pub struct IndexerSource {
    client: reqwest::Client,
    config: IndexerConfig,
}

impl IndexerSource {
    pub fn new(config: IndexerConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: IndexerConfig) -> Self {
        Self { client, config }
    }

    async fn fetch_page(&self, asset: &str, offset: usize) -> Result<Value, FetchError> {
        let url = format!("{}/token/holders", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .query(&[
                ("tokenAddress", asset.to_string()),
                ("offset", offset.to_string()),
                ("limit", self.config.page_limit.to_string()),
            ])
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl HolderSource for IndexerSource {
    fn name(&self) -> &str {
        "indexer"
    }

    async fn fetch(&self, asset: &str) -> Result<Value, FetchError> {
        let mut holders = Vec::new();

        for page in 0..self.config.max_pages {
            let offset = page * self.config.page_limit;
            let body = match self.fetch_page(asset, offset).await {
                Ok(body) => body,
                // A failing first page is a failed fetch; later pages just end the listing
                Err(e) if page == 0 => return Err(e),
                Err(e) => {
                    debug!(page, error = %e, "indexer page failed, keeping partial listing");
                    break;
                }
            };

            let items = page_items(&body);
            if items.is_empty() {
                break;
            }
            holders.extend(items.iter().filter_map(holder_entry));

            if items.len() < self.config.page_limit || holders.len() >= self.config.cap {
                break;
            }
        }

        holders.truncate(self.config.cap);
        debug!(count = holders.len(), "indexer listing complete");
        Ok(Value::Array(holders))
    }
}

/// Items of one page: the page itself if it is an array, else its `data` array.
fn page_items(body: &Value) -> &[Value] {
    match body {
        Value::Array(items) => items.as_slice(),
        other => other
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
    }
}

/// Reduce one indexer item to `{owner, amount}`, dropping empty balances.
fn holder_entry(item: &Value) -> Option<Value> {
    let owner = ["owner", "address", "holder"]
        .iter()
        .filter_map(|k| item.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())?
        .to_lowercase();

    let amount = holder_balance(item);
    if amount == 0.0 || amount.is_nan() {
        return None;
    }
    Some(json!({ "owner": owner, "amount": amount }))
}

/// UI balance of an item, trying the common field layouts in turn.
fn holder_balance(item: &Value) -> f64 {
    let token_amount = item.get("tokenAmount");

    let ui = token_amount
        .and_then(|ta| ta.get("uiAmount").or_else(|| ta.get("uiAmountString")))
        .or_else(|| item.get("amount"))
        .or_else(|| item.get("balance"))
        .and_then(as_number)
        .unwrap_or(0.0);
    if ui != 0.0 {
        return ui;
    }

    // Raw integer amount scaled by decimals
    let raw = token_amount.and_then(|ta| ta.get("amount")).and_then(as_number);
    let decimals = token_amount.and_then(|ta| ta.get("decimals")).and_then(as_number);
    match (raw, decimals) {
        (Some(raw), Some(decimals)) => raw / 10f64.powf(decimals),
        _ => 0.0,
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    #[test]
    fn page_items_accepts_both_layouts() {
        assert_eq!(page_items(&json!([1, 2])).len(), 2);
        assert_eq!(page_items(&json!({"data": [1]})).len(), 1);
        assert!(page_items(&json!({"success": false})).is_empty());
    }

    #[test]
    fn balances_from_every_layout() {
        assert_eq!(holder_balance(&json!({"tokenAmount": {"uiAmount": 2.5}})), 2.5);
        assert_eq!(holder_balance(&json!({"tokenAmount": {"uiAmountString": "7"}})), 7.0);
        assert_eq!(holder_balance(&json!({"amount": 3})), 3.0);
        assert_eq!(holder_balance(&json!({"balance": "4.5"})), 4.5);
        assert_eq!(
            holder_balance(&json!({"tokenAmount": {"amount": "1500", "decimals": 3}})),
            1.5
        );
        assert_eq!(holder_balance(&json!({"owner": "x"})), 0.0);
    }

    #[test]
    fn zero_balances_are_dropped() {
        assert!(holder_entry(&json!({"owner": "a", "amount": 0})).is_none());
        assert!(holder_entry(&json!({"amount": 5})).is_none());

        let entry = holder_entry(&json!({"address": "MixedCase", "balance": 1})).unwrap();
        assert_eq!(entry["owner"], "mixedcase");
    }

    #[test]
    fn entries_normalize_as_records() {
        let entries: Vec<Value> = [
            json!({"owner": "a", "amount": 1}),
            json!({"holder": "b", "tokenAmount": {"uiAmount": 2.0}}),
        ]
        .iter()
        .filter_map(holder_entry)
        .collect();
        assert_eq!(normalize(&Value::Array(entries)), vec!["a", "b"]);
    }

    mod upstream {
        use super::*;
        use crate::test_server::serve;
        use axum::extract::{Query, State};
        use axum::http::StatusCode;
        use axum::routing::get;
        use axum::{Json, Router};
        use std::collections::HashMap;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        /// A holder listing of `total` owners, failing every page at or past `fail_from`.
        struct Listing {
            total: usize,
            fail_from: Option<usize>,
            hits: AtomicUsize,
        }

        async fn holders(
            State(listing): State<Arc<Listing>>,
            Query(q): Query<HashMap<String, String>>,
        ) -> Result<Json<Value>, StatusCode> {
            listing.hits.fetch_add(1, Ordering::SeqCst);
            let offset: usize = q["offset"].parse().unwrap();
            let limit: usize = q["limit"].parse().unwrap();
            assert_eq!(q["tokenAddress"], "mint");

            if listing.fail_from.is_some_and(|from| offset >= from) {
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
            let items: Vec<Value> = (offset..listing.total.min(offset + limit))
                .map(|i| json!({ "owner": format!("Owner{i}"), "amount": 1 }))
                .collect();
            Ok(Json(json!({ "success": true, "data": items })))
        }

        async fn source(total: usize, fail_from: Option<usize>, page_limit: usize, cap: usize) -> (IndexerSource, Arc<Listing>) {
            let listing = Arc::new(Listing {
                total,
                fail_from,
                hits: AtomicUsize::new(0),
            });
            let router = Router::new()
                .route("/token/holders", get(holders))
                .with_state(listing.clone());
            let config = IndexerConfig {
                base_url: serve(router).await,
                page_limit,
                max_pages: 50,
                cap,
            };
            (IndexerSource::new(config), listing)
        }

        #[tokio::test]
        async fn stops_on_short_page() {
            let (source, listing) = source(7, None, 3, 2000).await;
            let ids = normalize(&source.fetch("mint").await.unwrap());
            assert_eq!(ids.len(), 7);
            assert_eq!(ids[0], "owner0");
            assert_eq!(listing.hits.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn stops_on_empty_page() {
            let (source, listing) = source(6, None, 3, 2000).await;
            let ids = normalize(&source.fetch("mint").await.unwrap());
            assert_eq!(ids.len(), 6);
            assert_eq!(listing.hits.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn failed_first_page_is_an_error() {
            let (source, _) = source(10, Some(0), 3, 2000).await;
            let err = source.fetch("mint").await.unwrap_err();
            assert!(matches!(err, FetchError::Status(500)));
        }

        #[tokio::test]
        async fn failed_later_page_keeps_partial_listing() {
            let (source, listing) = source(10, Some(3), 3, 2000).await;
            let ids = normalize(&source.fetch("mint").await.unwrap());
            assert_eq!(ids, vec!["owner0", "owner1", "owner2"]);
            assert_eq!(listing.hits.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn listing_is_truncated_to_cap() {
            let (source, listing) = source(100, None, 3, 4).await;
            let ids = normalize(&source.fetch("mint").await.unwrap());
            assert_eq!(ids, vec!["owner0", "owner1", "owner2", "owner3"]);
            assert_eq!(listing.hits.load(Ordering::SeqCst), 2);
        }
    }
}
