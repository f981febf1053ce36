//! JSON-RPC adapter: token accounts by mint, and the latest blockhash.
//!
//! Public RPC endpoints rate limit aggressively, so every call retries on
//! 429 with a doubling backoff before giving up.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::FetchError;
use crate::source::{HolderSource, SeedSource};

/// SPL token program.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Size of an SPL token account in bytes.
pub const TOKEN_ACCOUNT_SIZE: u64 = 165;

/// Configuration for the RPC adapter.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub url: String,
    /// Maximum number of holders returned
    pub cap: usize,
    /// Attempts per call before reporting rate limiting
    pub max_attempts: u32,
    /// First backoff delay; doubles on every retry
    pub initial_backoff: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "https://api.mainnet-beta.solana.com".to_string(),
            cap: 800,
            max_attempts: 4,
            initial_backoff: Duration::from_millis(800),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl RpcErrorObject {
    fn is_rate_limit(&self) -> bool {
        self.code == 429
            || self.message.contains("429")
            || self.message.to_lowercase().contains("too many")
    }
}

/// Holder scan and seed source backed by a JSON-RPC node.
pub struct RpcSource {
    client: reqwest::Client,
    config: RpcConfig,
}

impl RpcSource {
    pub fn new(config: RpcConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: RpcConfig) -> Self {
        Self { client, config }
    }

    /// Call `method`, retrying while rate limited.
    async fn call(&self, method: &str, params: Value) -> Result<Value, FetchError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let mut delay = self.config.initial_backoff;

        for attempt in 1..=self.config.max_attempts {
            let response = self.client.post(&self.config.url).json(&body).send().await?;
            let status = response.status();

            if status.as_u16() == 429 {
                warn!(method, attempt, ?delay, "RPC rate limited, backing off");
                tokio::time::sleep(delay).await;
                delay *= 2;
                continue;
            }
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }

            let rpc: RpcResponse = response.json().await?;
            if let Some(err) = rpc.error {
                if err.is_rate_limit() {
                    warn!(method, attempt, ?delay, "RPC rate limited, backing off");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    continue;
                }
                return Err(FetchError::Rpc {
                    code: err.code,
                    message: err.message,
                });
            }
            return rpc
                .result
                .ok_or_else(|| FetchError::Malformed(format!("{} returned no result", method)));
        }

        Err(FetchError::RateLimited {
            attempts: self.config.max_attempts,
        })
    }

    /// Latest finalized blockhash.
    pub async fn latest_blockhash(&self) -> Result<String, FetchError> {
        let result = self
            .call("getLatestBlockhash", json!([{ "commitment": "finalized" }]))
            .await?;
        result
            .pointer("/value/blockhash")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| FetchError::Malformed("missing value.blockhash".into()))
    }
}

#[async_trait]
impl HolderSource for RpcSource {
    fn name(&self) -> &str {
        "rpc"
    }

    async fn fetch(&self, asset: &str) -> Result<Value, FetchError> {
        let params = json!([
            TOKEN_PROGRAM_ID,
            {
                "encoding": "jsonParsed",
                "commitment": "finalized",
                "filters": [
                    { "dataSize": TOKEN_ACCOUNT_SIZE },
                    { "memcmp": { "offset": 0, "bytes": asset } },
                ],
            },
        ]);
        let accounts = self.call("getProgramAccounts", params).await?;
        Ok(Value::Array(parse_token_accounts(&accounts, self.config.cap)))
    }
}

#[async_trait]
impl SeedSource for RpcSource {
    async fn seed(&self) -> Result<String, FetchError> {
        self.latest_blockhash().await
    }
}

/// Owners with a positive balance, as `{owner, amount}` records.
fn parse_token_accounts(accounts: &Value, cap: usize) -> Vec<Value> {
    accounts
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or(&[])
        .iter()
        .filter_map(|acc| {
            let info = acc.pointer("/account/data/parsed/info")?;
            let owner = info.get("owner").and_then(Value::as_str)?;
            let ui = info.pointer("/tokenAmount/uiAmount").and_then(Value::as_f64)?;
            (!owner.is_empty() && ui > 0.0)
                .then(|| json!({ "owner": owner.to_lowercase(), "amount": ui }))
        })
        .take(cap)
        .collect()
}
