//! Normalization of heterogeneous upstream payloads.
//!
//! Recognized shapes:
//!
//! ```text
//! ["addr1", "addr2"]                         bare tokens
//! [{"owner": "addr1"}, {"addr": "addr2"}]    records (owner | address | addr | holder)
//! {"data": <either of the above>}            envelope
//! ```
//!
//! Anything else normalizes to an empty list.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

/// Opaque participant token.
pub type Identity = String;

/// A parsed upstream payload.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawHolders {
    Tokens(Vec<String>),
    Records(Vec<HolderRecord>),
    Envelope { data: Box<RawHolders> },
}

/// One holder record. Only the address-like fields are read.
#[derive(Debug, Default, Deserialize)]
pub struct HolderRecord {
    owner: Option<String>,
    address: Option<String>,
    addr: Option<String>,
    holder: Option<String>,
}

impl HolderRecord {
    /// First non-empty address field, in precedence order.
    pub fn identity(&self) -> Option<&str> {
        [&self.owner, &self.address, &self.addr, &self.holder]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }
}

impl RawHolders {
    /// Parse a payload, or `None` if it matches no recognized shape.
    pub fn parse(value: &Value) -> Option<Self> {
        RawHolders::deserialize(value).ok()
    }

    fn tokens(&self) -> Vec<&str> {
        match self {
            RawHolders::Tokens(tokens) => tokens.iter().map(String::as_str).collect(),
            RawHolders::Records(records) => records.iter().filter_map(HolderRecord::identity).collect(),
            RawHolders::Envelope { data } => data.tokens(),
        }
    }

    /// Flatten into trimmed, lower-cased, deduplicated identities.
    ///
    /// First-seen order is preserved.
    pub fn into_identities(self) -> Vec<Identity> {
        let mut seen = HashSet::new();
        self.tokens()
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }
}

/// Normalize any upstream payload into a holder list.
pub fn normalize(value: &Value) -> Vec<Identity> {
    RawHolders::parse(value)
        .map(RawHolders::into_identities)
        .unwrap_or_default()
}
