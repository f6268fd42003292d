pub mod contract_type;

use contract_type::ContractType;
use getset::Getters;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A job-search request as received from the caller.
#[derive(Clone, Debug, Getters, Serialize, Deserialize)]
#[get = "pub"]
pub struct SearchQuery {
    /// Free-text role/skill term ("what").
    what: String,
    /// Free-text location term ("where").
    location: String,
    salary_min: Option<u32>,
    salary_max: Option<u32>,
    remote: bool,
    contract_type: Option<ContractType>,
}

impl SearchQuery {
    pub fn new(what: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            location: location.into(),
            salary_min: None,
            salary_max: None,
            remote: false,
            contract_type: None,
        }
    }

    pub fn with_salary(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.salary_min = min;
        self.salary_max = max;
        self
    }

    pub fn with_remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    pub fn with_contract_type(mut self, contract_type: ContractType) -> Self {
        self.contract_type = Some(contract_type);
        self
    }

    /// True when the caller asked for remote work, either via the flag or
    /// via the location term itself.
    pub fn is_remote_search(&self) -> bool {
        self.remote || canonical_field(&self.location) == "remote"
    }

    /// Deterministic serialization of the canonicalized fields, in a fixed
    /// order. Queries differing only in case or whitespace collide.
    fn canonical(&self) -> String {
        format!(
            "what={}|where={}|salary_min={}|salary_max={}|remote={}|contract={}",
            canonical_field(&self.what),
            canonical_field(&self.location),
            self.salary_min.map_or(String::new(), |v| v.to_string()),
            self.salary_max.map_or(String::new(), |v| v.to_string()),
            self.remote,
            self.contract_type.map_or(String::new(), |c| c.to_string()),
        )
    }

    /// Digest of the canonical form, used as the cache/tracker key.
    pub fn search_key(&self) -> SearchKey {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical().as_bytes());
        SearchKey(hex::encode(hasher.finalize()))
    }

    /// Whitespace/comma-separated tokens of the location term, lowercased.
    pub fn location_tokens(&self) -> Vec<String> {
        self.location
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .map(|token| token.to_lowercase())
            .collect()
    }
}

/// Normalized cache/tracker key for one logical query.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchKey(String);

impl SearchKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonical_field(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
