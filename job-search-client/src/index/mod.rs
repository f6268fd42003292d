pub mod memory;

use crate::error::Result;
use crate::job::JobRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A job record as it lives in the external index: the canonical record
/// plus the ingestion timestamp used by retention and the recent-duplicate
/// check.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexedJob {
    #[serde(flatten)]
    pub job: JobRecord,
    /// Unix seconds at ingestion time.
    pub ingested_at: i64,
}

/// One relevance query against the external index.
#[derive(Clone, Debug, Default)]
pub struct IndexQuery {
    pub query: String,
    pub filters: Option<String>,
    pub page: usize,
    pub hits_per_page: usize,
}

/// A page of index hits. `nb_hits` is the total match count, not the page
/// length.
#[derive(Clone, Debug, Default)]
pub struct IndexPage {
    pub hits: Vec<IndexedJob>,
    pub nb_hits: usize,
}

/// Managed external search index. Relevance ranking is the index's own
/// concern; this seam only carries queries and object writes.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(&self, query: &IndexQuery) -> Result<IndexPage>;
    async fn save_objects(&self, objects: &[IndexedJob]) -> Result<()>;
    async fn delete_objects(&self, object_ids: &[String]) -> Result<()>;
}

/// Builder for the index's `field op value [AND ...]` filter grammar.
///
/// Only numeric/boolean fields belong here; free-text location must
/// fuzzy-match through the query term, never filter-exact.
#[derive(Debug, Default)]
pub struct FilterBuilder {
    clauses: Vec<String>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ge(mut self, field: &str, value: i64) -> Self {
        self.clauses.push(format!("{} >= {}", field, value));
        self
    }

    pub fn le(mut self, field: &str, value: i64) -> Self {
        self.clauses.push(format!("{} <= {}", field, value));
        self
    }

    pub fn eq_bool(mut self, field: &str, value: bool) -> Self {
        self.clauses.push(format!("{} = {}", field, value));
        self
    }

    pub fn build(self) -> Option<String> {
        if self.clauses.is_empty() {
            None
        } else {
            Some(self.clauses.join(" AND "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_grammar() {
        let filters = FilterBuilder::new()
            .ge("salaryMin", 90_000)
            .le("salaryMax", 150_000)
            .eq_bool("remote", true)
            .build();
        assert_eq!(
            filters.as_deref(),
            Some("salaryMin >= 90000 AND salaryMax <= 150000 AND remote = true")
        );
    }

    #[test]
    fn test_empty_builder_yields_none() {
        assert!(FilterBuilder::new().build().is_none());
    }
}
