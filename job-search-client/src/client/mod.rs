pub mod http;

use crate::error::Result;
use crate::search_options::SearchQuery;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Filter body POSTed to the upstream provider's `/search`.
///
/// Location is deliberately absent: the provider does not support it
/// reliably, so location filtering always happens locally.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchFilter {
    pub posted_at_max_age_days: u32,
    pub page: usize,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title_pattern_or: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_salary_usd: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_salary_usd: Option<u32>,
}

impl FetchFilter {
    pub fn from_query(query: &SearchQuery, max_age_days: u32, page: usize, limit: usize) -> Self {
        let what = query.what().trim();
        Self {
            posted_at_max_age_days: max_age_days,
            page,
            limit,
            job_title_pattern_or: if what.is_empty() {
                None
            } else {
                Some(what.to_string())
            },
            min_salary_usd: *query.salary_min(),
            max_salary_usd: *query.salary_max(),
        }
    }
}

/// A posting as the upstream provider ships it. Lenient on purpose:
/// everything defaults, aliases absorb the provider's naming drift.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawJob {
    pub id: Option<String>,
    pub title: String,
    #[serde(alias = "company_name")]
    pub company: String,
    pub description: String,
    #[serde(alias = "short_location")]
    pub location: String,
    #[serde(alias = "location_long")]
    pub long_location: String,
    pub country: String,
    pub city: String,
    pub state: String,
    pub url: String,
    pub final_url: String,
    #[serde(alias = "min_salary_usd")]
    pub salary_min: Option<u32>,
    #[serde(alias = "max_salary_usd")]
    pub salary_max: Option<u32>,
    pub remote: bool,
    #[serde(alias = "posted_at")]
    pub date_posted: String,
    pub employment_statuses: Vec<String>,
    pub source: String,
}

impl RawJob {
    /// Every field a location token may legitimately live in.
    pub fn location_fields(&self) -> [&str; 5] {
        [
            &self.location,
            &self.long_location,
            &self.country,
            &self.city,
            &self.state,
        ]
    }
}

/// Wire envelope of the provider response.
#[derive(Debug, Deserialize)]
pub struct ProviderPayload {
    #[serde(default)]
    pub data: Vec<RawJob>,
}

/// Upstream job-listing provider. Slower and rate limited; callers own
/// the quota discipline.
#[async_trait]
pub trait JobProvider: Send + Sync {
    async fn fetch(&self, filter: &FetchFilter) -> Result<Vec<RawJob>>;
}
