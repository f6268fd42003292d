use super::{FetchFilter, JobProvider, ProviderPayload, RawJob};
use crate::error::Result;
use async_trait::async_trait;
use surf::{Client, StatusCode};
use utils::surf_logging::SurfLogging;

/// Surf-backed client for the upstream job provider.
pub struct HttpJobProvider {
    http: Client,
    base_url: String,
    api_token: String,
}

impl HttpJobProvider {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            http: Client::new().with(SurfLogging),
            base_url: base_url.into(),
            api_token: api_token.into(),
        }
    }
}

#[async_trait]
impl JobProvider for HttpJobProvider {
    /// Status discipline: 200 parses, quota statuses (402/429) and payload
    /// rejections (422) degrade to an empty batch with a log line, as does
    /// any other non-200. The next cache-miss cycle is the retry.
    async fn fetch(&self, filter: &FetchFilter) -> Result<Vec<RawJob>> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let mut res = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token).as_str())
            .body_json(filter)?
            .await?;

        match res.status() {
            StatusCode::Ok => {
                let payload: ProviderPayload = res.body_json().await?;
                log::info!("upstream returned {} raw jobs", payload.data.len());
                Ok(payload.data)
            }
            StatusCode::PaymentRequired | StatusCode::TooManyRequests => {
                log::warn!(
                    "upstream quota exhausted (status {}), treating as empty",
                    res.status()
                );
                Ok(vec![])
            }
            StatusCode::UnprocessableEntity => {
                let body = res.body_string().await.unwrap_or_default();
                log::error!("upstream rejected filter payload: {}", body);
                Ok(vec![])
            }
            status => {
                log::warn!("upstream returned status {}, treating as empty", status);
                Ok(vec![])
            }
        }
    }
}
