use super::TextGenerator;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surf::{Client, StatusCode};
use utils::surf_logging::SurfLogging;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    text: String,
}

/// Surf-backed client for the text-generation service.
pub struct HttpTextGenerator {
    http: Client,
    endpoint: String,
    api_token: String,
}

impl HttpTextGenerator {
    pub fn new(endpoint: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            http: Client::new().with(SurfLogging),
            endpoint: endpoint.into(),
            api_token: api_token.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut res = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_token).as_str())
            .body_json(&GenerateRequest { prompt })?
            .await?;

        if res.status() != StatusCode::Ok {
            return Err(Error::Generation(format!(
                "generation endpoint returned status {}",
                res.status()
            )));
        }

        let payload: GenerateResponse = res.body_json().await?;
        Ok(payload.text)
    }
}
