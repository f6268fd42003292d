pub mod http;

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Text-generation collaborator. No structured contract beyond
/// "mostly-JSON text"; the sanitization layer owns making sense of it.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Serializes all generation calls through one queue with a fixed minimum
/// inter-call spacing. Calls that arrive too fast wait; they never fail.
pub struct RateLimitedGenerator {
    inner: Arc<dyn TextGenerator>,
    min_interval: std::time::Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimitedGenerator {
    pub fn new(inner: Arc<dyn TextGenerator>, min_interval: chrono::Duration) -> Self {
        Self {
            inner,
            min_interval: min_interval
                .to_std()
                .unwrap_or_else(|_| std::time::Duration::from_secs(4)),
            last_call: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TextGenerator for RateLimitedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        // The lock is held across the call on purpose: it is the queue.
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        let result = self.inner.generate(prompt).await;
        *last_call = Some(Instant::now());
        result
    }
}
