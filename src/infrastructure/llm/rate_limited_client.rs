use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::application::ports::{CompletionOptions, LlmClient, LlmClientError};
use crate::presentation::config::RateLimitSettings;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket shared by every caller holding the same limiter.
#[derive(Debug)]
pub struct TokenBucket {
    settings: RateLimitSettings,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(BucketState {
                tokens: settings.capacity as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn enabled(&self) -> bool {
        self.settings.capacity > 0 && self.settings.refill_per_second > 0.0
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_refill).as_secs_f64();
        if elapsed <= f64::EPSILON {
            return;
        }
        state.tokens = (state.tokens + elapsed * self.settings.refill_per_second)
            .min(self.settings.capacity as f64);
        state.last_refill = now;
    }

    /// Takes one token, sleeping while the wait stays inside `max_wait_ms`.
    pub async fn acquire(&self) -> Result<(), LlmClientError> {
        if !self.enabled() {
            return Ok(());
        }

        let start = Instant::now();
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                self.refill(&mut state, Instant::now());
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    None
                } else {
                    let missing = 1.0 - state.tokens;
                    Some(Duration::from_secs_f64(
                        missing / self.settings.refill_per_second,
                    ))
                }
            };

            let Some(wait) = wait else {
                return Ok(());
            };

            let waited = start.elapsed() + wait;
            if waited > Duration::from_millis(self.settings.max_wait_ms) {
                tracing::warn!(
                    retry_after_ms = wait.as_millis() as u64,
                    max_wait_ms = self.settings.max_wait_ms,
                    "AI rate limit wait budget exceeded"
                );
                return Err(LlmClientError::RateLimited);
            }
            tokio::time::sleep(wait).await;
        }
    }
}

/// Gates every completion of the wrapped client through a [`TokenBucket`].
pub struct RateLimitedLlmClient {
    inner: Arc<dyn LlmClient>,
    bucket: Arc<TokenBucket>,
}

impl RateLimitedLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>, bucket: Arc<TokenBucket>) -> Self {
        Self { inner, bucket }
    }

    /// Leaves the client unwrapped when the limit is disabled.
    pub fn wrap(inner: Arc<dyn LlmClient>, settings: RateLimitSettings) -> Arc<dyn LlmClient> {
        let bucket = TokenBucket::new(settings);
        if !bucket.enabled() {
            return inner;
        }
        Arc::new(Self::new(inner, Arc::new(bucket)))
    }
}

#[async_trait]
impl LlmClient for RateLimitedLlmClient {
    async fn complete(
        &self,
        system_message: &str,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<String, LlmClientError> {
        self.bucket.acquire().await?;
        self.inner.complete(system_message, prompt, options).await
    }
}
