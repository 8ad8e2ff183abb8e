mod helpers;

use std::sync::Arc;

use dossier::application::ports::{CompletionOptions, LlmClient, LlmClientError};
use dossier::infrastructure::llm::{RateLimitedLlmClient, TokenBucket};
use dossier::presentation::config::RateLimitSettings;

use helpers::ScriptedLlm;

const OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.0,
    max_tokens: 16,
    json_mode: false,
};

#[tokio::test]
async fn given_empty_bucket_and_no_wait_budget_when_acquiring_then_rate_limited() {
    let bucket = TokenBucket::new(RateLimitSettings {
        capacity: 1,
        refill_per_second: 0.001,
        max_wait_ms: 0,
    });

    assert!(bucket.acquire().await.is_ok());
    assert!(matches!(bucket.acquire().await, Err(LlmClientError::RateLimited)));
}

#[tokio::test]
async fn given_fast_refill_when_acquiring_past_capacity_then_waits_and_succeeds() {
    let bucket = TokenBucket::new(RateLimitSettings {
        capacity: 1,
        refill_per_second: 200.0,
        max_wait_ms: 1_000,
    });

    for _ in 0..3 {
        bucket.acquire().await.unwrap();
    }
}

#[test]
fn given_zero_capacity_when_checking_then_limiter_disabled() {
    let bucket = TokenBucket::new(RateLimitSettings {
        capacity: 0,
        ..RateLimitSettings::default()
    });

    assert!(!bucket.enabled());
}

#[tokio::test]
async fn given_limited_client_when_budget_exhausted_then_inner_client_not_called() {
    let inner = Arc::new(ScriptedLlm::new(vec![Ok("one".into()), Ok("two".into())]));
    let client = RateLimitedLlmClient::new(
        inner.clone(),
        Arc::new(TokenBucket::new(RateLimitSettings {
            capacity: 1,
            refill_per_second: 0.001,
            max_wait_ms: 0,
        })),
    );

    assert_eq!(client.complete("sys", "a", OPTIONS).await.unwrap(), "one");
    assert!(matches!(
        client.complete("sys", "b", OPTIONS).await,
        Err(LlmClientError::RateLimited)
    ));
    assert_eq!(inner.calls(), 1);
}
