mod openai_client;
mod rate_limited_client;

pub use openai_client::OpenAiClient;
pub use rate_limited_client::{RateLimitedLlmClient, TokenBucket};
