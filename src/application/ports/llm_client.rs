use async_trait::async_trait;

/// Sampling options for a single completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: usize,
    pub json_mode: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 4096,
            json_mode: true,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one system message and one user prompt; returns the raw reply text.
    async fn complete(
        &self,
        system_message: &str,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<String, LlmClientError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmClientError {
    #[error("rate limited")]
    RateLimited,
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("upstream error: {0}")]
    UpstreamError(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
