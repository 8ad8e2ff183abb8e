use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::application::ports::{CompletionOptions, LlmClient, LlmClientError};
use crate::infrastructure::observability::sanitize_prompt;
use crate::presentation::config::{LlmProvider, LlmSettings};

/// Chat-completions client for OpenAI, Azure OpenAI and LM Studio.
pub struct OpenAiClient {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmClientError> {
        let base_url = match settings.provider {
            LlmProvider::OpenAi => settings
                .base_url
                .as_deref()
                .unwrap_or("https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            LlmProvider::LmStudio => settings
                .base_url
                .as_deref()
                .ok_or_else(|| {
                    LlmClientError::UpstreamError(
                        "base_url required for lmstudio provider".to_string(),
                    )
                })?
                .trim_end_matches('/')
                .to_string(),
            LlmProvider::Azure => {
                let endpoint = settings.azure_endpoint.as_deref().ok_or_else(|| {
                    LlmClientError::UpstreamError(
                        "azure_endpoint required for azure provider".to_string(),
                    )
                })?;
                format!(
                    "{}/openai/deployments/{}",
                    endpoint.trim_end_matches('/'),
                    settings.chat_model
                )
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .map_err(|e| LlmClientError::UpstreamError(e.to_string()))?;

        Ok(Self {
            client,
            provider: settings.provider,
            base_url,
            api_key: settings.api_key.clone(),
            model: settings.chat_model.clone(),
            timeout_secs: settings.timeout_secs.max(1),
        })
    }

    fn endpoint(&self) -> String {
        match self.provider {
            LlmProvider::Azure => format!(
                "{}/chat/completions?api-version=2024-06-01",
                self.base_url
            ),
            _ => format!("{}/chat/completions", self.base_url),
        }
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.provider {
            LlmProvider::Azure => request.header("api-key", &self.api_key),
            LlmProvider::LmStudio if self.api_key.is_empty() => request,
            _ => request.header("Authorization", format!("Bearer {}", self.api_key)),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        system_message: &str,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<String, LlmClientError> {
        tracing::debug!(
            provider = self.provider.as_str(),
            model = %self.model,
            prompt = %sanitize_prompt(prompt),
            "Sending chat completion"
        );

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_message,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            response_format: options.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let request = self.client.post(self.endpoint()).json(&body);
        let response = self.apply_auth(request).send().await.map_err(|e| {
            if e.is_timeout() {
                LlmClientError::Timeout(self.timeout_secs)
            } else {
                LlmClientError::UpstreamError(e.to_string())
            }
        })?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmClientError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmClientError::UpstreamError(format!(
                "HTTP {}: {}",
                status,
                sanitize_prompt(&body)
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmClientError::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmClientError::InvalidResponse("empty choices".to_string()))
    }
}
