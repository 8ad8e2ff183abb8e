use serde::Deserialize;

use crate::application::services::{DEFAULT_INPUT_LIMIT_BYTES, RouterLimits};
use crate::domain::Stage;

use super::environment::Environment;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub llm: LlmSettings,
    pub pipeline: PipelineSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProviderSetting {
    #[default]
    Local,
    S3,
    Azure,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub provider: StorageProviderSetting,
    pub local_path: String,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub azure_account: Option<String>,
    pub azure_access_key: Option<String>,
    pub azure_container: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: StorageProviderSetting::Local,
            local_path: "./data".to_string(),
            bucket: None,
            region: None,
            endpoint: None,
            azure_account: None,
            azure_access_key: None,
            azure_container: None,
        }
    }
}

impl StorageSettings {
    /// Name reported as the `bucket` of emitted storage events.
    pub fn bucket_name(&self) -> String {
        match self.provider {
            StorageProviderSetting::S3 => self.bucket.clone().unwrap_or_default(),
            StorageProviderSetting::Azure => self.azure_container.clone().unwrap_or_default(),
            StorageProviderSetting::Local => self.local_path.clone(),
            StorageProviderSetting::Memory => "memory".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    Azure,
    #[serde(rename = "lmstudio")]
    LmStudio,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Azure => "azure",
            LlmProvider::LmStudio => "lmstudio",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub api_key: String,
    pub base_url: Option<String>,
    pub azure_endpoint: Option<String>,
    pub chat_model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
    pub rate_limit: RateLimitSettings,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            api_key: String::new(),
            base_url: None,
            azure_endpoint: None,
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: 4096,
            timeout_secs: 60,
            rate_limit: RateLimitSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub capacity: u32,
    pub refill_per_second: f64,
    pub max_wait_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            capacity: 5,
            refill_per_second: 1.0,
            max_wait_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub raw_max_bytes: u64,
    pub normalized_max_bytes: u64,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub categorizer_input_limit: usize,
    pub max_concurrent_tasks: usize,
    pub queue_capacity: usize,
    pub normalizer_handoff: bool,
    pub notify_stages: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let limits = RouterLimits::default();
        Self {
            raw_max_bytes: limits.raw_max_bytes,
            normalized_max_bytes: limits.normalized_max_bytes,
            chunk_size: 20 * 1024,
            chunk_overlap: 2 * 1024,
            categorizer_input_limit: DEFAULT_INPUT_LIMIT_BYTES,
            max_concurrent_tasks: 4,
            queue_capacity: 256,
            normalizer_handoff: true,
            notify_stages: vec!["raw".to_string(), "categorized".to_string()],
        }
    }
}

impl PipelineSettings {
    pub fn router_limits(&self) -> RouterLimits {
        RouterLimits {
            raw_max_bytes: self.raw_max_bytes,
            normalized_max_bytes: self.normalized_max_bytes,
        }
    }

    pub fn notify_stages(&self) -> Result<Vec<Stage>, ConfigError> {
        self.notify_stages
            .iter()
            .map(|s| s.trim().parse::<Stage>().map_err(ConfigError::Invalid))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Settings {
    /// Layers `config/default.toml`, `config/{environment}.toml` and `APP__*`
    /// environment variables, later sources overriding earlier ones.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        let configuration = ::config::Config::builder()
            .add_source(::config::File::with_name("config/default").required(false))
            .add_source(
                ::config::File::with_name(&format!("config/{}", environment.as_str()))
                    .required(false),
            )
            .add_source(
                ::config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("pipeline.notify_stages")
                    .try_parsing(true),
            )
            .build()?;

        Ok(configuration.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let storage = &self.storage;
        match storage.provider {
            StorageProviderSetting::Local if storage.local_path.trim().is_empty() => {
                return Err(ConfigError::Invalid("storage.local_path required".into()));
            }
            StorageProviderSetting::S3 if is_blank(&storage.bucket) => {
                return Err(ConfigError::Invalid("storage.bucket required for s3".into()));
            }
            StorageProviderSetting::Azure
                if is_blank(&storage.azure_account)
                    || is_blank(&storage.azure_access_key)
                    || is_blank(&storage.azure_container) =>
            {
                return Err(ConfigError::Invalid(
                    "storage.azure_account, azure_access_key and azure_container required".into(),
                ));
            }
            _ => {}
        }

        match self.llm.provider {
            LlmProvider::LmStudio if is_blank(&self.llm.base_url) => {
                return Err(ConfigError::Invalid(
                    "llm.base_url required for lmstudio".into(),
                ));
            }
            LlmProvider::LmStudio => {}
            LlmProvider::Azure if is_blank(&self.llm.azure_endpoint) => {
                return Err(ConfigError::Invalid(
                    "llm.azure_endpoint required for azure".into(),
                ));
            }
            _ if self.llm.api_key.trim().is_empty() => {
                return Err(ConfigError::Invalid(format!(
                    "llm.api_key required for {}",
                    self.llm.provider.as_str()
                )));
            }
            _ => {}
        }

        let pipeline = &self.pipeline;
        if pipeline.chunk_size == 0 || pipeline.chunk_overlap >= pipeline.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "pipeline.chunk_overlap ({}) must be smaller than chunk_size ({})",
                pipeline.chunk_overlap, pipeline.chunk_size
            )));
        }
        pipeline.notify_stages()?;

        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}
