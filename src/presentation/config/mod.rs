mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    ConfigError, LlmProvider, LlmSettings, LoggingSettings, PipelineSettings, RateLimitSettings,
    ServerSettings, Settings, StorageProviderSetting, StorageSettings,
};
