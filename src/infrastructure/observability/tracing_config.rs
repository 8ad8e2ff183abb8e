/// Output options for [`init_tracing`](super::init_tracing).
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub environment: String,
    pub json_format: bool,
}

impl TracingConfig {
    /// JSON output when either the settings flag or `LOG_FORMAT=json` asks for it.
    pub fn new(environment: impl Into<String>, json_setting: bool) -> Self {
        let json_env = std::env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        Self {
            environment: environment.into(),
            json_format: json_setting || json_env,
        }
    }
}
