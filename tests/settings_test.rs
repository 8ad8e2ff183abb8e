use dossier::domain::Stage;
use dossier::presentation::config::{
    Environment, LlmProvider, StorageProviderSetting, Settings,
};

fn valid() -> Settings {
    let mut settings = Settings::default();
    settings.llm.api_key = "sk-test".to_string();
    settings
}

#[test]
fn given_defaults_when_inspected_then_pipeline_watches_raw_and_categorized() {
    let settings = valid();

    assert_eq!(settings.server.port, 3000);
    assert_eq!(settings.storage.provider, StorageProviderSetting::Local);
    assert_eq!(settings.pipeline.chunk_size, 20 * 1024);
    assert_eq!(
        settings.pipeline.notify_stages().unwrap(),
        vec![Stage::Raw, Stage::Categorized]
    );
    assert!(settings.validate().is_ok());
}

#[test]
fn given_missing_api_key_when_validating_then_invalid() {
    let settings = Settings::default();

    let error = settings.validate().unwrap_err();

    assert!(error.to_string().contains("llm.api_key"));
}

#[test]
fn given_lmstudio_without_key_when_validating_then_base_url_is_enough() {
    let mut settings = Settings::default();
    settings.llm.provider = LlmProvider::LmStudio;
    assert!(settings.validate().is_err());

    settings.llm.base_url = Some("http://localhost:1234/v1".to_string());
    assert!(settings.validate().is_ok());
}

#[test]
fn given_overlap_not_below_chunk_size_when_validating_then_invalid() {
    let mut settings = valid();
    settings.pipeline.chunk_size = 100;
    settings.pipeline.chunk_overlap = 100;

    assert!(settings.validate().is_err());
}

#[test]
fn given_unknown_notify_stage_when_validating_then_invalid() {
    let mut settings = valid();
    settings.pipeline.notify_stages = vec!["raw".to_string(), "archive".to_string()];

    assert!(settings.validate().is_err());
}

#[test]
fn given_s3_without_bucket_when_validating_then_invalid() {
    let mut settings = valid();
    settings.storage.provider = StorageProviderSetting::S3;

    assert!(settings.validate().is_err());

    settings.storage.bucket = Some("uploads".to_string());
    assert!(settings.validate().is_ok());
    assert_eq!(settings.storage.bucket_name(), "uploads");
}

#[test]
fn given_environment_names_when_parsing_then_aliases_accepted() {
    assert_eq!(Environment::try_from("PROD".to_string()), Ok(Environment::Prod));
    assert_eq!(Environment::try_from("production".to_string()), Ok(Environment::Prod));
    assert!(Environment::try_from("staging".to_string()).is_err());
    assert_eq!(Environment::Test.to_string(), "test");
}
