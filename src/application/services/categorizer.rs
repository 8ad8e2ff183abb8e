use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;

use crate::application::ports::{BlobStore, BlobStoreError, CompletionOptions, LlmClient};
use crate::domain::{
    AbsorbOutcome, CategoryResult, MasterProfile, Stage, StorageKey, split_extension,
};

use super::json_recovery::parse_model_json;
use super::prompts::{CATEGORIZER_SYSTEM_MESSAGE, categorization_prompt};
use super::user_locks::UserLocks;

pub const DEFAULT_INPUT_LIMIT_BYTES: usize = 100 * 1024;
const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq)]
pub struct CategorizeOutcome {
    pub file_name: String,
    pub result_key: StorageKey,
    pub categories: Vec<String>,
    pub parse_path: &'static str,
    pub profile: AbsorbOutcome,
    /// True when the stored result is the placeholder.
    pub degraded: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BacklogReport {
    pub processed: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Classifies one normalized file and folds the extracted facts into the master profile.
pub struct CategorizerService {
    store: Arc<dyn BlobStore>,
    llm: Arc<dyn LlmClient>,
    input_limit_bytes: usize,
    options: CompletionOptions,
    user_locks: UserLocks,
}

impl CategorizerService {
    pub fn new(store: Arc<dyn BlobStore>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            store,
            llm,
            input_limit_bytes: DEFAULT_INPUT_LIMIT_BYTES,
            options: CompletionOptions {
                temperature: 0.2,
                max_tokens: 4096,
                json_mode: true,
            },
            user_locks: UserLocks::new(),
        }
    }

    pub fn with_input_limit(mut self, bytes: usize) -> Self {
        self.input_limit_bytes = bytes;
        self
    }

    /// Overrides sampling; JSON mode stays on.
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = CompletionOptions {
            json_mode: true,
            ..options
        };
        self
    }

    #[tracing::instrument(skip(self, key), fields(user_id = %key.user_id(), key = %key))]
    pub async fn categorize(
        &self,
        key: &StorageKey,
        file_name: Option<&str>,
    ) -> Result<CategorizeOutcome, CategorizeError> {
        if key.stage() != Stage::Normalized {
            return Err(CategorizeError::WrongStage(key.to_string()));
        }

        let file_name = file_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| key.file_name())
            .to_string();
        let file_type = match split_extension(&file_name).1 {
            "" => "text".to_string(),
            ext => ext.to_ascii_lowercase(),
        };

        // Held until the master profile and the result are stored.
        let _guard = self.user_locks.lock(key.user_id()).await;
        let mut profile = self.load_master_profile(key.user_id()).await?;
        let content = self.store.get(&key.to_string()).await?;
        let text = String::from_utf8_lossy(&content);
        let text = truncate_to_boundary(&text, self.input_limit_bytes);

        let prompt = categorization_prompt(&file_name, &file_type, text);
        let (result, parse_path) = match self
            .llm
            .complete(CATEGORIZER_SYSTEM_MESSAGE, &prompt, self.options)
            .await
        {
            Ok(reply) => {
                let outcome = parse_model_json::<CategoryResult>(&reply);
                let path = outcome.path();
                tracing::debug!(parse_path = path, "Parsed categorizer reply");
                match outcome.into_result() {
                    Ok(result) => (result.normalize(&file_name, &file_type), path),
                    Err(reason) => {
                        tracing::warn!(reason = %reason, "Unparseable categorizer reply");
                        (CategoryResult::unknown(&file_name, &file_type, &reason), path)
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Categorizer AI call failed");
                (
                    CategoryResult::unknown(&file_name, &file_type, &e.to_string()),
                    "failed",
                )
            }
        };

        let now = Utc::now();
        let absorbed = profile.absorb(&result, now);
        if absorbed != AbsorbOutcome::Ignored {
            self.put_json(&StorageKey::master_profile(key.user_id()), &profile)
                .await?;
        }

        let result_key = StorageKey::category_result(key.user_id(), &file_name);
        self.put_json(&result_key, &result).await?;

        tracing::info!(
            result_key = %result_key,
            categories = result.categories.len(),
            profile = ?absorbed,
            "Categorized file"
        );

        Ok(CategorizeOutcome {
            file_name,
            result_key,
            categories: result.category_names(),
            parse_path,
            profile: absorbed,
            degraded: result.is_placeholder(),
        })
    }

    /// Categorizes every normalized object of a user, one at a time. Per-file
    /// failures are collected; the run always reaches the end of the backlog.
    #[tracing::instrument(skip(self))]
    pub async fn categorize_backlog(&self, user_id: &str) -> Result<BacklogReport, CategorizeError> {
        let prefix = StorageKey::stage_prefix(user_id, Stage::Normalized);
        let mut keys: Vec<StorageKey> = self
            .store
            .list(&prefix)
            .await?
            .into_iter()
            .filter_map(|info| StorageKey::parse(&info.key).ok())
            .filter(|k| k.user_id() == user_id && k.is_data_object())
            .collect();
        keys.sort_by(|a, b| a.relative_path().cmp(b.relative_path()));

        let report = self.categorize_series(&keys).await;
        tracing::info!(
            processed = report.processed.len(),
            failed = report.failed.len(),
            "Backlog categorization finished"
        );
        Ok(report)
    }

    /// Categorizes `keys` in the given order, collecting per-file failures.
    pub async fn categorize_series(&self, keys: &[StorageKey]) -> BacklogReport {
        let mut report = BacklogReport::default();
        for key in keys {
            match self.categorize(key, None).await {
                Ok(outcome) => report.processed.push(outcome.file_name),
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Categorization failed");
                    report.failed.push((key.to_string(), e.to_string()));
                }
            }
        }
        report
    }

    async fn load_master_profile(&self, user_id: &str) -> Result<MasterProfile, CategorizeError> {
        let key = StorageKey::master_profile(user_id);
        match self.store.get(&key.to_string()).await {
            Ok(bytes) => serde_json::from_slice::<MasterProfile>(&bytes)
                .map_err(|e| CategorizeError::InvalidMasterProfile(e.to_string())),
            Err(e) if e.is_not_found() => Ok(MasterProfile::empty(Utc::now())),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_json<T: serde::Serialize>(
        &self,
        key: &StorageKey,
        value: &T,
    ) -> Result<(), CategorizeError> {
        let body = serde_json::to_vec_pretty(value)?;
        self.store
            .put(&key.to_string(), Bytes::from(body), JSON_CONTENT_TYPE)
            .await?;
        Ok(())
    }
}

/// Longest prefix of `text` no larger than `limit` bytes that ends on a char boundary.
pub fn truncate_to_boundary(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[derive(Debug, thiserror::Error)]
pub enum CategorizeError {
    #[error("not a normalized-stage object: {0}")]
    WrongStage(String),
    #[error("master profile unreadable: {0}")]
    InvalidMasterProfile(String),
    #[error("storage: {0}")]
    Storage(#[from] BlobStoreError),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
