use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;

use crate::application::ports::{BlobStore, BlobStoreError, CompletionOptions, LlmClient};
use crate::domain::{
    CategoryResult, MasterProfile, PersonaUpdate, PersonasDocument, Stage, StorageKey,
    UNKNOWN_CATEGORY,
};

use super::json_recovery::parse_model_json;
use super::prompts::{PERSONA_SYSTEM_MESSAGE, persona_update_prompt};
use super::user_locks::UserLocks;

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFailure {
    pub category: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaBuildReport {
    pub file_name: String,
    /// Categories whose persona was rewritten from the model's reply.
    pub updated: Vec<String>,
    /// Categories that kept their previous content; only `sources` moved.
    pub fallbacks: Vec<CategoryFailure>,
}

impl PersonaBuildReport {
    pub fn touched(&self) -> Vec<String> {
        let mut all = self.updated.clone();
        all.extend(self.fallbacks.iter().map(|f| f.category.clone()));
        all.sort();
        all
    }
}

/// Updates the per-category personas of a user from one categorized file.
pub struct PersonaBuilderService {
    store: Arc<dyn BlobStore>,
    llm: Arc<dyn LlmClient>,
    options: CompletionOptions,
    user_locks: UserLocks,
}

impl PersonaBuilderService {
    pub fn new(store: Arc<dyn BlobStore>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            store,
            llm,
            options: CompletionOptions {
                temperature: 0.4,
                max_tokens: 2048,
                json_mode: true,
            },
            user_locks: UserLocks::new(),
        }
    }

    #[tracing::instrument(skip(self, key), fields(user_id = %key.user_id(), key = %key))]
    pub async fn build(&self, key: &StorageKey) -> Result<PersonaBuildReport, PersonaBuildError> {
        if key.stage() != Stage::Categorized || key.is_master_profile() {
            return Err(PersonaBuildError::NotACategoryResult(key.to_string()));
        }

        let raw = self.store.get(&key.to_string()).await?;
        let result: CategoryResult = serde_json::from_slice(&raw)
            .map_err(|e| PersonaBuildError::InvalidCategoryResult(e.to_string()))?;

        let file_name = if result.file_name.trim().is_empty() {
            key.file_name().to_string()
        } else {
            result.file_name.clone()
        };
        let mut report = PersonaBuildReport {
            file_name: file_name.clone(),
            ..Default::default()
        };

        let categories: Vec<_> = result
            .categories
            .iter()
            .filter(|(name, _)| name.as_str() != UNKNOWN_CATEGORY)
            .collect();
        if categories.is_empty() {
            tracing::debug!("No categories to build personas from");
            return Ok(report);
        }

        let user_id = key.user_id();
        let _guard = self.user_locks.lock(user_id).await;
        let mut document = self.load_personas(user_id).await?;
        let context = self.load_master_context(user_id).await;

        for (category, entry) in categories {
            let now = Utc::now();
            let existing = document.current_or_new(category, now);
            let prompt =
                persona_update_prompt(&existing, category, entry, &file_name, context.as_ref());

            let update = match self
                .llm
                .complete(PERSONA_SYSTEM_MESSAGE, &prompt, self.options)
                .await
            {
                Ok(reply) => {
                    let outcome = parse_model_json::<PersonaUpdate>(&reply);
                    tracing::debug!(category = %category, parse_path = outcome.path(), "Parsed persona reply");
                    outcome.into_result().and_then(|update| {
                        if update.is_empty() {
                            Err("reply carried no persona fields".to_string())
                        } else {
                            Ok(update)
                        }
                    })
                }
                Err(e) => Err(e.to_string()),
            };

            let persona = match update {
                Ok(update) => {
                    report.updated.push(category.clone());
                    existing.apply_update(update, &file_name, now)
                }
                Err(reason) => {
                    tracing::warn!(category = %category, reason = %reason, "Persona update failed, keeping previous persona");
                    report.fallbacks.push(CategoryFailure {
                        category: category.clone(),
                        reason,
                    });
                    let mut kept = existing;
                    kept.record_source(&file_name, now);
                    kept
                }
            };
            document.insert(category, persona);
        }

        let body = serde_json::to_vec_pretty(&document)?;
        self.store
            .put(
                &StorageKey::personas(user_id).to_string(),
                Bytes::from(body),
                JSON_CONTENT_TYPE,
            )
            .await?;

        tracing::info!(
            updated = report.updated.len(),
            fallbacks = report.fallbacks.len(),
            "Personas written"
        );
        Ok(report)
    }

    async fn load_personas(&self, user_id: &str) -> Result<PersonasDocument, PersonaBuildError> {
        let key = StorageKey::personas(user_id);
        match self.store.get(&key.to_string()).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| PersonaBuildError::InvalidPersonasDocument(e.to_string())),
            Err(e) if e.is_not_found() => Ok(PersonasDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read-only context; absence or damage only costs prompt quality.
    async fn load_master_context(&self, user_id: &str) -> Option<serde_json::Value> {
        let key = StorageKey::master_profile(user_id);
        let bytes = match self.store.get(&key.to_string()).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "Master profile unavailable for persona context");
                return None;
            }
        };
        serde_json::from_slice::<MasterProfile>(&bytes)
            .map(|profile| profile.prompt_context())
            .ok()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersonaBuildError {
    #[error("not a category result: {0}")]
    NotACategoryResult(String),
    #[error("category result unreadable: {0}")]
    InvalidCategoryResult(String),
    #[error("personas document unreadable: {0}")]
    InvalidPersonasDocument(String),
    #[error("storage: {0}")]
    Storage(#[from] BlobStoreError),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
