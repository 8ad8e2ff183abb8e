use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::domain::{Stage, StorageKey};
use crate::presentation::state::AppState;

use super::categorize::FileRequest;
use super::error::ApiError;
use super::principal::Principal;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonasResponse {
    pub file: String,
    pub updated_personas: Vec<String>,
    pub fallbacks: Vec<String>,
}

/// Rebuilds personas from one category result. `fileName` alone names the
/// source file whose result should be used.
#[tracing::instrument(skip(state, principal, request), fields(user_id = %principal.user_id))]
pub async fn personas_handler(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<FileRequest>,
) -> Result<Json<PersonasResponse>, ApiError> {
    let key = if request.file_path.trim().is_empty() {
        let file_name = request
            .file_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| {
                principal.reject(ApiError::bad_request("filePath or fileName is required"))
            })?;
        StorageKey::category_result(&principal.user_id, file_name)
    } else {
        let key = principal.resolve_key(&request.file_path, Stage::Categorized)?;
        if key.stage() == Stage::Categorized && !key.relative_path().ends_with(".json") {
            StorageKey::category_result(&principal.user_id, key.relative_path())
        } else {
            key
        }
    };

    let report = state
        .persona_builder
        .build(&key)
        .await
        .map_err(|e| principal.reject(e))?;

    Ok(Json(PersonasResponse {
        file: report.file_name.clone(),
        updated_personas: report.touched(),
        fallbacks: report.fallbacks.into_iter().map(|f| f.category).collect(),
    }))
}
