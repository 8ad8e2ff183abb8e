use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::domain::Stage;
use crate::presentation::state::AppState;

use super::error::ApiError;
use super::principal::Principal;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRequest {
    pub file_path: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizeResponse {
    pub file: String,
    pub categories: Vec<String>,
    pub result_key: String,
    pub degraded: bool,
}

/// Categorizes one normalized file synchronously.
#[tracing::instrument(skip(state, principal, request), fields(user_id = %principal.user_id))]
pub async fn categorize_handler(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<FileRequest>,
) -> Result<Json<CategorizeResponse>, ApiError> {
    let key = principal.resolve_key(&request.file_path, Stage::Normalized)?;

    let outcome = state
        .categorizer
        .categorize(&key, request.file_name.as_deref())
        .await
        .map_err(|e| principal.reject(e))?;

    Ok(Json(CategorizeResponse {
        file: outcome.file_name,
        categories: outcome.categories,
        result_key: outcome.result_key.to_string(),
        degraded: outcome.degraded,
    }))
}
