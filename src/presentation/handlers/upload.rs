use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use serde::Serialize;

use crate::domain::{ContentType, Stage, StorageKey, split_extension};
use crate::presentation::state::AppState;

use super::error::ApiError;
use super::principal::Principal;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub key: String,
    pub size: u64,
}

/// Stores the first multipart file under the caller's `raw` stage. With
/// storage notifications on, the pipeline picks it up from there.
#[tracing::instrument(skip(state, principal, multipart), fields(user_id = %principal.user_id))]
pub async fn upload_handler(
    State(state): State<AppState>,
    principal: Principal,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| principal.reject(ApiError::bad_request(format!("failed to read multipart: {e}"))))?
        .ok_or_else(|| principal.reject(ApiError::bad_request("no file uploaded")))?;

    let file_name = field
        .file_name()
        .map(|name| name.rsplit(['/', '\\']).next().unwrap_or(name).trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| principal.reject(ApiError::bad_request("file name is required")))?;
    let declared = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let content_type = ContentType::resolve(Some(&declared), split_extension(&file_name).1)
        .ok_or_else(|| {
            principal.reject(ApiError::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_content_type",
                format!("unsupported file type: {file_name}"),
            ))
        })?;

    let data = field
        .bytes()
        .await
        .map_err(|e| principal.reject(ApiError::bad_request(format!("failed to read file: {e}"))))?;
    if data.is_empty() {
        return Err(principal.reject(ApiError::bad_request("uploaded file is empty")));
    }

    let key = StorageKey::new(&principal.user_id, Stage::Raw, file_name);
    let size = data.len() as u64;
    state
        .store
        .put(&key.to_string(), data, content_type.as_mime())
        .await
        .map_err(|e| principal.reject(e))?;

    tracing::info!(key = %key, size, "Upload stored");
    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            key: key.to_string(),
            size,
        }),
    ))
}
