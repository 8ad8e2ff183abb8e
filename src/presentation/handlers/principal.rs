use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::{Stage, StorageKey};
use crate::infrastructure::observability::RequestId;

use super::error::ApiError;

/// Header carrying the email the upstream authorizer resolved for the caller.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Authenticated caller plus the request id used in error bodies.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: String,
    pub request_id: String,
}

impl Principal {
    /// Tags an error with this request's id.
    pub fn reject(&self, error: impl Into<ApiError>) -> ApiError {
        error.into().with_request_id(&self.request_id)
    }

    /// Resolves a client path to a key owned by this user. Accepts a full key,
    /// a `{stage}/{path}` key, or a bare file name placed in `default_stage`.
    pub fn resolve_key(&self, file_path: &str, default_stage: Stage) -> Result<StorageKey, ApiError> {
        let path = file_path.trim().trim_start_matches('/');
        if path.is_empty() {
            return Err(self.reject(ApiError::bad_request("filePath is required")));
        }

        let owned_prefix = format!("{}/", self.user_id);
        let candidate = if let Some(rest) = path.strip_prefix(&owned_prefix) {
            format!("{owned_prefix}{rest}")
        } else if path
            .split_once('/')
            .is_some_and(|(first, _)| first.parse::<Stage>().is_ok())
        {
            format!("{owned_prefix}{path}")
        } else {
            format!("{owned_prefix}{default_stage}/{path}")
        };

        StorageKey::parse(&candidate)
            .map_err(|e| self.reject(ApiError::bad_request(e.to_string())))
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .extensions
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();

        let user_id = parts
            .headers
            .get(USER_EMAIL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && !v.contains('/'))
            .map(str::to_string);

        match user_id {
            Some(user_id) => Ok(Self {
                user_id,
                request_id,
            }),
            None => Err(ApiError::unauthenticated().with_request_id(&request_id)),
        }
    }
}
