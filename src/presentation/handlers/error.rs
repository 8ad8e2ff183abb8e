use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::ports::BlobStoreError;
use crate::application::services::{CategorizeError, PersonaBuildError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    pub code: &'static str,
    pub request_id: String,
}

/// Structured error returned by every handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub request_id: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            request_id: String::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }

    pub fn unauthenticated() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "missing authenticated principal",
        )
    }

    pub fn with_request_id(mut self, request_id: &str) -> Self {
        self.request_id = request_id.to_string();
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, message = %self.message, "Request failed");
        } else {
            tracing::warn!(code = self.code, message = %self.message, "Request rejected");
        }

        let body = ErrorBody {
            message: self.message,
            code: self.code,
            request_id: self.request_id,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<BlobStoreError> for ApiError {
    fn from(e: BlobStoreError) -> Self {
        match e {
            BlobStoreError::NotFound(key) => Self::new(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("object not found: {key}"),
            ),
            other => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                other.to_string(),
            ),
        }
    }
}

impl From<CategorizeError> for ApiError {
    fn from(e: CategorizeError) -> Self {
        match e {
            CategorizeError::WrongStage(_) => Self::bad_request(e.to_string()),
            CategorizeError::Storage(inner) => inner.into(),
            CategorizeError::InvalidMasterProfile(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "corrupt_document",
                e.to_string(),
            ),
            CategorizeError::Serialization(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                e.to_string(),
            ),
        }
    }
}

impl From<PersonaBuildError> for ApiError {
    fn from(e: PersonaBuildError) -> Self {
        match e {
            PersonaBuildError::NotACategoryResult(_) => Self::bad_request(e.to_string()),
            PersonaBuildError::InvalidCategoryResult(_) => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_category_result",
                e.to_string(),
            ),
            PersonaBuildError::Storage(inner) => inner.into(),
            PersonaBuildError::InvalidPersonasDocument(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "corrupt_document",
                e.to_string(),
            ),
            PersonaBuildError::Serialization(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                e.to_string(),
            ),
        }
    }
}
