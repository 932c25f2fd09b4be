use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("User ID is required in headers")]
    MissingUserId,

    #[error("Invalid User ID format")]
    InvalidUserId,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("View {0} does not exist")]
    UnknownView(i64),

    #[error("View \"{0}\" already exists")]
    ViewExists(String),

    #[error("Request body is too large")]
    PayloadTooLarge,

    #[error("Route {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingUserId => StatusCode::UNAUTHORIZED,
            ApiError::InvalidUserId | ApiError::Validation(_) | ApiError::UnknownView(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::ViewExists(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code returned to clients
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingUserId => "MISSING_USER_ID",
            ApiError::InvalidUserId => "INVALID_USER_ID",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::UnknownView(_) => "UNKNOWN_VIEW",
            ApiError::ViewExists(_) => "VIEW_EXISTS",
            ApiError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "message": message,
            "error": self.code(),
        }));

        (status, body).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnknownView(id) => ApiError::UnknownView(id),
            StorageError::Other(e) => ApiError::Internal(e),
            other @ StorageError::Conflict => ApiError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::Validation(rejection.body_text())
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
