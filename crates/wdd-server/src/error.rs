use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use wdd_core::error::AppError;

use crate::dto::ErrorResponse;

/// Wrapper so we can implement `IntoResponse` for `AppError`.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self.0 {
            AppError::InvalidInput(_) | AppError::DecodeError(_) => {
                (StatusCode::BAD_REQUEST, "invalid_input")
            }
            AppError::SerializationError(_) => (StatusCode::BAD_REQUEST, "serialization_error"),
            AppError::NoSnapshots { .. } => (StatusCode::NOT_FOUND, "not_captured"),
            AppError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        error_response(status, error_type, self.0.to_string())
    }
}

/// JSON error body with an explicit status.
pub fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> Response {
    (status, axum::Json(ErrorResponse::new(error, message))).into_response()
}
