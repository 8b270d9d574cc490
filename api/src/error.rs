use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use medistream_core::classify::ClassifierError;
use medistream_core::error::{codes, CoreError};
use medistream_core::store::StoreError;

/// Error envelope returned on every non-2xx response.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always "error".
    pub status: String,
    /// Machine-readable error code.
    pub code: String,
    pub message: String,
}

/// Internal error type that converts to structured API responses.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: codes::INTERNAL_ERROR,
            message: message.into(),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        let status = match &err {
            CoreError::NoActiveShift
            | CoreError::CompletedTask
            | CoreError::Validation(_)
            | CoreError::VagueMessage
            | CoreError::LowConfidence(_) => StatusCode::BAD_REQUEST,
            CoreError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Consistency(_) | CoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        CoreError::from(err).into()
    }
}

impl From<ClassifierError> for AppError {
    fn from(err: ClassifierError) -> Self {
        tracing::error!(error = %err, "classifier unavailable");
        Self::internal("Message classification unavailable. Try again shortly.")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, message = %self.message, "request failed");
        }
        let body = ErrorResponse {
            status: "error".to_string(),
            code: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
