//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use emotion_core::error::{EmotionError, ErrorKind};

pub type ApiResult<T> = Result<T, ApiError>;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// Logs `err` in full and returns a 500 that only carries the message
    /// when `expose` is set.
    pub fn internal(err: impl std::fmt::Display, expose: bool) -> Self {
        log::error!("Internal error: {err}");
        if expose {
            Self::Internal(err.to_string())
        } else {
            Self::Internal(INTERNAL_ERROR_MESSAGE.to_string())
        }
    }

    pub fn from_emotion(err: EmotionError, expose: bool) -> Self {
        match err.kind() {
            ErrorKind::Input => Self::BadRequest(err.to_string()),
            ErrorKind::Internal => Self::internal(err, expose),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
