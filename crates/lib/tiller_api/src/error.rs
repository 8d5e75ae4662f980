//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tiller_core::Error as CoreError;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Collapse credential and lookup failures into one uniform 401 so
    /// login responses do not reveal whether the user exists.
    pub fn auth_failure(e: CoreError) -> Self {
        match e {
            CoreError::NotFound | CoreError::InvalidCredentials => {
                AppError::Unauthorized("Incorrect login or password".to_string())
            }
            other => AppError::from(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error",
            ),
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".into()),
            _ => AppError::Internal(e.to_string()),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::AlreadyRegistered
            | CoreError::PhoneInUse
            | CoreError::InvalidRequest(_)
            | CoreError::MessageMalformed(_)
            | CoreError::UnsupportedOperation(_) => AppError::Validation(e.to_string()),
            CoreError::NotFound => AppError::NotFound(e.to_string()),
            CoreError::InvalidCredentials
            | CoreError::NoPermission
            | CoreError::InvalidToken(_)
            | CoreError::TokenExpired
            | CoreError::Unauthorized(_) => AppError::Unauthorized(e.to_string()),
            CoreError::ProtectedRole => AppError::Forbidden(e.to_string()),
            CoreError::StorageConflict(_) => AppError::Conflict(e.to_string()),
            CoreError::Config(msg) | CoreError::Internal(msg) => AppError::Internal(msg),
            CoreError::Db(e) => AppError::from(e),
        }
    }
}
