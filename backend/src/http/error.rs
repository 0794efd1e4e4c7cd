//! HTTP error handling and response types.
//!
//! Every error leaves the server as `{"error": "<message>"}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;
use crate::db::repository::RepositoryError;
use crate::services::{Body, Reply, ServiceError};

/// API error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Missing or rejected credentials
    Unauthorized(String),
    /// Authenticated but not allowed
    Forbidden(String),
    /// Resource not found
    NotFound(String),
    /// Invalid request (validation error)
    BadRequest(String),
    /// Internal server error
    Internal(String),
    /// Repository error
    Repository(RepositoryError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            AppError::Repository(e) => match e {
                RepositoryError::NotFound { .. } => (StatusCode::NOT_FOUND, e.message().to_string()),
                RepositoryError::ValidationError { .. } | RepositoryError::Conflict { .. } => {
                    (StatusCode::BAD_REQUEST, e.message().to_string())
                }
                other => {
                    tracing::error!("Repository error: {}", other);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        other.message().to_string(),
                    )
                }
            },
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken | AuthError::InactiveUser => {
                AppError::Unauthorized(err.to_string())
            }
            AuthError::InvalidCredentials => AppError::BadRequest(err.to_string()),
            AuthError::Repository(e) => AppError::Repository(e),
            AuthError::Hashing(msg) => AppError::Internal(msg),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Repository(e) => AppError::Repository(e),
            ServiceError::Auth(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match self.body {
            Body::Data(data) => (status, Json(data)).into_response(),
            Body::Error(message) => (status, Json(ErrorBody::new(message))).into_response(),
            Body::Empty => status.into_response(),
        }
    }
}
