use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failures reported by the in-memory repositories.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("user not found")]
    UserNotFound,
    #[error("authentication not found")]
    CredentialNotFound,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("credential already exists for user {0}")]
    DuplicateCredential(i64),
}

/// Outcome of a failed request, one variant per failure class.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Authentication(String),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl AppError {
    pub fn invalid_credentials() -> Self {
        Self::Authentication("invalid email or password".into())
    }

    pub fn invalid_token() -> Self {
        Self::Authentication("invalid token".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::Crypto(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
