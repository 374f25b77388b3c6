// src/errors.rs - HTTP-facing error type shared by every handler
use std::error::Error as StdError;

use actix_web::{error::JsonPayloadError, http::StatusCode, HttpRequest, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::repositories::RepoError;
use crate::services::auth_services::AuthError;
use crate::services::media_uploader::UploadError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    PayloadRejected(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("upload failed: {0}")]
    UploadFailed(#[from] UploadError),
    #[error("persistence error: {0}")]
    Persistence(#[from] RepoError),
    #[error("{0}")]
    Internal(String),
}

/// Display of `err` followed by each `source()` not already spelled out.
/// `tokio_postgres::Error` only prints "db error"; the server message lives
/// in its source.
pub fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let msg = cause.to_string();
        if !out.contains(&msg) {
            out.push_str(": ");
            out.push_str(&msg);
        }
        source = cause.source();
    }
    out
}

/// Rejected JSON bodies get the same error shape as everything else.
pub fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(err.to_string()).into()
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl AppError {
    /// Message safe to show any client. Server-side failures get a generic
    /// line; the real cause only travels in `detail` when debug errors are on.
    fn public_message(&self) -> String {
        match self {
            AppError::UploadFailed(_) => "Failed to upload attachment".to_string(),
            AppError::Persistence(_) => "Database operation failed".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn to_response(&self, debug_errors: bool) -> HttpResponse {
        let status = self.status_code();
        let message = self.public_message();
        let detail = (debug_errors && status.is_server_error()).then(|| error_chain(self));

        HttpResponse::build(status).json(ErrorBody {
            status: "error",
            message: &message,
            detail,
        })
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::PayloadRejected(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UploadFailed(_) | AppError::Persistence(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.to_response(false)
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UserNotFound => AppError::NotFound("User not found".into()),
            AuthError::InvalidPassword => AppError::Unauthorized("Invalid password".into()),
            AuthError::Repo(e) => AppError::Persistence(e),
            AuthError::Token(e) => AppError::Internal(e.to_string()),
            AuthError::Hash(msg) => AppError::Internal(msg),
        }
    }
}
