// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::store::StoreError;

/// Failure taxonomy of the HTTP surface.
///
/// `Validation` covers missing or malformed input and is rejected before
/// any mutation. `Storage` wraps persistence failures; since every write
/// is a whole-record swap there is no partial state to report. "Not
/// attempted" and "empty history" are deliberately absent here: those are
/// successful empty results, not errors.
#[derive(Debug)]
pub enum AppError {
    // 400
    Validation(String),

    // 401
    Auth(String),

    // 500
    Storage(StoreError),

    // 500
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "validation failed: {}", msg),
            AppError::Auth(msg) => write!(f, "authentication failed: {}", msg),
            AppError::Storage(err) => write!(f, "storage failure: {}", err),
            AppError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Maps each error onto a status code and an `{"error": ...}` body.
/// Server-side failures are logged here and reported without detail.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Storage(err) => {
                tracing::error!("Storage failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Lets handlers use `?` on store calls.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Storage(err)
    }
}

/// Lets handlers use `?` on `Validate::validate`.
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
