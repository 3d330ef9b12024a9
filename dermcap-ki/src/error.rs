//! Error types for dermcap-ki
//!
//! Every fatal pipeline condition becomes a JSON error response naming what
//! went wrong, so the operator gets an attributable message before retrying.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dermcap_common::Error;
use serde_json::{json, Value};
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400) - malformed multipart body
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// dermcap-common error (pipeline conditions, config, I/O, internal)
    #[error(transparent)]
    Common(#[from] Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, error_code, details) = match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", Value::Null),
            ApiError::Common(err) => common_error_parts(err),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        } else {
            tracing::warn!(code = error_code, "{}", message);
        }

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if !details.is_null() {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

fn common_error_parts(err: Error) -> (StatusCode, &'static str, Value) {
    match err {
        Error::SchemaMismatch { missing } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "SCHEMA_MISMATCH",
            json!({ "missing_columns": missing }),
        ),
        Error::InvalidValue { row, column, value } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_VALUE",
            json!({ "row": row, "column": column, "value": value }),
        ),
        Error::DuplicateSession { session, conflicting } => (
            StatusCode::CONFLICT,
            "DUPLICATE_SESSION",
            json!({ "session": session, "stored_records": conflicting }),
        ),
        Error::IdentityMismatch { upi, session, expected } => (
            StatusCode::CONFLICT,
            "IDENTITY_MISMATCH",
            json!({ "upi": upi, "session": session, "expected_upi": expected }),
        ),
        Error::BackendUnavailable { status, body } => (
            StatusCode::BAD_GATEWAY,
            "BACKEND_UNAVAILABLE",
            json!({ "backend_status": status, "backend_response": body }),
        ),
        Error::BackendRejected { status, body } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "BACKEND_REJECTED",
            json!({ "backend_status": status, "backend_response": body }),
        ),
        Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", Value::Null),
        Error::Csv(_) => (StatusCode::UNPROCESSABLE_ENTITY, "UNREADABLE_FILE", Value::Null),
        Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR", Value::Null),
        Error::Io(_) | Error::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", Value::Null)
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
