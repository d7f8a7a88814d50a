//! Error types for the REST API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::errors::StoreError;

/// Postgres error codes caused by bad input rather than a broken database
const CLIENT_SQLSTATES: &[&str] = &[
    "22003", // numeric_value_out_of_range
    "23503", // foreign_key_violation
    "23505", // unique_violation
    "23514", // check_violation
];

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The addressed resource does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The request was understood but rejected.
    #[error("{0}")]
    BadRequest(String),

    /// Anything else. The message is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(entity: &str) -> Self {
        Self::NotFound(entity.to_string())
    }

    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, .. } => Self::not_found(entity),
            StoreError::EmptyCart => Self::BadRequest("Cart is empty".to_string()),
            StoreError::Validation(message) => Self::BadRequest(message),
            StoreError::InvalidStatus(status) => {
                Self::BadRequest(format!("Invalid status: {status}"))
            }
            StoreError::Database(sqlx::Error::Database(db))
                if db.code().is_some_and(|code| CLIENT_SQLSTATES.contains(&&*code)) =>
            {
                Self::BadRequest(db.message().to_string())
            }
            StoreError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            Self::NotFound(_) | Self::BadRequest(_) => self.to_string(),
            Self::Internal(message) => {
                error!(error = %message, "API request failed");
                "Internal server error".to_string()
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
